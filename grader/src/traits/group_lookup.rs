//! Group name lookup used by the partitioner for submissions that arrive without a group name.

use std::collections::HashMap;

use crate::types::UserId;

/// Resolves the group a user belongs to.
///
/// Returning `None` (or a blank name) files the submission under the no-group bucket.
pub trait GroupNameLookup {
    fn lookup(&self, user_id: UserId) -> Option<String>;
}

impl<F> GroupNameLookup for F
where
    F: Fn(UserId) -> Option<String>,
{
    fn lookup(&self, user_id: UserId) -> Option<String> {
        self(user_id)
    }
}

/// Membership lists fetched from a group set map user ids straight to group names.
impl GroupNameLookup for HashMap<UserId, String> {
    fn lookup(&self, user_id: UserId) -> Option<String> {
        self.get(&user_id).cloned()
    }
}
