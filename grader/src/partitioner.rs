//! # Partitioner Module
//!
//! Buckets normalized submissions into named groups.
//!
//! Buckets are keyed by group display name. Two upstream groups that share a name therefore
//! merge into one bucket; [`GroupedSubmissions::name_collisions`] reports when that happened so
//! callers can warn the grader instead of grading the wrong roster silently.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{GradingError, GradingResult};
use crate::traits::group_lookup::GroupNameLookup;
use crate::types::{GroupId, Submission};

/// Bucket used for submissions that cannot be resolved to a group.
pub const NO_GROUP: &str = "No Group";

/// Group name to the submissions filed under it, in input order within each bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSubmissions {
    buckets: BTreeMap<String, Vec<Submission>>,
    group_ids: BTreeMap<String, BTreeSet<GroupId>>,
}

impl GroupedSubmissions {
    pub fn get(&self, group_name: &str) -> Option<&[Submission]> {
        self.buckets.get(group_name).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Number of buckets, including the no-group bucket.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_submissions(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Upstream group ids filed under `group_name`. Lets callers split a merged bucket by
    /// [`Submission::group`] id.
    pub fn group_ids(&self, group_name: &str) -> Option<&BTreeSet<GroupId>> {
        self.group_ids.get(group_name)
    }

    /// Group names that more than one distinct upstream group id was filed under.
    pub fn name_collisions(&self) -> Vec<&str> {
        self.group_ids
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Submission>> {
        self.buckets
    }
}

/// Files submissions into group buckets.
#[derive(Debug, Clone)]
pub struct Partitioner {
    no_group_label: String,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self {
            no_group_label: NO_GROUP.to_string(),
        }
    }
}

impl Partitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different label for the fallback bucket.
    pub fn with_no_group_label(mut self, label: impl Into<String>) -> Self {
        self.no_group_label = label.into();
        self
    }

    pub fn no_group_label(&self) -> &str {
        &self.no_group_label
    }

    /// Partition `submissions` into group buckets.
    ///
    /// The no-group bucket is always present, even when empty. A submission with a non-empty
    /// group name is filed under that name; otherwise `lookup` is asked for the user's group,
    /// and a missing or blank answer files it under the no-group bucket.
    ///
    /// # Errors
    ///
    /// Returns [`GradingError::MissingSubmissions`] when `submissions` is `None`. Nothing is
    /// partitioned in that case.
    pub fn partition<L>(
        &self,
        submissions: Option<&[Submission]>,
        lookup: &L,
    ) -> GradingResult<GroupedSubmissions>
    where
        L: GroupNameLookup + ?Sized,
    {
        let submissions = submissions.ok_or(GradingError::MissingSubmissions)?;

        let mut grouped = GroupedSubmissions::default();
        grouped
            .buckets
            .insert(self.no_group_label.clone(), Vec::new());

        for submission in submissions {
            let name = if !submission.group.name.is_empty() {
                submission.group.name.clone()
            } else {
                lookup
                    .lookup(submission.user.id)
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| self.no_group_label.clone())
            };

            if let Some(group_id) = submission.group.id {
                grouped
                    .group_ids
                    .entry(name.clone())
                    .or_default()
                    .insert(group_id);
            }

            grouped
                .buckets
                .entry(name)
                .or_default()
                .push(submission.clone());
        }

        for name in grouped.name_collisions() {
            warn!("Group name '{name}' is shared by several upstream groups; their submissions were merged");
        }
        debug!(
            "Partitioned {} submissions into {} groups",
            grouped.total_submissions(),
            grouped.len()
        );

        Ok(grouped)
    }
}

/// Partition with the default no-group label.
pub fn partition<L>(
    submissions: Option<&[Submission]>,
    lookup: &L,
) -> GradingResult<GroupedSubmissions>
where
    L: GroupNameLookup + ?Sized,
{
    Partitioner::default().partition(submissions, lookup)
}
