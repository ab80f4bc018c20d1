//! # Grading Cache
//!
//! The in-progress grading state for every submission open in one grading session.
//!
//! The cache owns its entries and the rubric it was initialised against. Every mutation is
//! synchronous and touches only the entries it names. A mutation aimed at a submission with no
//! entry is a silent no-op (the caller may be racing a cache that is still being initialised),
//! so these methods report whether anything changed instead of returning errors.
//!
//! ## Group comments
//!
//! The LMS copies one group comment to every member of the group, so the comment is stored on a
//! single canonical entry: the one with the lowest submission id. See
//! [`GradingCache::canonical_submission_id`].

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{GradingError, GradingResult};
use crate::types::{Rubric, RubricAssessment, Submission, SubmissionId, User};

/// A comment addressed to one student only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualComment {
    pub text: String,
}

impl IndividualComment {
    pub fn is_group_comment(&self) -> bool {
        false
    }
}

/// A comment addressed to the whole group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupComment {
    pub text: String,
    /// Set once the comment has been written upstream. Cleared again by every edit.
    pub sent: bool,
}

impl GroupComment {
    pub fn is_group_comment(&self) -> bool {
        true
    }
}

/// In-progress grading state for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub submission_id: SubmissionId,
    pub user: User,
    pub rubric_assessment: RubricAssessment,
    pub individual_comment: Option<IndividualComment>,
    pub group_comment: Option<GroupComment>,
}

impl CacheEntry {
    /// Empty entry for `submission`. Upstream scores are seeded separately by the reconciler.
    pub fn new(submission: &Submission) -> Self {
        Self {
            submission_id: submission.id,
            user: submission.user.clone(),
            rubric_assessment: RubricAssessment::new(),
            individual_comment: None,
            group_comment: None,
        }
    }

    pub fn points(&self, criterion_id: &str) -> Option<f64> {
        self.rubric_assessment
            .get(criterion_id)
            .and_then(|entry| entry.points)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GradingCache {
    entries: BTreeMap<SubmissionId, CacheEntry>,
    rubric: Option<Rubric>,
}

impl GradingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, submission_id: SubmissionId) -> Option<&CacheEntry> {
        self.entries.get(&submission_id)
    }

    pub fn contains(&self, submission_id: SubmissionId) -> bool {
        self.entries.contains_key(&submission_id)
    }

    /// Entries in ascending submission id order.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn rubric(&self) -> Option<&Rubric> {
        self.rubric.as_ref()
    }

    /// The entry that carries the group comment.
    pub fn canonical_submission_id(&self) -> Option<SubmissionId> {
        self.entries.keys().next().copied()
    }

    pub fn group_comment(&self) -> Option<&GroupComment> {
        self.canonical_submission_id()
            .and_then(|id| self.entries.get(&id))
            .and_then(|entry| entry.group_comment.as_ref())
    }

    /// Set the points for one criterion of one submission.
    ///
    /// The criterion key is created if the submission has never been scored on it. The rating
    /// id is taken from the rubric rating worth exactly `points`; a value matching no rating is
    /// a custom score and carries no rating id.
    ///
    /// Returns `false` without touching the cache if `submission_id` has no entry.
    pub fn update_score(
        &mut self,
        submission_id: SubmissionId,
        criterion_id: &str,
        points: f64,
    ) -> bool {
        let rating_id = self
            .rubric
            .as_ref()
            .and_then(|rubric| rubric.criterion(criterion_id))
            .and_then(|criterion| criterion.rating_for_points(points))
            .map(|rating| rating.id.clone());

        let Some(entry) = self.entries.get_mut(&submission_id) else {
            debug!("Ignoring score for submission {submission_id}: not in the grading cache");
            return false;
        };

        let assessment = entry
            .rubric_assessment
            .entry(criterion_id.to_string())
            .or_default();
        assessment.points = Some(points);
        assessment.rating_id = rating_id;
        true
    }

    /// Apply `points` for `criterion_id` to every member of `roster`.
    ///
    /// `roster` is the group as the caller sees it now, not whatever membership the cache was
    /// built from. Members without an entry are skipped. Returns the number of entries updated.
    pub fn update_score_for_group(
        &mut self,
        roster: &[Submission],
        criterion_id: &str,
        points: f64,
    ) -> usize {
        roster
            .iter()
            .filter(|member| self.update_score(member.id, criterion_id, points))
            .count()
    }

    /// Score `criterion_id`, propagating across `roster` when the rubric marks it as a group
    /// criterion and scoring `target` alone otherwise.
    pub fn update_score_for_criterion(
        &mut self,
        target: SubmissionId,
        roster: &[Submission],
        criterion_id: &str,
        points: f64,
    ) -> usize {
        let is_group = self
            .rubric
            .as_ref()
            .and_then(|rubric| rubric.criterion(criterion_id))
            .is_some_and(|criterion| criterion.is_group_criterion);

        if is_group {
            self.update_score_for_group(roster, criterion_id, points)
        } else {
            usize::from(self.update_score(target, criterion_id, points))
        }
    }

    /// Select a rubric rating, setting both its points and its id.
    ///
    /// No-op if the submission has no entry, or the rubric knows neither the criterion nor the
    /// rating.
    pub fn update_rating(
        &mut self,
        submission_id: SubmissionId,
        criterion_id: &str,
        rating_id: &str,
    ) -> bool {
        let Some(rating) = self
            .rubric
            .as_ref()
            .and_then(|rubric| rubric.criterion(criterion_id))
            .and_then(|criterion| criterion.rating(rating_id))
        else {
            debug!("Ignoring unknown rating '{rating_id}' for criterion '{criterion_id}'");
            return false;
        };
        let points = rating.points;
        let rating_id = rating.id.clone();

        let Some(entry) = self.entries.get_mut(&submission_id) else {
            debug!("Ignoring rating for submission {submission_id}: not in the grading cache");
            return false;
        };

        let assessment = entry
            .rubric_assessment
            .entry(criterion_id.to_string())
            .or_default();
        assessment.points = Some(points);
        assessment.rating_id = Some(rating_id);
        true
    }

    /// Set the free-text comment on one criterion of one submission.
    pub fn update_criterion_comment(
        &mut self,
        submission_id: SubmissionId,
        criterion_id: &str,
        text: &str,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&submission_id) else {
            debug!("Ignoring criterion comment for submission {submission_id}: not in the grading cache");
            return false;
        };

        entry
            .rubric_assessment
            .entry(criterion_id.to_string())
            .or_default()
            .comments = text.to_string();
        true
    }

    /// Set or clear the individual comment of one submission.
    ///
    /// Blank text clears the comment so the submit step never sends an empty payload.
    pub fn update_comment(&mut self, submission_id: SubmissionId, text: &str) -> bool {
        let Some(entry) = self.entries.get_mut(&submission_id) else {
            debug!("Ignoring comment for submission {submission_id}: not in the grading cache");
            return false;
        };

        entry.individual_comment = if text.trim().is_empty() {
            None
        } else {
            Some(IndividualComment {
                text: text.to_string(),
            })
        };
        true
    }

    /// Set or clear the group comment on the canonical entry.
    ///
    /// Every edit marks the comment unsent. Blank text clears it. No-op on an empty cache.
    pub fn update_group_comment(&mut self, text: &str) -> bool {
        let Some(entry) = self.entries.values_mut().next() else {
            debug!("Ignoring group comment: grading cache is empty");
            return false;
        };

        entry.group_comment = if text.trim().is_empty() {
            None
        } else {
            Some(GroupComment {
                text: text.to_string(),
                sent: false,
            })
        };
        true
    }

    /// Record that the group comment has been written upstream.
    pub fn mark_group_comment_sent(&mut self) -> bool {
        match self
            .entries
            .values_mut()
            .next()
            .and_then(|entry| entry.group_comment.as_mut())
        {
            Some(comment) => {
                comment.sent = true;
                true
            }
            None => false,
        }
    }

    /// Check that the cache can be handed to the submit step.
    ///
    /// # Errors
    ///
    /// Returns [`GradingError::IncompleteEntry`] for the first scored criterion whose points
    /// match a rubric rating but which carries no rating id.
    pub fn validate_complete(&self) -> GradingResult<()> {
        let Some(rubric) = self.rubric.as_ref() else {
            return Ok(());
        };

        for entry in self.entries.values() {
            for (criterion_id, assessment) in &entry.rubric_assessment {
                let (Some(points), None) = (assessment.points, assessment.rating_id.as_ref())
                else {
                    continue;
                };
                let has_rating = rubric
                    .criterion(criterion_id)
                    .and_then(|criterion| criterion.rating_for_points(points))
                    .is_some();
                if has_rating {
                    return Err(GradingError::IncompleteEntry {
                        submission_id: entry.submission_id,
                        criterion_id: criterion_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Sum of the scored criteria of one submission.
    pub fn score_total(&self, submission_id: SubmissionId) -> Option<f64> {
        self.entries.get(&submission_id).map(|entry| {
            entry
                .rubric_assessment
                .values()
                .filter_map(|assessment| assessment.points)
                .sum()
        })
    }

    /// Drop entries whose grades have been written upstream. Returns how many were removed.
    ///
    /// An unsent group comment on a removed canonical entry moves to the next remaining member.
    pub fn clear_submitted(&mut self, submission_ids: &[SubmissionId]) -> usize {
        let unsent_comment = self
            .canonical_submission_id()
            .filter(|id| submission_ids.contains(id))
            .and_then(|id| self.entries.get_mut(&id))
            .and_then(|entry| entry.group_comment.take_if(|comment| !comment.sent));

        let removed = submission_ids
            .iter()
            .filter(|id| self.entries.remove(*id).is_some())
            .count();

        if let Some(comment) = unsent_comment {
            if self.entries.is_empty() {
                warn!("Dropping unsent group comment: every group member was cleared");
            } else {
                debug!("Moving unsent group comment to the new canonical entry");
                self.rehome_group_comment(comment);
            }
        }
        removed
    }

    pub(crate) fn set_rubric(&mut self, rubric: Rubric) {
        self.rubric = Some(rubric);
    }

    /// Insert an empty entry for `submission` unless one is already resident.
    pub(crate) fn ensure_entry(&mut self, submission: &Submission) -> bool {
        if self.entries.contains_key(&submission.id) {
            return false;
        }
        self.entries
            .insert(submission.id, CacheEntry::new(submission));
        true
    }

    pub(crate) fn entry_mut(&mut self, submission_id: SubmissionId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&submission_id)
    }

    /// Keep only entries for `roster`. Returns how many were dropped.
    pub(crate) fn retain_roster(&mut self, roster: &HashSet<SubmissionId>) -> usize {
        let before = self.entries.len();
        let orphaned_comment = self
            .canonical_submission_id()
            .filter(|id| !roster.contains(id))
            .and_then(|id| self.entries.get_mut(&id))
            .and_then(|entry| entry.group_comment.take());

        self.entries.retain(|id, _| roster.contains(id));

        if let Some(comment) = orphaned_comment {
            self.rehome_group_comment(comment);
        }
        before - self.entries.len()
    }

    /// Move any group comment stored off the canonical entry back onto it.
    pub(crate) fn normalize_group_comment(&mut self) {
        let Some(canonical) = self.canonical_submission_id() else {
            return;
        };
        let stray = self
            .entries
            .iter_mut()
            .filter(|(id, _)| **id != canonical)
            .find_map(|(_, entry)| entry.group_comment.take());

        if let Some(comment) = stray {
            self.rehome_group_comment(comment);
        }
    }

    fn rehome_group_comment(&mut self, comment: GroupComment) {
        if let Some(entry) = self.entries.values_mut().next() {
            if entry.group_comment.is_none() {
                entry.group_comment = Some(comment);
            }
        }
    }
}
