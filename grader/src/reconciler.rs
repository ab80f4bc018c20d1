//! # Reconciler Module
//!
//! Populates a [`GradingCache`] when a grading session opens, merging scores already recorded
//! upstream with any edits still resident in the cache from an earlier session.
//!
//! For any `(submission, criterion)` pair, a score already in the cache wins over the upstream
//! score. Restoring a session and loading fresh from upstream share one seeding pass; the pass
//! only ever fills pairs the cache has no score for, so re-opening a group never discards work
//! that has not been sent yet.

use std::collections::HashSet;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cache::GradingCache;
use crate::error::{GradingError, GradingResult};
use crate::types::{Rubric, Submission};

/// How a grading session is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InitMode {
    /// Leave the cache alone.
    None,
    /// Re-open a session whose cache may still hold unsent edits.
    #[default]
    Restore,
    /// Open a session from upstream data.
    FromUpstream,
}

impl FromStr for InitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(InitMode::None),
            "restore" => Ok(InitMode::Restore),
            "fromUpstream" | "from_upstream" => Ok(InitMode::FromUpstream),
            other => Err(format!("Unknown initialisation mode '{other}'")),
        }
    }
}

/// What one initialisation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Entries created for submissions that had none.
    pub entries_created: usize,
    /// Entries dropped because their submission left the roster.
    pub entries_pruned: usize,
    /// Criterion scores copied from upstream.
    pub seeded: usize,
    /// Criterion scores left as they were because the cache already had one.
    pub kept: usize,
}

pub struct Reconciler;

impl Reconciler {
    /// Bring `cache` in line with `submissions`, seeding upstream scores the cache lacks.
    ///
    /// # Arguments
    /// * `cache` - The session's cache. May already hold entries from an earlier session.
    /// * `submissions` - The group's current roster.
    /// * `rubric` - The rubric being graded against.
    /// * `mode` - [`InitMode::None`] returns immediately without any checks.
    ///
    /// # Errors
    /// Returns [`GradingError::MissingRubric`] when `rubric` is `None` in any other mode. The
    /// cache is left untouched in that case.
    pub fn initialize(
        cache: &mut GradingCache,
        submissions: &[Submission],
        rubric: Option<&Rubric>,
        mode: InitMode,
    ) -> GradingResult<ReconcileSummary> {
        if mode == InitMode::None {
            return Ok(ReconcileSummary::default());
        }
        let rubric = rubric.ok_or(GradingError::MissingRubric)?;

        let mut summary = ReconcileSummary::default();
        let roster: HashSet<_> = submissions.iter().map(|s| s.id).collect();
        summary.entries_pruned = cache.retain_roster(&roster);
        cache.set_rubric(rubric.clone());

        for submission in submissions {
            if cache.ensure_entry(submission) {
                summary.entries_created += 1;
            }
            let Some(entry) = cache.entry_mut(submission.id) else {
                continue;
            };

            for criterion in &rubric.criteria {
                let Some(upstream) = submission
                    .assessment_for(&criterion.id)
                    .filter(|upstream| upstream.is_graded())
                else {
                    continue;
                };

                let slot = entry
                    .rubric_assessment
                    .entry(criterion.id.clone())
                    .or_default();
                if slot.is_graded() {
                    summary.kept += 1;
                    continue;
                }

                slot.points = upstream.points;
                slot.rating_id = upstream.rating_id.clone().or_else(|| {
                    upstream
                        .points
                        .and_then(|points| criterion.rating_for_points(points))
                        .map(|rating| rating.id.clone())
                });
                if slot.comments.is_empty() {
                    slot.comments = upstream.comments.clone();
                }
                summary.seeded += 1;
            }
        }
        cache.normalize_group_comment();

        debug!(
            "Initialised grading cache ({mode:?}): {} created, {} pruned, {} seeded, {} kept",
            summary.entries_created, summary.entries_pruned, summary.seeded, summary.kept
        );
        Ok(summary)
    }
}
