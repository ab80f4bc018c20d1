//! # Session Module
//!
//! Keeps one [`GradingCache`] per open group and gates fetch results on the fetch that is
//! current when they arrive.
//!
//! Fetches are asynchronous and may resolve out of order, including two fetches for the same
//! group when the grader leaves and comes back. [`GradingWorkspace::select`] hands out a
//! [`FetchTicket`] stamped with a fresh generation, and [`GradingWorkspace::apply_fetch`]
//! discards any result whose ticket is no longer the current one. A slow response can therefore
//! never overwrite the cache the grader is looking at, whichever group it was issued for.

use std::collections::HashMap;

use log::info;

use crate::cache::GradingCache;
use crate::error::GradingResult;
use crate::reconciler::{InitMode, ReconcileSummary, Reconciler};
use crate::types::{Rubric, Submission};

/// Identity of one grading session: an assignment and one of its groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub assignment_id: u64,
    pub group_name: String,
}

impl SessionKey {
    pub fn new(assignment_id: u64, group_name: impl Into<String>) -> Self {
        Self {
            assignment_id,
            group_name: group_name.into(),
        }
    }
}

/// Tag carried by one fetch: the session it was issued for and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: SessionKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a fetch result handed to [`GradingWorkspace::apply_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(ReconcileSummary),
    /// A newer fetch has been issued since this one.
    Discarded,
}

#[derive(Debug, Default)]
pub struct GradingWorkspace {
    caches: HashMap<SessionKey, GradingCache>,
    current: Option<FetchTicket>,
    generation: u64,
}

impl GradingWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self, key: SessionKey) -> FetchTicket {
        self.generation += 1;
        let ticket = FetchTicket {
            key,
            generation: self.generation,
        };
        self.current = Some(ticket.clone());
        ticket
    }

    /// Make `key` the active session and issue the ticket for its fetch. A cache left behind by
    /// an earlier visit is kept.
    pub fn select(&mut self, key: SessionKey) -> FetchTicket {
        self.caches.entry(key.clone()).or_default();
        self.issue(key)
    }

    /// Issue a new ticket for the active session, superseding any fetch still in flight.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        let key = self.current.as_ref()?.key.clone();
        Some(self.issue(key))
    }

    pub fn active_key(&self) -> Option<&SessionKey> {
        self.current.as_ref().map(FetchTicket::key)
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.current.as_ref() == Some(ticket)
    }

    pub fn active_cache(&self) -> Option<&GradingCache> {
        self.active_key().and_then(|key| self.caches.get(key))
    }

    pub fn active_cache_mut(&mut self) -> Option<&mut GradingCache> {
        let key = &self.current.as_ref()?.key;
        self.caches.get_mut(key)
    }

    pub fn cache(&self, key: &SessionKey) -> Option<&GradingCache> {
        self.caches.get(key)
    }

    /// Reconcile a fetch result into its session's cache, provided `ticket` is still current.
    ///
    /// # Errors
    /// Propagates [`GradingError::MissingRubric`](crate::error::GradingError::MissingRubric)
    /// from the reconciler. Stale fetches are discarded before the rubric is checked.
    pub fn apply_fetch(
        &mut self,
        ticket: &FetchTicket,
        submissions: &[Submission],
        rubric: Option<&Rubric>,
        mode: InitMode,
    ) -> GradingResult<FetchOutcome> {
        if !self.is_current(ticket) {
            info!(
                "Discarding stale fetch #{} for assignment {} group '{}'",
                ticket.generation, ticket.key.assignment_id, ticket.key.group_name
            );
            return Ok(FetchOutcome::Discarded);
        }

        let cache = self.caches.entry(ticket.key.clone()).or_default();
        let summary = Reconciler::initialize(cache, submissions, rubric, mode)?;
        Ok(FetchOutcome::Applied(summary))
    }

    /// Drop the cache for `key` once its grades have been written upstream.
    pub fn finish(&mut self, key: &SessionKey) -> Option<GradingCache> {
        if self.active_key() == Some(key) {
            self.current = None;
        }
        self.caches.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradingError;
    use crate::types::{
        AssessmentEntry, Criterion, Graded, Group, RubricAssessment, SubmissionId, User, UserId,
        WorkflowState,
    };

    fn mock_rubric() -> Rubric {
        Rubric {
            id: 1,
            title: String::new(),
            criteria: vec![Criterion {
                id: "c1".to_string(),
                description: String::new(),
                ratings: vec![],
                is_group_criterion: true,
            }],
        }
    }

    fn mock_submission(id: u64, group: &str, c1: Option<f64>) -> Submission {
        let rubric_assessment = c1.map(|points| {
            RubricAssessment::from([(
                "c1".to_string(),
                AssessmentEntry {
                    points: Some(points),
                    rating_id: None,
                    comments: String::new(),
                },
            )])
        });
        Submission {
            id: SubmissionId(id),
            user: User {
                id: UserId(id),
                name: String::new(),
                external_handle: String::new(),
            },
            group: Group {
                id: None,
                name: group.to_string(),
            },
            comments: vec![],
            rubric_assessment,
            workflow_state: WorkflowState::Submitted,
            graded: Graded::default(),
        }
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let alpha = SessionKey::new(7, "Alpha");
        let beta = SessionKey::new(7, "Beta");
        let mut workspace = GradingWorkspace::new();
        let rubric = mock_rubric();

        let alpha_ticket = workspace.select(alpha.clone());
        workspace.select(beta);

        let outcome = workspace
            .apply_fetch(
                &alpha_ticket,
                &[mock_submission(1, "Alpha", Some(3.0))],
                Some(&rubric),
                InitMode::FromUpstream,
            )
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(workspace.cache(&alpha).unwrap().is_empty());
        assert!(workspace.active_cache().unwrap().is_empty());
    }

    #[test]
    fn test_stale_fetch_without_rubric_is_still_discarded() {
        let mut workspace = GradingWorkspace::new();
        let alpha_ticket = workspace.select(SessionKey::new(1, "Alpha"));
        workspace.select(SessionKey::new(1, "Beta"));
        let outcome = workspace
            .apply_fetch(&alpha_ticket, &[], None, InitMode::FromUpstream)
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
    }

    #[test]
    fn test_out_of_order_fetches_for_same_group() {
        let alpha = SessionKey::new(7, "Alpha");
        let rubric = mock_rubric();
        let mut workspace = GradingWorkspace::new();

        let first = workspace.select(alpha.clone());
        workspace.select(SessionKey::new(7, "Beta"));
        let second = workspace.select(alpha.clone());
        assert_ne!(first, second);

        let current_roster = vec![mock_submission(1, "Alpha", None), mock_submission(2, "Alpha", None)];
        workspace
            .apply_fetch(&second, &current_roster, Some(&rubric), InitMode::FromUpstream)
            .unwrap();
        workspace
            .active_cache_mut()
            .unwrap()
            .update_score(SubmissionId(2), "c1", 6.0);

        let old_roster = vec![mock_submission(1, "Alpha", Some(1.0))];
        let late = workspace
            .apply_fetch(&first, &old_roster, Some(&rubric), InitMode::Restore)
            .unwrap();

        assert_eq!(late, FetchOutcome::Discarded);
        let cache = workspace.active_cache().unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(SubmissionId(2)).unwrap().points("c1"), Some(6.0));
        assert_eq!(cache.get(SubmissionId(1)).unwrap().points("c1"), None);
    }

    #[test]
    fn test_refresh_supersedes_in_flight_fetch() {
        let mut workspace = GradingWorkspace::new();
        let rubric = mock_rubric();
        let first = workspace.select(SessionKey::new(3, "Alpha"));
        let refreshed = workspace.refresh().unwrap();

        assert_eq!(refreshed.key(), first.key());
        assert!(refreshed.generation() > first.generation());
        let roster = [mock_submission(1, "Alpha", None)];
        assert_eq!(
            workspace
                .apply_fetch(&first, &roster, Some(&rubric), InitMode::FromUpstream)
                .unwrap(),
            FetchOutcome::Discarded
        );
        assert!(matches!(
            workspace
                .apply_fetch(&refreshed, &roster, Some(&rubric), InitMode::FromUpstream)
                .unwrap(),
            FetchOutcome::Applied(_)
        ));
    }

    #[test]
    fn test_refresh_without_active_session() {
        assert!(GradingWorkspace::new().refresh().is_none());
    }

    #[test]
    fn test_returning_to_a_group_restores_its_edits() {
        let alpha = SessionKey::new(7, "Alpha");
        let rubric = mock_rubric();
        let alpha_roster = vec![mock_submission(1, "Alpha", Some(3.0))];
        let mut workspace = GradingWorkspace::new();

        let ticket = workspace.select(alpha.clone());
        workspace
            .apply_fetch(&ticket, &alpha_roster, Some(&rubric), InitMode::FromUpstream)
            .unwrap();
        workspace
            .active_cache_mut()
            .unwrap()
            .update_score(SubmissionId(1), "c1", 8.0);

        workspace.select(SessionKey::new(7, "Beta"));
        let ticket = workspace.select(alpha);
        let outcome = workspace
            .apply_fetch(&ticket, &alpha_roster, Some(&rubric), InitMode::Restore)
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::Applied(summary) if summary.kept == 1));
        let entry = workspace.active_cache().unwrap().get(SubmissionId(1)).unwrap();
        assert_eq!(entry.points("c1"), Some(8.0));
    }

    #[test]
    fn test_missing_rubric_surfaces_for_active_session() {
        let mut workspace = GradingWorkspace::new();
        let ticket = workspace.select(SessionKey::new(1, "Alpha"));
        let result = workspace.apply_fetch(
            &ticket,
            &[mock_submission(1, "Alpha", None)],
            None,
            InitMode::Restore,
        );
        assert!(matches!(result, Err(GradingError::MissingRubric)));
    }

    #[test]
    fn test_finish_drops_cache_and_deactivates() {
        let key = SessionKey::new(1, "Alpha");
        let mut workspace = GradingWorkspace::new();
        let ticket = workspace.select(key.clone());

        assert!(workspace.finish(&key).is_some());
        assert!(workspace.active_key().is_none());
        assert!(!workspace.is_current(&ticket));
        assert!(workspace.cache(&key).is_none());
        assert!(workspace.active_cache().is_none());
    }
}
