//! # Types Module
//!
//! This module defines the core data structures shared by every stage of the grading engine:
//! the canonical [`Submission`] produced by the normalizer, the rubric definition consumed
//! (never mutated) by the cache, and the id newtypes that key everything together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Upstream submission id, stable across fetches.
    SubmissionId
);
id_newtype!(
    /// Upstream user id.
    UserId
);
id_newtype!(
    /// Upstream group id, when the LMS exposes one.
    GroupId
);

/// The student who owns a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Login or SIS handle used outside the LMS.
    pub external_handle: String,
}

/// Group membership as reported upstream. An empty `name` means "resolve via lookup".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub id: Option<GroupId>,
    pub name: String,
}

/// A comment already stored upstream against a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionComment {
    pub id: u64,
    pub author_name: String,
    pub text: String,
}

/// Score, rating and comment for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssessmentEntry {
    /// `None` when the criterion was commented on but never scored.
    pub points: Option<f64>,
    pub rating_id: Option<String>,
    #[serde(default)]
    pub comments: String,
}

impl AssessmentEntry {
    pub fn is_graded(&self) -> bool {
        self.points.is_some()
    }
}

/// Criterion id to assessment.
pub type RubricAssessment = BTreeMap<String, AssessmentEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Submitted,
    #[default]
    Unsubmitted,
    Graded,
    PendingReview,
}

impl WorkflowState {
    /// Parses the upstream spelling. Returns `None` for states this engine does not know.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submitted" => Some(Self::Submitted),
            "unsubmitted" => Some(Self::Unsubmitted),
            "graded" => Some(Self::Graded),
            "pending_review" => Some(Self::PendingReview),
            _ => None,
        }
    }
}

/// Upstream reports grading either as a flag or as the time the grade was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Graded {
    Flag(bool),
    At(DateTime<Utc>),
}

impl Graded {
    pub fn is_graded(&self) -> bool {
        match self {
            Graded::Flag(flag) => *flag,
            Graded::At(_) => true,
        }
    }
}

impl Default for Graded {
    fn default() -> Self {
        Graded::Flag(false)
    }
}

/// One student's work item in canonical form. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub user: User,
    #[serde(default)]
    pub group: Group,
    #[serde(default)]
    pub comments: Vec<SubmissionComment>,
    #[serde(default)]
    pub rubric_assessment: Option<RubricAssessment>,
    #[serde(default)]
    pub workflow_state: WorkflowState,
    #[serde(default)]
    pub graded: Graded,
}

impl Submission {
    /// Upstream assessment for `criterion_id`, if one was recorded.
    pub fn assessment_for(&self, criterion_id: &str) -> Option<&AssessmentEntry> {
        self.rubric_assessment
            .as_ref()
            .and_then(|assessment| assessment.get(criterion_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub points: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    /// When set, a score given to one group member applies to every member.
    #[serde(default)]
    pub is_group_criterion: bool,
}

impl Criterion {
    /// The rating worth exactly `points`, if the criterion defines one.
    pub fn rating_for_points(&self, points: f64) -> Option<&Rating> {
        self.ratings
            .iter()
            .find(|rating| (rating.points - points).abs() < f64::EPSILON)
    }

    pub fn rating(&self, rating_id: &str) -> Option<&Rating> {
        self.ratings.iter().find(|rating| rating.id == rating_id)
    }

    /// Highest rating value, or zero for a criterion with no ratings.
    pub fn max_points(&self) -> f64 {
        self.ratings
            .iter()
            .map(|rating| rating.points)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn criterion(&self, criterion_id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == criterion_id)
    }

    pub fn points_possible(&self) -> f64 {
        self.criteria.iter().map(Criterion::max_points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criterion() -> Criterion {
        Criterion {
            id: "c1".to_string(),
            description: "Design".to_string(),
            ratings: vec![
                Rating {
                    id: "r_full".to_string(),
                    points: 5.0,
                    description: "Full marks".to_string(),
                },
                Rating {
                    id: "r_none".to_string(),
                    points: 0.0,
                    description: "No marks".to_string(),
                },
            ],
            is_group_criterion: false,
        }
    }

    #[test]
    fn test_rating_for_points_matches_exact_value() {
        let c = criterion();
        assert_eq!(c.rating_for_points(5.0).map(|r| r.id.as_str()), Some("r_full"));
        assert!(c.rating_for_points(2.5).is_none());
    }

    #[test]
    fn test_points_possible_sums_highest_ratings() {
        let mut second = criterion();
        second.id = "c2".to_string();
        second.ratings[0].points = 3.0;
        let rubric = Rubric {
            id: 1,
            title: "Project".to_string(),
            criteria: vec![criterion(), second],
        };
        assert_eq!(rubric.points_possible(), 8.0);
    }

    #[test]
    fn test_graded_accepts_flag_or_timestamp() {
        let flag: Graded = serde_json::from_value(json!(true)).unwrap();
        assert!(flag.is_graded());

        let at: Graded = serde_json::from_value(json!("2025-03-01T10:00:00Z")).unwrap();
        assert!(matches!(at, Graded::At(_)));
        assert!(at.is_graded());

        assert!(!Graded::default().is_graded());
    }

    #[test]
    fn test_workflow_state_parse() {
        assert_eq!(
            WorkflowState::parse("pending_review"),
            Some(WorkflowState::PendingReview)
        );
        assert_eq!(WorkflowState::parse("deleted"), None);
    }

    #[test]
    fn test_submission_assessment_for() {
        let mut assessment = RubricAssessment::new();
        assessment.insert(
            "c1".to_string(),
            AssessmentEntry {
                points: Some(4.0),
                rating_id: None,
                comments: String::new(),
            },
        );
        let submission = Submission {
            id: SubmissionId(1),
            user: User {
                id: UserId(10),
                name: "Ada".to_string(),
                external_handle: "ada".to_string(),
            },
            group: Group::default(),
            comments: vec![],
            rubric_assessment: Some(assessment),
            workflow_state: WorkflowState::Submitted,
            graded: Graded::default(),
        };
        assert_eq!(submission.assessment_for("c1").and_then(|a| a.points), Some(4.0));
        assert!(submission.assessment_for("c2").is_none());
    }
}
