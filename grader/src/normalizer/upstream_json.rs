//! Upstream JSON Normalizer
//!
//! This module provides [`UpstreamJsonNormalizer`], which converts a submission record in the
//! LMS's JSON shape into a canonical [`Submission`].
//!
//! # JSON Shape
//!
//! ```json
//! {
//!   "id": 1,
//!   "user_id": 10,
//!   "user": { "id": 10, "name": "Ada", "login_id": "ada" },
//!   "group": { "id": 4, "name": "Alpha" },
//!   "submission_comments": [ { "id": 9, "author_name": "TA", "comment": "..." } ],
//!   "rubric_assessment": { "c1": { "points": 4, "rating_id": "r1", "comments": "" } },
//!   "workflow_state": "submitted",
//!   "graded_at": "2025-03-01T10:00:00Z"
//! }
//! ```
//!
//! - `id` and a user id (`user.id`, falling back to `user_id`) are required. Both may be
//!   numbers or numeric strings.
//! - Everything else is optional. A `null` group id or name reads as "no group".
//! - Unknown workflow states read as `unsubmitted`.

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::{Map, Value};

use crate::error::{GradingError, GradingResult};
use crate::traits::normalizer::SubmissionNormalizer;
use crate::types::{
    AssessmentEntry, Graded, Group, GroupId, RubricAssessment, Submission, SubmissionComment,
    SubmissionId, User, UserId, WorkflowState,
};

/// Normalizer for upstream submission JSON.
pub struct UpstreamJsonNormalizer;

/// Reads an id that upstream may send as a number or as a numeric string.
fn read_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn read_points(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_user(obj: &Map<String, Value>, index: usize) -> GradingResult<User> {
    let user_obj = obj.get("user").and_then(Value::as_object);

    let id = user_obj
        .and_then(|u| read_id(u.get("id")))
        .or_else(|| read_id(obj.get("user_id")))
        .ok_or_else(|| GradingError::malformed(index, "missing required 'user.id'"))?;

    let (name, external_handle) = match user_obj {
        Some(u) => {
            let handle = ["login_id", "sis_user_id", "short_name"]
                .iter()
                .find_map(|key| u.get(*key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string();
            (read_str(u, "name"), handle)
        }
        None => (String::new(), String::new()),
    };

    Ok(User {
        id: UserId(id),
        name,
        external_handle,
    })
}

fn read_group(obj: &Map<String, Value>) -> Group {
    match obj.get("group").and_then(Value::as_object) {
        Some(g) => Group {
            id: read_id(g.get("id")).map(GroupId),
            name: read_str(g, "name").trim().to_string(),
        },
        None => Group::default(),
    }
}

fn read_comments(obj: &Map<String, Value>) -> Vec<SubmissionComment> {
    let Some(raw) = obj.get("submission_comments").and_then(Value::as_array) else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(Value::as_object)
        .map(|c| SubmissionComment {
            id: read_id(c.get("id")).unwrap_or_default(),
            author_name: read_str(c, "author_name"),
            text: read_str(c, "comment"),
        })
        .collect()
}

fn read_assessment(obj: &Map<String, Value>) -> Option<RubricAssessment> {
    let raw = obj.get("rubric_assessment")?.as_object()?;

    let assessment = raw
        .iter()
        .filter_map(|(criterion_id, entry)| {
            let entry = entry.as_object()?;
            let rating_id = entry
                .get("rating_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
            Some((
                criterion_id.clone(),
                AssessmentEntry {
                    points: read_points(entry.get("points")),
                    rating_id,
                    comments: read_str(entry, "comments"),
                },
            ))
        })
        .collect();

    Some(assessment)
}

fn read_workflow_state(obj: &Map<String, Value>, id: u64) -> WorkflowState {
    match obj.get("workflow_state").and_then(Value::as_str) {
        Some(raw) => WorkflowState::parse(raw).unwrap_or_else(|| {
            warn!("Submission {id} has unknown workflow_state '{raw}', treating as unsubmitted");
            WorkflowState::Unsubmitted
        }),
        None => WorkflowState::Unsubmitted,
    }
}

fn read_graded(obj: &Map<String, Value>) -> Graded {
    if let Some(at) = obj
        .get("graded_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        return Graded::At(at.with_timezone(&Utc));
    }

    match obj.get("graded") {
        Some(Value::Bool(flag)) => Graded::Flag(*flag),
        _ => Graded::Flag(
            obj.get("grade_matches_current_submission")
                .and_then(Value::as_bool)
                .unwrap_or(false)
                && obj.get("score").is_some_and(|s| !s.is_null()),
        ),
    }
}

impl<'a> SubmissionNormalizer<&'a Value> for UpstreamJsonNormalizer {
    /// Normalizes one upstream JSON record.
    ///
    /// # Errors
    ///
    /// Returns [`GradingError::MalformedSubmission`] if the record is not an object, or if the
    /// submission id or user id is absent.
    fn normalize(&self, raw: &'a Value, index: usize) -> GradingResult<Submission> {
        let obj = raw
            .as_object()
            .ok_or_else(|| GradingError::malformed(index, "record is not a JSON object"))?;

        let id = read_id(obj.get("id"))
            .ok_or_else(|| GradingError::malformed(index, "missing required 'id'"))?;
        let user = read_user(obj, index)?;

        Ok(Submission {
            id: SubmissionId(id),
            user,
            group: read_group(obj),
            comments: read_comments(obj),
            rubric_assessment: read_assessment(obj),
            workflow_state: read_workflow_state(obj, id),
            graded: read_graded(obj),
        })
    }
}
