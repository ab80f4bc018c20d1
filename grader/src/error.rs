//! Grader Error Types
//!
//! This module defines [`GradingError`], the single error type surfaced by the grading engine.
//! Only identity and session-level problems are errors. Cache mutations aimed at a submission
//! that is not (yet) in the cache are silent no-ops and never produce a [`GradingError`].
//!
//! # Example
//!
//! ```rust
//! use grader::error::{GradingError, GradingResult};
//!
//! fn require_rubric(present: bool) -> GradingResult<()> {
//!     if !present {
//!         return Err(GradingError::MissingRubric);
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_rubric(false).is_err());
//! ```

use crate::types::SubmissionId;

/// Result alias used throughout the grader crate.
pub type GradingResult<T> = Result<T, GradingError>;

/// Represents all error types that can occur in the grading engine.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    /// An upstream record is missing one of the identity fields the engine depends on.
    #[error("Malformed submission at index {index}: {reason}")]
    MalformedSubmission { index: usize, reason: String },

    /// A grading session was initialised without a rubric.
    #[error("Cannot initialise grading without a rubric")]
    MissingRubric,

    /// Partitioning was requested without a submission list.
    #[error("No submission list was supplied")]
    MissingSubmissions,

    /// The upstream payload is not valid JSON.
    #[error("Invalid upstream JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A graded criterion matches a rubric rating but carries no rating id.
    #[error("Submission {submission_id} has no rating id for criterion '{criterion_id}'")]
    IncompleteEntry {
        submission_id: SubmissionId,
        criterion_id: String,
    },
}

impl GradingError {
    /// Shorthand for [`GradingError::MalformedSubmission`].
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        GradingError::MalformedSubmission {
            index,
            reason: reason.into(),
        }
    }
}
