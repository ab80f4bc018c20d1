//! Normalizer Trait
//!
//! This module defines the [`SubmissionNormalizer`] trait, the generic interface for turning an
//! upstream submission record of any shape into the engine's canonical [`Submission`].
//!
//! Implementations must tolerate missing optional fields (comments, group, rubric assessment)
//! and fail only when an identity field is absent.
//!
//! # Example
//!
//! ```rust
//! use grader::error::{GradingError, GradingResult};
//! use grader::traits::normalizer::SubmissionNormalizer;
//! use grader::types::{Graded, Group, Submission, SubmissionId, User, UserId, WorkflowState};
//!
//! struct PairNormalizer;
//!
//! impl SubmissionNormalizer<(u64, u64)> for PairNormalizer {
//!     fn normalize(&self, raw: (u64, u64), _index: usize) -> GradingResult<Submission> {
//!         Ok(Submission {
//!             id: SubmissionId(raw.0),
//!             user: User { id: UserId(raw.1), name: String::new(), external_handle: String::new() },
//!             group: Group::default(),
//!             comments: vec![],
//!             rubric_assessment: None,
//!             workflow_state: WorkflowState::Submitted,
//!             graded: Graded::default(),
//!         })
//!     }
//! }
//!
//! let submission = PairNormalizer.normalize((1, 10), 0).unwrap();
//! assert_eq!(submission.user.id, UserId(10));
//! ```

use crate::error::GradingResult;
use crate::types::Submission;

/// Converts one upstream record into a [`Submission`].
///
/// # Type Parameters
///
/// * `Input` - The upstream record type.
pub trait SubmissionNormalizer<Input> {
    /// Normalize a single record.
    ///
    /// # Arguments
    ///
    /// * `raw` - The upstream record.
    /// * `index` - Position of the record in its batch, reported back in errors.
    ///
    /// # Errors
    ///
    /// Returns [`GradingError::MalformedSubmission`](crate::error::GradingError::MalformedSubmission)
    /// if the submission id or user id is missing.
    fn normalize(&self, raw: Input, index: usize) -> GradingResult<Submission>;
}
