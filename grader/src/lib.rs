//! # Grader Library
//!
//! The grouping and grading-cache engine behind rubric grading of LMS assignments. It takes
//! flat submission lists from the LMS, files them into collaborative groups, and holds the
//! grader's in-progress rubric scores and comments until they are written back upstream.
//!
//! ## Key Concepts
//! - **Normalizer**: Converts upstream submission records into canonical [`Submission`]s.
//! - **Partitioner**: Buckets submissions by group name, with a `"No Group"` fallback bucket.
//! - **GradingCache**: Per-session store of unsent scores and comments, with group propagation
//!   for group criteria and a single canonical home for the group comment.
//! - **Reconciler**: Seeds the cache from upstream scores without ever overwriting a score the
//!   cache already holds.
//! - **GradingWorkspace**: One cache per open group, gated on the active group so stale
//!   fetches are discarded.
//!
//! ## Flow
//! raw JSON → [`normalizer::normalize_batch`] → [`partitioner::partition`] →
//! [`session::GradingWorkspace::apply_fetch`] → cache edits → submit step (outside this crate).

pub mod cache;
pub mod error;
pub mod normalizer;
pub mod partitioner;
pub mod reconciler;
pub mod session;
pub mod traits;
pub mod types;

pub use cache::{CacheEntry, GradingCache, GroupComment, IndividualComment};
pub use error::{GradingError, GradingResult};
pub use normalizer::{NormalizedBatch, normalize_batch, normalize_payload};
pub use partitioner::{GroupedSubmissions, NO_GROUP, Partitioner, partition};
pub use reconciler::{InitMode, ReconcileSummary, Reconciler};
pub use session::{FetchOutcome, FetchTicket, GradingWorkspace, SessionKey};
pub use types::{
    AssessmentEntry, Criterion, Graded, Group, GroupId, Rating, Rubric, RubricAssessment,
    Submission, SubmissionComment, SubmissionId, User, UserId, WorkflowState,
};
