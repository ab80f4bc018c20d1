//! # Normalizer Module
//!
//! Batch entry points around the [`SubmissionNormalizer`] trait. Each upstream record is
//! normalized independently: a malformed record is reported and excluded, it never aborts the
//! rest of the batch.
//!
//! - [`upstream_json`]: Normalizer for the LMS's JSON submission shape.

pub mod upstream_json;

use log::warn;
use serde_json::Value;

use crate::error::{GradingError, GradingResult};
use crate::traits::normalizer::SubmissionNormalizer;
use crate::types::Submission;
use upstream_json::UpstreamJsonNormalizer;

/// Outcome of normalizing one upstream batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Records that normalized cleanly, in upstream order.
    pub submissions: Vec<Submission>,
    /// One error per excluded record.
    pub failures: Vec<GradingError>,
}

impl NormalizedBatch {
    /// User-facing summary of excluded records, or `None` when every record loaded.
    pub fn load_summary(&self) -> Option<String> {
        match self.failures.len() {
            0 => None,
            1 => Some("1 submission could not be loaded".to_string()),
            n => Some(format!("{n} submissions could not be loaded")),
        }
    }
}

/// Normalizes every record in `raws`, collecting failures instead of stopping at the first.
pub fn normalize_batch<I, N>(normalizer: &N, raws: impl IntoIterator<Item = I>) -> NormalizedBatch
where
    N: SubmissionNormalizer<I>,
{
    let mut batch = NormalizedBatch::default();

    for (index, raw) in raws.into_iter().enumerate() {
        match normalizer.normalize(raw, index) {
            Ok(submission) => batch.submissions.push(submission),
            Err(err) => {
                warn!("Excluding upstream submission: {err}");
                batch.failures.push(err);
            }
        }
    }

    batch
}

/// Parses a raw upstream response body (a JSON array of submissions) and normalizes it.
///
/// # Errors
///
/// * [`GradingError::InvalidJson`] if the body is not valid JSON.
/// * [`GradingError::MissingSubmissions`] if the body is valid JSON but not an array.
pub fn normalize_payload(body: &str) -> GradingResult<NormalizedBatch> {
    let value: Value = serde_json::from_str(body)?;
    let records = value.as_array().ok_or(GradingError::MissingSubmissions)?;
    Ok(normalize_batch(&UpstreamJsonNormalizer, records.iter()))
}
