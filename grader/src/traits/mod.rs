//!
//! Traits Module
//!
//! This module contains the seams where callers plug their own upstream into the engine.
//!
//! - [`normalizer`]: Converts an upstream submission record into a canonical [`Submission`](crate::types::Submission).
//! - [`group_lookup`]: Resolves a group name for a user whose submission carries none.

pub mod group_lookup;
pub mod normalizer;
