//! Inventory storage
//!
//! Two keyed collections back the discovery core: resource records and job
//! statuses. Both are shared between concurrently running discovery tasks,
//! so every implementation must be safe for concurrent writers.
//!
//! # Implementations
//!
//! - [`memory`] - process-local stores behind `parking_lot` locks
//! - [`journal`] - durable stores backed by an append-only JSON Lines file
//!
//! Reads are served from memory and never fail. Writes may fail, and a
//! failed write inside a discovery task collapses that task to `Failed`.

pub mod journal;
pub mod memory;
pub mod pattern;

pub use journal::{JournalJobStatusStore, JournalResourceStore};
pub use memory::{MemoryJobStatusStore, MemoryResourceStore};
pub use pattern::BucketPattern;

use crate::model::{JobId, JobStatus, NewResource, Resource, ResourceId, ResourceKind};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from store writes
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt journal {path} at line {line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only collection of discovered resources.
///
/// No query preserves insertion order.
pub trait ResourceStore: Send + Sync {
    /// Persist a record and return its assigned id
    fn insert(&self, resource: NewResource) -> Result<ResourceId, StoreError>;

    fn find_by_type(&self, kind: ResourceKind) -> Vec<Resource>;

    fn find_by_type_and_details(&self, kind: ResourceKind, details: &str) -> Vec<Resource>;

    fn find_by_bucket_name(&self, bucket_name: &str) -> Vec<Resource>;

    /// Records in `bucket_name` whose details contain `pattern` (see [`BucketPattern`])
    fn find_by_bucket_and_pattern(&self, bucket_name: &str, pattern: &str) -> Vec<Resource>;

    /// Records produced by one job
    fn find_by_job(&self, job_id: JobId) -> Vec<Resource>;
}

/// Job id to current status, last writer wins
pub trait JobStatusStore: Send + Sync {
    /// Unconditionally overwrite the status of `job_id`
    fn upsert(&self, job_id: JobId, status: JobStatus) -> Result<(), StoreError>;

    /// `None` until the first write for this job
    fn get(&self, job_id: JobId) -> Option<JobStatus>;
}
