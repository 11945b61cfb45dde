//! cloudscan
//!
//! Asynchronous cloud inventory discovery. Callers submit discovery jobs for
//! compute instances, buckets, or the objects of one bucket; tasks run on a
//! bounded worker pool, report progress through a job status store, and
//! persist what they find into a resource store that can be queried by kind,
//! bucket, or substring.
//!
//! # Module Structure
//!
//! - [`model`] - jobs, statuses, resource records
//! - [`store`] - resource and job status stores, bucket pattern matching
//! - [`provider`] - compute and storage provider traits, GCP implementation
//! - [`gcp`] - GCP credentials, HTTP, and client plumbing
//! - [`discovery`] - coordinator, tasks, worker pool
//! - [`query`] - read-only projections over the stores
//! - [`api`] - boundary operations in plain strings
//! - [`watch`] - status polling for interactive callers
//! - [`config`] - persistent configuration

pub mod api;
pub mod config;
pub mod discovery;
pub mod gcp;
pub mod model;
pub mod provider;
pub mod query;
pub mod store;
pub mod watch;

/// Version injected at compile time via CLOUDSCAN_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDSCAN_VERSION") {
    Some(v) => v,
    None => "dev",
};
