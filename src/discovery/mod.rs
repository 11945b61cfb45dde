//! Asynchronous discovery jobs
//!
//! - [`coordinator`] - job submission and status lookup
//! - [`task`] - the compute-instance, bucket, and bucket-object task variants
//! - [`pool`] - bounded fire-and-forget execution

pub mod coordinator;
pub mod pool;
pub mod task;

pub use coordinator::JobCoordinator;
pub use pool::{WorkerPool, DEFAULT_MAX_WORKERS};
pub use task::{DiscoveryTask, TaskContext, TaskOutcome};
