//! Boundary operations
//!
//! Transport-independent request/response shapes for the discovery service.
//! Everything is exchanged as plain strings and numbers so any front end
//! (the CLI, an HTTP router) can sit on top.

use crate::discovery::JobCoordinator;
use crate::model::{DiscoveryKind, JobId};
use crate::query::QueryFacade;
use thiserror::Error;

/// Returned by the status operation for unknown or malformed job ids
pub const JOB_NOT_FOUND: &str = "Job not found";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unsupported service: {0}")]
    UnsupportedService(String),
}

/// Submission side of the boundary
pub struct DiscoveryApi {
    coordinator: JobCoordinator,
}

impl DiscoveryApi {
    pub fn new(coordinator: JobCoordinator) -> Self {
        Self { coordinator }
    }

    /// Start discovery for the named services (`"EC2"`, `"S3"`, case-sensitive).
    /// Unknown names are ignored.
    pub fn submit_discovery<S: AsRef<str>>(&self, services: &[S]) -> String {
        let kinds = services.iter().filter_map(|s| {
            let kind = DiscoveryKind::from_service_name(s.as_ref());
            if kind.is_none() {
                tracing::debug!("Ignoring unknown service {:?}", s.as_ref());
            }
            kind
        });
        self.coordinator.submit(kinds).to_string()
    }

    pub fn submit_bucket_objects(&self, bucket_name: &str) -> String {
        self.coordinator.submit_bucket_objects(bucket_name).to_string()
    }

    pub fn coordinator(&self) -> &JobCoordinator {
        &self.coordinator
    }
}

/// Read side of the boundary
#[derive(Clone)]
pub struct InventoryApi {
    queries: QueryFacade,
}

impl InventoryApi {
    pub fn new(queries: QueryFacade) -> Self {
        Self { queries }
    }

    /// Status string, or [`JOB_NOT_FOUND`]
    pub fn job_status(&self, job_id: &str) -> String {
        job_id
            .parse::<JobId>()
            .ok()
            .and_then(|id| self.queries.job_status(id))
            .map(|status| status.to_string())
            .unwrap_or_else(|| JOB_NOT_FOUND.to_string())
    }

    /// Stored details for `"EC2"` or `"S3"`, matched case-insensitively
    pub fn discovery_result(&self, service: &str) -> Result<Vec<String>, ApiError> {
        if service.eq_ignore_ascii_case("EC2") || service.eq_ignore_ascii_case("GCE") {
            Ok(self.queries.compute_instance_details())
        } else if service.eq_ignore_ascii_case("S3") || service.eq_ignore_ascii_case("GCS") {
            Ok(self.queries.bucket_details())
        } else {
            Err(ApiError::UnsupportedService(service.to_string()))
        }
    }

    /// File names of every object discovered in `bucket_name`
    pub fn bucket_objects(&self, bucket_name: &str) -> Vec<String> {
        self.queries.bucket_object_details(bucket_name)
    }

    pub fn bucket_object_count(&self, bucket_name: &str) -> usize {
        self.queries.bucket_object_count(bucket_name)
    }

    pub fn bucket_objects_like(&self, bucket_name: &str, pattern: &str) -> Vec<String> {
        self.queries.bucket_objects_matching(bucket_name, pattern)
    }

    pub fn queries(&self) -> &QueryFacade {
        &self.queries
    }
}
