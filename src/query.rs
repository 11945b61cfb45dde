//! Query Facade
//!
//! Read-only projections over the stores, used by the boundary layer.

use crate::model::{JobId, JobStatus, Resource, ResourceKind};
use crate::store::{JobStatusStore, ResourceStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct QueryFacade {
    resources: Arc<dyn ResourceStore>,
    statuses: Arc<dyn JobStatusStore>,
}

impl QueryFacade {
    pub fn new(resources: Arc<dyn ResourceStore>, statuses: Arc<dyn JobStatusStore>) -> Self {
        Self {
            resources,
            statuses,
        }
    }

    pub fn job_status(&self, job_id: JobId) -> Option<JobStatus> {
        self.statuses.get(job_id)
    }

    pub fn compute_instance_details(&self) -> Vec<String> {
        details(self.resources.find_by_type(ResourceKind::ComputeInstance))
    }

    pub fn bucket_details(&self) -> Vec<String> {
        details(self.resources.find_by_type(ResourceKind::Bucket))
    }

    pub fn bucket_object_details(&self, bucket_name: &str) -> Vec<String> {
        details(self.resources.find_by_bucket_name(bucket_name))
    }

    pub fn bucket_object_count(&self, bucket_name: &str) -> usize {
        self.resources.find_by_bucket_name(bucket_name).len()
    }

    /// Details in `bucket_name` containing `pattern` as a literal substring
    pub fn bucket_objects_matching(&self, bucket_name: &str, pattern: &str) -> Vec<String> {
        details(
            self.resources
                .find_by_bucket_and_pattern(bucket_name, pattern),
        )
    }

    /// Every record a job produced
    pub fn job_resources(&self, job_id: JobId) -> Vec<Resource> {
        self.resources.find_by_job(job_id)
    }

    /// Exact lookup by kind and details
    pub fn lookup(&self, kind: ResourceKind, details: &str) -> Vec<Resource> {
        self.resources.find_by_type_and_details(kind, details)
    }
}

fn details(records: Vec<Resource>) -> Vec<String> {
    records.into_iter().map(|r| r.details).collect()
}
