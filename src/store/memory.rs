//! In-memory stores

use super::{BucketPattern, JobStatusStore, ResourceStore, StoreError};
use crate::model::{JobId, JobStatus, NewResource, Resource, ResourceId, ResourceKind};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resource records keyed by id
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    records: RwLock<HashMap<ResourceId, Resource>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put back a record that already has an id (journal replay)
    pub(crate) fn restore(&self, resource: Resource) {
        self.records.write().insert(resource.id, resource);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn filter(&self, predicate: impl Fn(&Resource) -> bool) -> Vec<Resource> {
        self.records
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }
}

impl ResourceStore for MemoryResourceStore {
    fn insert(&self, resource: NewResource) -> Result<ResourceId, StoreError> {
        let id = ResourceId::new();
        self.restore(resource.into_resource(id));
        Ok(id)
    }

    fn find_by_type(&self, kind: ResourceKind) -> Vec<Resource> {
        self.filter(|r| r.kind == kind)
    }

    fn find_by_type_and_details(&self, kind: ResourceKind, details: &str) -> Vec<Resource> {
        self.filter(|r| r.kind == kind && r.details == details)
    }

    fn find_by_bucket_name(&self, bucket_name: &str) -> Vec<Resource> {
        self.filter(|r| r.bucket_name.as_deref() == Some(bucket_name))
    }

    fn find_by_bucket_and_pattern(&self, bucket_name: &str, pattern: &str) -> Vec<Resource> {
        let pattern = BucketPattern::new(bucket_name, pattern);
        self.filter(|r| pattern.matches(r))
    }

    fn find_by_job(&self, job_id: JobId) -> Vec<Resource> {
        self.filter(|r| r.job_id == job_id)
    }
}

/// Job statuses keyed by job id
#[derive(Debug, Default)]
pub struct MemoryJobStatusStore {
    statuses: RwLock<HashMap<JobId, JobStatus>>,
}

impl MemoryJobStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStatusStore for MemoryJobStatusStore {
    fn upsert(&self, job_id: JobId, status: JobStatus) -> Result<(), StoreError> {
        self.statuses.write().insert(job_id, status);
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Option<JobStatus> {
        self.statuses.read().get(&job_id).copied()
    }
}
