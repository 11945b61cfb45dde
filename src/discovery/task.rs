//! Discovery tasks
//!
//! A task makes one provider call, turns each returned item into a resource
//! record, and persists the records one by one. It owns the status writes for
//! its job: `InProgress` first, then exactly one terminal status.

use crate::model::{object_file_name, DiscoveryKind, JobId, JobStatus, NewResource};
use crate::provider::{ComputeProvider, StorageProvider};
use crate::store::{JobStatusStore, ResourceStore};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Collaborators shared by every task
#[derive(Clone)]
pub struct TaskContext {
    pub compute: Arc<dyn ComputeProvider>,
    pub storage: Arc<dyn StorageProvider>,
    pub resources: Arc<dyn ResourceStore>,
    pub statuses: Arc<dyn JobStatusStore>,
}

impl TaskContext {
    pub fn new(
        compute: Arc<dyn ComputeProvider>,
        storage: Arc<dyn StorageProvider>,
        resources: Arc<dyn ResourceStore>,
        statuses: Arc<dyn JobStatusStore>,
    ) -> Self {
        Self {
            compute,
            storage,
            resources,
            statuses,
        }
    }
}

/// One unit of discovery work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryTask {
    ComputeInstances,
    Buckets,
    BucketObjects { bucket_name: String },
}

impl From<DiscoveryKind> for DiscoveryTask {
    fn from(kind: DiscoveryKind) -> Self {
        match kind {
            DiscoveryKind::ComputeInstances => Self::ComputeInstances,
            DiscoveryKind::Buckets => Self::Buckets,
        }
    }
}

/// How a task ended. Failure causes are logged, not carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded { persisted: usize },
    Failed,
}

impl DiscoveryTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ComputeInstances => "compute-instances",
            Self::Buckets => "buckets",
            Self::BucketObjects { .. } => "bucket-objects",
        }
    }

    /// Run to completion, absorbing every fault into a `Failed` status
    pub async fn run(self, job_id: JobId, ctx: &TaskContext) -> TaskOutcome {
        match self.execute(job_id, ctx).await {
            Ok(persisted) => {
                tracing::info!(%job_id, task = self.name(), persisted, "Discovery succeeded");
                TaskOutcome::Succeeded { persisted }
            }
            Err(e) => {
                tracing::warn!(%job_id, task = self.name(), "Discovery failed: {:#}", e);
                if let Err(e) = ctx.statuses.upsert(job_id, JobStatus::Failed) {
                    tracing::error!(%job_id, "Failed to record job failure: {}", e);
                }
                TaskOutcome::Failed
            }
        }
    }

    async fn execute(&self, job_id: JobId, ctx: &TaskContext) -> Result<usize> {
        ctx.statuses
            .upsert(job_id, JobStatus::InProgress)
            .context("Failed to record job start")?;

        let records = self.fetch(job_id, ctx).await?;

        // Records written before a fault stay in the store
        let mut persisted = 0;
        for record in records {
            tracing::debug!(
                %job_id,
                kind = %record.kind(),
                details = record.details(),
                "Persisting resource"
            );
            ctx.resources
                .insert(record)
                .context("Failed to persist resource")?;
            persisted += 1;
        }

        ctx.statuses
            .upsert(job_id, JobStatus::Success)
            .context("Failed to record job success")?;

        Ok(persisted)
    }

    /// The single provider call, mapped to insert payloads
    async fn fetch(&self, job_id: JobId, ctx: &TaskContext) -> Result<Vec<NewResource>> {
        match self {
            Self::ComputeInstances => {
                let groups = ctx
                    .compute
                    .describe_instances()
                    .await
                    .context("Failed to describe instances")?;

                Ok(groups
                    .into_iter()
                    .flat_map(|group| {
                        tracing::debug!(
                            %job_id,
                            scope = %group.scope,
                            count = group.instances.len(),
                            "Instances in scope"
                        );
                        group.instances
                    })
                    .map(|instance| {
                        tracing::trace!(
                            %job_id,
                            instance_id = %instance.instance_id,
                            name = instance.name.as_deref().unwrap_or("-"),
                            "Found instance"
                        );
                        NewResource::compute_instance(job_id, instance.instance_id)
                    })
                    .collect())
            }
            Self::Buckets => {
                let buckets = ctx
                    .storage
                    .list_buckets()
                    .await
                    .context("Failed to list buckets")?;

                Ok(buckets
                    .into_iter()
                    .map(|bucket| NewResource::bucket(job_id, bucket.name))
                    .collect())
            }
            Self::BucketObjects { bucket_name } => {
                if bucket_name.is_empty() {
                    anyhow::bail!("Bucket name must not be empty");
                }

                let objects = ctx
                    .storage
                    .list_objects(bucket_name)
                    .await
                    .with_context(|| format!("Failed to list objects in {}", bucket_name))?;

                objects
                    .iter()
                    .map(|object| {
                        NewResource::bucket_object(
                            job_id,
                            bucket_name.as_str(),
                            object_file_name(&object.key),
                        )
                        .context("Bucket name must not be empty")
                    })
                    .collect()
            }
        }
    }
}
