//! Job Coordinator
//!
//! Accepts discovery requests, assigns job ids, and hands tasks to the worker
//! pool without waiting for them. Status writes happen only inside the tasks;
//! the coordinator never writes a status itself.
//!
//! A request for several kinds runs one task per kind under the same job id.
//! Those tasks are independent and race on the job's single status entry, so
//! the stored value is whichever write landed last.

use super::pool::WorkerPool;
use super::task::{DiscoveryTask, TaskContext};
use crate::model::{DiscoveryKind, JobId, JobStatus};
use std::collections::BTreeSet;

pub struct JobCoordinator {
    ctx: TaskContext,
    pool: WorkerPool,
}

impl JobCoordinator {
    pub fn new(ctx: TaskContext, pool: WorkerPool) -> Self {
        Self { ctx, pool }
    }

    /// Start one task per distinct kind and return the shared job id.
    ///
    /// With no kinds the id is still returned; its status stays unknown.
    pub fn submit(&self, kinds: impl IntoIterator<Item = DiscoveryKind>) -> JobId {
        let kinds: BTreeSet<DiscoveryKind> = kinds.into_iter().collect();
        let job_id = JobId::new();

        tracing::info!(%job_id, ?kinds, "Submitting discovery job");

        for kind in kinds {
            self.launch(job_id, DiscoveryTask::from(kind));
        }

        job_id
    }

    /// Start object discovery for one bucket
    pub fn submit_bucket_objects(&self, bucket_name: &str) -> JobId {
        let job_id = JobId::new();

        tracing::info!(%job_id, bucket = bucket_name, "Submitting bucket object discovery");

        self.launch(
            job_id,
            DiscoveryTask::BucketObjects {
                bucket_name: bucket_name.to_string(),
            },
        );

        job_id
    }

    /// `None` until a task has written the first status for this job
    pub fn status(&self, job_id: JobId) -> Option<JobStatus> {
        self.ctx.statuses.get(job_id)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn launch(&self, job_id: JobId, task: DiscoveryTask) {
        let ctx = self.ctx.clone();
        let label = format!("{}/{}", task.name(), job_id);

        self.pool.spawn(label, async move {
            let name = task.name();
            let outcome = task.run(job_id, &ctx).await;
            tracing::debug!(%job_id, task = name, ?outcome, "Task finished");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;
    use crate::provider::{
        Bucket, ComputeProvider, Instance, InstanceGroup, ObjectSummary, StorageProvider,
    };
    use crate::store::{JobStatusStore, MemoryJobStatusStore, MemoryResourceStore, ResourceStore};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    /// Provider whose calls block until the test releases a permit
    struct GatedProvider {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl ComputeProvider for GatedProvider {
        async fn describe_instances(&self) -> Result<Vec<InstanceGroup>> {
            self.gate.acquire().await?.forget();
            Ok(vec![InstanceGroup {
                scope: "zones/a".to_string(),
                instances: vec![Instance {
                    instance_id: "i-1".to_string(),
                    name: None,
                }],
            }])
        }
    }

    #[async_trait]
    impl StorageProvider for GatedProvider {
        async fn list_buckets(&self) -> Result<Vec<Bucket>> {
            self.gate.acquire().await?.forget();
            Ok(vec![Bucket {
                name: "logs-bucket".to_string(),
            }])
        }

        async fn list_objects(&self, _bucket: &str) -> Result<Vec<ObjectSummary>> {
            self.gate.acquire().await?.forget();
            anyhow::bail!("API request failed: 404 Not Found")
        }
    }

    fn coordinator(
        max_workers: usize,
    ) -> (JobCoordinator, Arc<Semaphore>, Arc<MemoryResourceStore>) {
        let gate = Arc::new(Semaphore::new(0));
        let provider = Arc::new(GatedProvider {
            gate: Arc::clone(&gate),
        });
        let resources = Arc::new(MemoryResourceStore::new());
        let statuses: Arc<dyn JobStatusStore> = Arc::new(MemoryJobStatusStore::new());
        let ctx = TaskContext::new(provider.clone(), provider, resources.clone(), statuses);
        (
            JobCoordinator::new(ctx, WorkerPool::new(max_workers)),
            gate,
            resources,
        )
    }

    async fn wait_for_status(coordinator: &JobCoordinator, job_id: JobId, expected: JobStatus) {
        while coordinator.status(job_id) != Some(expected) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_submit_returns_before_completion() {
        let (coordinator, gate, resources) = coordinator(4);

        let job_id = coordinator.submit([DiscoveryKind::ComputeInstances]);
        wait_for_status(&coordinator, job_id, JobStatus::InProgress).await;
        assert!(resources.is_empty());

        gate.add_permits(1);
        coordinator.pool().wait_idle().await;

        assert_eq!(coordinator.status(job_id), Some(JobStatus::Success));
        let records = resources.find_by_job(job_id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ResourceKind::ComputeInstance);
    }

    #[tokio::test]
    async fn test_status_unknown_until_task_starts() {
        let (coordinator, gate, _) = coordinator(1);

        let first = coordinator.submit([DiscoveryKind::ComputeInstances]);
        wait_for_status(&coordinator, first, JobStatus::InProgress).await;

        // The only worker is busy, so the second job has not written anything
        let second = coordinator.submit([DiscoveryKind::Buckets]);
        assert_eq!(coordinator.status(second), None);

        gate.add_permits(2);
        coordinator.pool().wait_idle().await;
        assert_eq!(coordinator.status(first), Some(JobStatus::Success));
        assert_eq!(coordinator.status(second), Some(JobStatus::Success));
    }

    #[tokio::test]
    async fn test_dual_kind_job_runs_two_tasks() {
        let (coordinator, gate, resources) = coordinator(4);

        let job_id = coordinator.submit([
            DiscoveryKind::ComputeInstances,
            DiscoveryKind::Buckets,
            DiscoveryKind::Buckets,
        ]);
        assert_eq!(coordinator.pool().in_flight(), 2);

        gate.add_permits(2);
        coordinator.pool().wait_idle().await;

        assert_eq!(resources.find_by_job(job_id).len(), 2);
        assert!(coordinator.status(job_id).is_some_and(|s| s.is_terminal()));
    }

    #[tokio::test]
    async fn test_provider_fault_marks_job_failed() {
        let (coordinator, gate, resources) = coordinator(1);

        let job_id = coordinator.submit_bucket_objects("missing");
        gate.add_permits(1);
        coordinator.pool().wait_idle().await;

        assert_eq!(coordinator.status(job_id), Some(JobStatus::Failed));
        assert!(resources.find_by_job(job_id).is_empty());
    }

    #[tokio::test]
    async fn test_empty_bucket_name_fails_without_provider_call() {
        let (coordinator, _gate, _) = coordinator(1);

        // No permits are ever added: reaching the provider would hang
        let job_id = coordinator.submit_bucket_objects("");
        coordinator.pool().wait_idle().await;

        assert_eq!(coordinator.status(job_id), Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_no_kinds_yields_unknown_job() {
        let (coordinator, _gate, _) = coordinator(1);

        let job_id = coordinator.submit(Vec::new());
        coordinator.pool().wait_idle().await;
        assert_eq!(coordinator.status(job_id), None);
    }
}
