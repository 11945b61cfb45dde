//! End-to-end discovery scenarios through the boundary API
//!
//! Providers are in-process fakes, so these tests exercise the coordinator,
//! worker pool, tasks, stores, and queries together without any network.

use anyhow::Result;
use async_trait::async_trait;
use cloudscan::api::{ApiError, DiscoveryApi, InventoryApi, JOB_NOT_FOUND};
use cloudscan::discovery::{JobCoordinator, TaskContext, WorkerPool};
use cloudscan::model::{JobId, NewResource, Resource, ResourceId, ResourceKind};
use cloudscan::provider::{
    Bucket, ComputeProvider, Instance, InstanceGroup, ObjectSummary, StorageProvider,
};
use cloudscan::query::QueryFacade;
use cloudscan::store::{
    JobStatusStore, JournalJobStatusStore, JournalResourceStore, MemoryJobStatusStore,
    MemoryResourceStore, ResourceStore, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Canned inventory for one fake project
#[derive(Default)]
struct FakeCloud {
    zones: Vec<(&'static str, Vec<&'static str>)>,
    buckets: Vec<&'static str>,
    objects: HashMap<&'static str, Vec<&'static str>>,
    fail_compute: bool,
}

#[async_trait]
impl ComputeProvider for FakeCloud {
    async fn describe_instances(&self) -> Result<Vec<InstanceGroup>> {
        if self.fail_compute {
            anyhow::bail!("API request failed: 503 Service Unavailable");
        }
        Ok(self
            .zones
            .iter()
            .map(|(zone, ids)| InstanceGroup {
                scope: zone.to_string(),
                instances: ids
                    .iter()
                    .map(|id| Instance {
                        instance_id: id.to_string(),
                        name: None,
                    })
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl StorageProvider for FakeCloud {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        Ok(self
            .buckets
            .iter()
            .map(|name| Bucket {
                name: name.to_string(),
            })
            .collect())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        match self.objects.get(bucket) {
            Some(keys) => Ok(keys
                .iter()
                .map(|key| ObjectSummary {
                    key: key.to_string(),
                })
                .collect()),
            None => anyhow::bail!("API request failed: 404 Not Found"),
        }
    }
}

/// Resource store that refuses every insert after the first `allowed`
struct FlakyResourceStore {
    inner: MemoryResourceStore,
    allowed: usize,
    attempts: AtomicUsize,
}

impl FlakyResourceStore {
    fn new(allowed: usize) -> Self {
        Self {
            inner: MemoryResourceStore::new(),
            allowed,
            attempts: AtomicUsize::new(0),
        }
    }
}

impl ResourceStore for FlakyResourceStore {
    fn insert(&self, resource: NewResource) -> Result<ResourceId, StoreError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.insert(resource)
    }

    fn find_by_type(&self, kind: ResourceKind) -> Vec<Resource> {
        self.inner.find_by_type(kind)
    }

    fn find_by_type_and_details(&self, kind: ResourceKind, details: &str) -> Vec<Resource> {
        self.inner.find_by_type_and_details(kind, details)
    }

    fn find_by_bucket_name(&self, bucket_name: &str) -> Vec<Resource> {
        self.inner.find_by_bucket_name(bucket_name)
    }

    fn find_by_bucket_and_pattern(&self, bucket_name: &str, pattern: &str) -> Vec<Resource> {
        self.inner.find_by_bucket_and_pattern(bucket_name, pattern)
    }

    fn find_by_job(&self, job_id: JobId) -> Vec<Resource> {
        self.inner.find_by_job(job_id)
    }
}

fn service(
    cloud: FakeCloud,
    resources: Arc<dyn ResourceStore>,
    statuses: Arc<dyn JobStatusStore>,
) -> (DiscoveryApi, InventoryApi) {
    let cloud = Arc::new(cloud);
    let ctx = TaskContext::new(cloud.clone(), cloud, resources.clone(), statuses.clone());
    let discovery = DiscoveryApi::new(JobCoordinator::new(ctx, WorkerPool::new(4)));
    let inventory = InventoryApi::new(QueryFacade::new(resources, statuses));
    (discovery, inventory)
}

fn memory_service(cloud: FakeCloud) -> (DiscoveryApi, InventoryApi) {
    service(
        cloud,
        Arc::new(MemoryResourceStore::new()),
        Arc::new(MemoryJobStatusStore::new()),
    )
}

async fn drain(discovery: &DiscoveryApi) {
    discovery.coordinator().pool().wait_idle().await;
}

fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

#[tokio::test]
async fn test_compute_and_buckets_in_one_job() {
    let (discovery, inventory) = memory_service(FakeCloud {
        zones: vec![("zones/us-central1-a", vec!["i-1", "i-2"])],
        buckets: vec!["logs-bucket"],
        ..Default::default()
    });

    let job_id = discovery.submit_discovery(&["EC2", "S3"]);
    drain(&discovery).await;

    assert_eq!(inventory.job_status(&job_id), "Success");
    assert_eq!(
        sorted(inventory.discovery_result("EC2").unwrap()),
        vec!["i-1", "i-2"]
    );
    assert_eq!(
        inventory.discovery_result("S3").unwrap(),
        vec!["logs-bucket"]
    );

    let job: JobId = job_id.parse().unwrap();
    assert_eq!(inventory.queries().job_resources(job).len(), 3);
}

#[tokio::test]
async fn test_bucket_objects_count_and_pattern() {
    let (discovery, inventory) = memory_service(FakeCloud {
        objects: HashMap::from([("data", vec!["a/x.csv", "b/y.csv"])]),
        ..Default::default()
    });

    let job_id = discovery.submit_bucket_objects("data");
    drain(&discovery).await;

    assert_eq!(inventory.job_status(&job_id), "Success");
    assert_eq!(inventory.bucket_object_count("data"), 2);
    assert_eq!(
        sorted(inventory.bucket_objects("data")),
        vec!["x.csv", "y.csv"]
    );
    assert_eq!(
        sorted(inventory.bucket_objects_like("data", "csv")),
        vec!["x.csv", "y.csv"]
    );
    assert_eq!(inventory.bucket_objects_like("data", "x."), vec!["x.csv"]);
    assert!(inventory.bucket_objects_like("data", "CSV").is_empty());
    assert_eq!(inventory.bucket_object_count("other"), 0);
}

#[tokio::test]
async fn test_unsupported_service_result() {
    let (_, inventory) = memory_service(FakeCloud::default());

    assert_eq!(
        inventory.discovery_result("EFS"),
        Err(ApiError::UnsupportedService("EFS".to_string()))
    );
}

#[tokio::test]
async fn test_unknown_job_and_no_recognized_services() {
    let (discovery, inventory) = memory_service(FakeCloud::default());

    assert_eq!(
        inventory.job_status(&JobId::new().to_string()),
        JOB_NOT_FOUND
    );

    // A job id is still issued, but nothing ever writes its status
    let job_id = discovery.submit_discovery(&["ec2", "EFS"]);
    drain(&discovery).await;
    assert!(job_id.parse::<JobId>().is_ok());
    assert_eq!(inventory.job_status(&job_id), JOB_NOT_FOUND);
}

#[tokio::test]
async fn test_store_fault_keeps_earlier_records() {
    let flaky = Arc::new(FlakyResourceStore::new(1));
    let (discovery, inventory) = service(
        FakeCloud {
            zones: vec![("zones/a", vec!["i-1", "i-2", "i-3"])],
            ..Default::default()
        },
        flaky.clone(),
        Arc::new(MemoryJobStatusStore::new()),
    );

    let job_id = discovery.submit_discovery(&["EC2"]);
    drain(&discovery).await;

    assert_eq!(inventory.job_status(&job_id), "Failed");
    assert_eq!(inventory.discovery_result("EC2").unwrap(), vec!["i-1"]);
    // The task stops at the first failed insert
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_provider_fault_fails_job_without_records() {
    let (discovery, inventory) = memory_service(FakeCloud {
        fail_compute: true,
        ..Default::default()
    });

    let job_id = discovery.submit_discovery(&["EC2"]);
    drain(&discovery).await;

    assert_eq!(inventory.job_status(&job_id), "Failed");
    assert!(inventory.discovery_result("EC2").unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_bucket_fails() {
    let (discovery, inventory) = memory_service(FakeCloud::default());

    let job_id = discovery.submit_bucket_objects("nope");
    drain(&discovery).await;

    assert_eq!(inventory.job_status(&job_id), "Failed");
    assert_eq!(inventory.bucket_object_count("nope"), 0);
}

#[tokio::test]
async fn test_every_instance_is_recorded_under_the_job() {
    let ids: Vec<&'static str> = vec!["i-1", "i-2", "i-3", "i-4", "i-5"];
    let (discovery, inventory) = memory_service(FakeCloud {
        zones: vec![("zones/a", ids[..2].to_vec()), ("zones/b", ids[2..].to_vec())],
        ..Default::default()
    });

    let job_id = discovery.submit_discovery(&["EC2"]);
    drain(&discovery).await;

    let job: JobId = job_id.parse().unwrap();
    let records = inventory.queries().job_resources(job);
    assert_eq!(records.len(), ids.len());
    assert!(records
        .iter()
        .all(|r| r.job_id == job && r.kind == ResourceKind::ComputeInstance));
}

#[tokio::test]
async fn test_repeated_discovery_keeps_duplicates() {
    let (discovery, inventory) = memory_service(FakeCloud {
        buckets: vec!["logs-bucket"],
        ..Default::default()
    });

    let first = discovery.submit_discovery(&["S3"]);
    drain(&discovery).await;
    let second = discovery.submit_discovery(&["S3"]);
    drain(&discovery).await;

    assert_ne!(first, second);
    assert_eq!(
        inventory.discovery_result("S3").unwrap(),
        vec!["logs-bucket", "logs-bucket"]
    );
}

#[tokio::test]
async fn test_terminal_status_is_stable() {
    let (discovery, inventory) = memory_service(FakeCloud {
        buckets: vec!["logs-bucket"],
        ..Default::default()
    });

    let job_id = discovery.submit_discovery(&["S3"]);
    drain(&discovery).await;
    assert_eq!(inventory.job_status(&job_id), "Success");

    // Unrelated work does not touch this job's status
    discovery.submit_discovery(&["S3"]);
    discovery.submit_bucket_objects("missing");
    drain(&discovery).await;
    assert_eq!(inventory.job_status(&job_id), "Success");
}

#[tokio::test]
async fn test_journal_inventory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let job_id = {
        let (discovery, _) = service(
            FakeCloud {
                objects: HashMap::from([("data", vec!["a/x.csv", "b/y.csv"])]),
                ..Default::default()
            },
            Arc::new(JournalResourceStore::open_in(dir.path()).unwrap()),
            Arc::new(JournalJobStatusStore::open_in(dir.path()).unwrap()),
        );
        let job_id = discovery.submit_bucket_objects("data");
        drain(&discovery).await;
        job_id
    };

    let reopened = InventoryApi::new(QueryFacade::new(
        Arc::new(JournalResourceStore::open_in(dir.path()).unwrap()),
        Arc::new(JournalJobStatusStore::open_in(dir.path()).unwrap()),
    ));

    assert_eq!(reopened.job_status(&job_id), "Success");
    assert_eq!(reopened.bucket_object_count("data"), 2);
    assert_eq!(reopened.bucket_objects_like("data", "y"), vec!["y.csv"]);
}
