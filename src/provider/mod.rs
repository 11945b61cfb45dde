//! Cloud provider boundary
//!
//! Discovery tasks depend only on these traits. Each method is a single
//! provider call returning one snapshot; no pagination is followed.
//!
//! - [`gcp`] - Compute Engine and Cloud Storage over REST

pub mod gcp;

use anyhow::Result;
use async_trait::async_trait;

/// One compute instance as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub instance_id: String,
    pub name: Option<String>,
}

/// Instances grouped the way the provider returns them (zone, reservation, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceGroup {
    pub scope: String,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
}

/// Object listing entry; `key` keeps its full path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
}

/// Compute-provider client
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// List every instance visible to the account, grouped by the provider
    async fn describe_instances(&self) -> Result<Vec<InstanceGroup>>;
}

/// Storage-provider client
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// First page of objects in `bucket`
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>>;
}
