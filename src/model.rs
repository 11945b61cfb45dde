//! Data Model
//!
//! Jobs, their statuses, and the resource records discovery produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier, generated at submission time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Store-assigned resource identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted status of a job.
///
/// There is no stored `Pending`: until a task writes `InProgress`, the
/// status store simply has no entry for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::InProgress => "↻",
            Self::Success => "✓",
            Self::Failed => "✗",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of discovered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ComputeInstance,
    Bucket,
    BucketObject,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeInstance => "compute-instance",
            Self::Bucket => "bucket",
            Self::BucketObject => "bucket-object",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compute-instance" => Ok(Self::ComputeInstance),
            "bucket" => Ok(Self::Bucket),
            "bucket-object" => Ok(Self::BucketObject),
            other => Err(format!("Unknown resource kind: {}", other)),
        }
    }
}

/// Discovery that can be requested for a whole account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscoveryKind {
    ComputeInstances,
    Buckets,
}

impl DiscoveryKind {
    /// Resolve a submitted service name. Matching is case-sensitive; unknown
    /// names resolve to `None` and are ignored by callers.
    pub fn from_service_name(name: &str) -> Option<Self> {
        match name {
            "EC2" | "GCE" => Some(Self::ComputeInstances),
            "S3" | "GCS" => Some(Self::Buckets),
            _ => None,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Self::ComputeInstances => ResourceKind::ComputeInstance,
            Self::Buckets => ResourceKind::Bucket,
        }
    }
}

/// A discovered resource as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub details: String,
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

/// Insert payload for a resource, before the store assigns an id.
///
/// Only the per-kind constructors can build one, so a bucket-object always
/// carries its bucket and the other kinds never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    kind: ResourceKind,
    details: String,
    job_id: JobId,
    bucket_name: Option<String>,
    discovered_at: DateTime<Utc>,
}

impl NewResource {
    pub fn compute_instance(job_id: JobId, instance_id: impl Into<String>) -> Self {
        Self::build(ResourceKind::ComputeInstance, job_id, instance_id.into(), None)
    }

    pub fn bucket(job_id: JobId, bucket_name: impl Into<String>) -> Self {
        Self::build(ResourceKind::Bucket, job_id, bucket_name.into(), None)
    }

    /// Returns `None` for an empty bucket name.
    pub fn bucket_object(
        job_id: JobId,
        bucket_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Option<Self> {
        let bucket_name = bucket_name.into();
        if bucket_name.is_empty() {
            return None;
        }
        Some(Self::build(
            ResourceKind::BucketObject,
            job_id,
            file_name.into(),
            Some(bucket_name),
        ))
    }

    fn build(
        kind: ResourceKind,
        job_id: JobId,
        details: String,
        bucket_name: Option<String>,
    ) -> Self {
        Self {
            kind,
            details,
            job_id,
            bucket_name,
            discovered_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Attach the store-assigned id
    pub fn into_resource(self, id: ResourceId) -> Resource {
        Resource {
            id,
            kind: self.kind,
            details: self.details,
            job_id: self.job_id,
            bucket_name: self.bucket_name,
            discovered_at: self.discovered_at,
        }
    }
}

/// Strip any path prefix from an object key, up to and including the last `/`
pub fn object_file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
