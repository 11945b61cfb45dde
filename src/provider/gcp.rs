//! GCP provider
//!
//! Implements the provider traits on top of [`GcpClient`].

use super::{Bucket, ComputeProvider, Instance, InstanceGroup, ObjectSummary, StorageProvider};
use crate::gcp::client::GcpClient;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
impl ComputeProvider for GcpClient {
    async fn describe_instances(&self) -> Result<Vec<InstanceGroup>> {
        let url = self.compute_aggregated_url("instances")?;
        let response = self.get(&url).await?;
        Ok(parse_aggregated_instances(&response))
    }
}

#[async_trait]
impl StorageProvider for GcpClient {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let url = self.storage_buckets_url()?;
        let response = self.get(&url).await?;
        Ok(item_names(&response)
            .map(|name| Bucket { name })
            .collect())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let url = self.storage_objects_url(bucket)?;
        let response = self.get(&url).await?;

        if response.get("nextPageToken").is_some() {
            tracing::debug!("Object listing for {} truncated to first page", bucket);
        }

        Ok(item_names(&response)
            .map(|key| ObjectSummary { key })
            .collect())
    }
}

/// Aggregated responses have format:
/// `{ "items": { "zones/us-central1-a": { "instances": [...] }, "zones/x": { "warning": {...} } } }`
/// Scopes with only a warning yield an empty group.
pub fn parse_aggregated_instances(response: &Value) -> Vec<InstanceGroup> {
    let Some(items) = response.get("items").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|(scope, scope_data)| {
            let instances = scope_data
                .get("instances")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(parse_instance).collect())
                .unwrap_or_default();

            InstanceGroup {
                scope: scope.clone(),
                instances,
            }
        })
        .collect()
}

fn parse_instance(value: &Value) -> Option<Instance> {
    // Compute Engine ids are uint64 serialized as strings
    let instance_id = match value.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Some(Instance {
        instance_id,
        name: value
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    })
}

/// `name` of every entry under `items`
fn item_names(response: &Value) -> impl Iterator<Item = String> + '_ {
    response
        .get("items")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("name").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}
