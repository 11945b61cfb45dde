//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1/";
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1/";

/// Base URLs of the REST APIs the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compute: Url,
    pub storage: Url,
}

impl Endpoints {
    /// Parse both base URLs. A missing trailing slash is added so relative
    /// paths join below the base instead of replacing its last segment.
    pub fn new(compute: &str, storage: &str) -> Result<Self> {
        Ok(Self {
            compute: parse_base(compute).context("Invalid compute endpoint")?,
            storage: parse_base(storage).context("Invalid storage endpoint")?,
        })
    }

    /// The public Google APIs
    pub fn public() -> Result<Self> {
        Self::new(DEFAULT_COMPUTE_ENDPOINT, DEFAULT_STORAGE_ENDPOINT)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client against the public endpoints
    pub fn new(credentials: GcpCredentials, project_id: &str) -> Result<Self> {
        Self::with_endpoints(credentials, project_id, Endpoints::public()?)
    }

    pub fn with_endpoints(
        credentials: GcpCredentials,
        project_id: &str,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            endpoints,
        })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &Url) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> Result<Url> {
        self.endpoints
            .compute
            .join(&format!(
                "projects/{}/{}",
                urlencoding::encode(&self.project_id),
                path
            ))
            .context("Failed to build compute URL")
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, resource: &str) -> Result<Url> {
        self.compute_url(&format!("aggregated/{}", resource))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> Result<Url> {
        self.endpoints
            .storage
            .join(path)
            .context("Failed to build storage URL")
    }

    /// Build the bucket listing URL for the current project
    pub fn storage_buckets_url(&self) -> Result<Url> {
        let mut url = self.storage_url("b")?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url)
    }

    /// Build Cloud Storage objects URL
    pub fn storage_objects_url(&self, bucket: &str) -> Result<Url> {
        self.storage_url(&format!("b/{}/o", urlencoding::encode(bucket)))
    }
}
