//! Configuration Management
//!
//! Handles persistent configuration storage for cloudscan.

use crate::discovery::DEFAULT_MAX_WORKERS;
use crate::gcp::client::{Endpoints, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_STORAGE_ENDPOINT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Project whose buckets are listed
    #[serde(default)]
    pub project_id: Option<String>,
    /// Directory holding the inventory journals
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Upper bound on concurrently running discovery tasks
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// How often the CLI polls job status
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub compute_endpoint: Option<String>,
    #[serde(default)]
    pub storage_endpoint: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudscan").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parse configuration, falling back to defaults on malformed input
    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config: {}", e);
            Self::default()
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(|s| s.to_string())
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective store directory (CLI > config > data dir)
    pub fn effective_store_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.store_dir.clone())
            .or_else(|| dirs::data_dir().map(|p| p.join("cloudscan")))
            .unwrap_or_else(|| PathBuf::from(".cloudscan"))
    }

    /// Get effective worker bound (CLI > config > default), at least 1
    pub fn effective_max_workers(&self, cli: Option<usize>) -> usize {
        cli.or(self.max_workers)
            .unwrap_or(DEFAULT_MAX_WORKERS)
            .max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .max(10),
        )
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(
            self.compute_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_COMPUTE_ENDPOINT),
            self.storage_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_STORAGE_ENDPOINT),
        )
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }
}
