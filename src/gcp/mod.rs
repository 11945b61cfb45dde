//! GCP API interaction module
//!
//! This module provides the plumbing for talking to Google Cloud Platform
//! REST APIs: authentication, the HTTP wrapper, and the client that builds
//! Compute Engine and Cloud Storage URLs.
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials or an explicit access token
//! - [`client`] - Main GCP client with configurable endpoints
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use cloudscan::gcp::{auth::GcpCredentials, client::GcpClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = GcpCredentials::resolve(None).await?;
//!     let client = GcpClient::new(credentials, "my-project")?;
//!     let instances = client.get(&client.compute_aggregated_url("instances")?).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
