//! HTTP utilities for GCP REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A GCP API answered with a non-success status
#[derive(Debug, Error)]
#[error("API request failed: {status}{}", message_suffix(.message))]
pub struct HttpStatusError {
    pub status: StatusCode,
    /// `error.message` from the response body, if the API sent one
    pub message: Option<String>,
}

impl HttpStatusError {
    fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        });
        Self { status, message }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({})", sanitize_for_log(m)))
        .unwrap_or_default()
}

/// Truncate on a char boundary and strip control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudscan/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// GET `url` with a bearer token and decode the JSON body.
    ///
    /// Non-success statuses become [`HttpStatusError`]; an empty body decodes
    /// to `Value::Null`.
    pub async fn get(&self, url: &Url, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url.host_str().unwrap_or("GCP")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("GET {} returned {}: {}", url.path(), status, sanitize_for_log(&body));
            return Err(HttpStatusError::from_response(status, &body).into());
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// One-line, user-facing description of a failure.
///
/// API status failures map to a hint for the status class; raw response
/// text never reaches the terminal.
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    let status = error
        .chain()
        .find_map(|e| e.downcast_ref::<HttpStatusError>())
        .map(|e| e.status);

    let Some(status) = status else {
        return sanitize_for_log(&format!("{:#}", error));
    };

    let hint = match status {
        StatusCode::UNAUTHORIZED => {
            "Authentication failed. Run 'gcloud auth application-default login' or pass --access-token."
        }
        StatusCode::FORBIDDEN => {
            "Permission denied. Listing needs compute.instances.list, storage.buckets.list and storage.objects.list."
        }
        StatusCode::NOT_FOUND => "Project or bucket not found.",
        StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded. Please try again later.",
        StatusCode::BAD_REQUEST => "Invalid request. Check the project id and bucket name.",
        s if s.is_server_error() => "GCP service temporarily unavailable. Please try again.",
        _ => "Request failed. Check your network connection and try again.",
    };
    hint.to_string()
}
