//! Passthrough client for the cloud provider's cluster listing

use anyhow::Context;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default cloud API base
pub const DEFAULT_CLUSTERS_API_URL: &str = "https://api.digitalocean.com";

#[derive(Debug, Error)]
pub enum ClusterListError {
    /// The cloud API answered with a non-success status
    #[error("cluster API error ({status})")]
    Upstream { status: u16, body: Value },

    /// The request never produced a usable response
    #[error("cluster API request failed: {0}")]
    Request(String),
}

impl ClusterListError {
    /// JSON body to hand back to the dashboard client
    ///
    /// Upstream errors are forwarded as the cloud API sent them.
    pub fn body(&self) -> Value {
        match self {
            ClusterListError::Upstream { body, .. } => body.clone(),
            ClusterListError::Request(reason) => json!({ "error": reason }),
        }
    }
}

/// Lists Kubernetes clusters from the cloud provider API
///
/// The response body is returned untouched; the dashboard pages read it as-is.
#[derive(Clone)]
pub struct ClusterListClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ClusterListClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid clusters API URL")?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Fetch `GET /v2/kubernetes/clusters`
    pub async fn list_clusters(&self) -> Result<Value, ClusterListError> {
        let url = self
            .base_url
            .join("v2/kubernetes/clusters")
            .map_err(|e| ClusterListError::Request(e.to_string()))?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClusterListError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClusterListError::Request(e.to_string()))?;

        if !status.is_success() {
            let body = serde_json::from_str(&text)
                .unwrap_or_else(|_| json!({ "error": format!("{}: {}", status, text) }));
            return Err(ClusterListError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ClusterListError::Request(format!("invalid response body: {}", e)))
    }
}
