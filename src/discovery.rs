//! Debugging endpoint discovery
//!
//! The devtools server lists its inspectable targets as JSON at
//! `/json/list`; the relay attaches to the first one.

use reqwest::StatusCode;
use tracing::{error, info};

use crate::transport::protocol::TargetInfo;
use crate::{RelayError, Result};

/// Resolves the WebSocket debugger address of the active target
#[derive(Debug, Clone)]
pub struct EndpointDiscovery {
    url: String,
    client: reqwest::Client,
}

impl EndpointDiscovery {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: reqwest::Client::new() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the target list and return the first target's `webSocketDebuggerUrl`.
    ///
    /// A non-200 status is logged but the body is still parsed, since some
    /// devtools servers answer with a usable listing anyway. No retry happens
    /// here.
    pub async fn discover(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            RelayError::discovery_failed_with_source(&self.url, "request failed", Box::new(e))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(
                "Failed to get websocket url: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }

        let body = response.text().await.map_err(|e| {
            RelayError::discovery_failed_with_source(&self.url, "unreadable body", Box::new(e))
        })?;
        let address = parse_target_list(&self.url, &body)?;
        info!("WS URL found: {}", address);
        Ok(address)
    }
}

/// Extract the first target's debugger address from a `/json/list` body
pub fn parse_target_list(url: &str, body: &str) -> Result<String> {
    let targets: Vec<TargetInfo> = serde_json::from_str(body).map_err(|e| {
        RelayError::discovery_failed_with_source(url, "target list is not valid JSON", Box::new(e))
    })?;

    let first = targets
        .into_iter()
        .next()
        .ok_or_else(|| RelayError::discovery_failed(url, "no debuggable targets listed"))?;

    first.web_socket_debugger_url.ok_or_else(|| {
        RelayError::discovery_failed(
            url,
            format!("target {} has no webSocketDebuggerUrl", first.id.as_deref().unwrap_or("<unnamed>")),
        )
    })
}
