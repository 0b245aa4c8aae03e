// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::api::{ChainResponse, StatusResponse};
use crate::errors::NodeError;
use reqwest::Client;
use std::time::Duration;
use tickledger_kernel::Hash;

/// HTTP client for one peer's query surface.
///
/// `request_timeout` bounds the status and chain queries. The sync stream has
/// no overall deadline: its reader applies an idle timeout per chunk instead.
#[derive(Debug, Clone)]
pub struct PeerClient {
    base_url: String,
    client: Client,
    request_timeout: Duration,
}

/// Client for peer traffic: connect attempts are bounded, whole responses are not.
pub fn build_http_client(connect_timeout: Duration) -> Result<Client, NodeError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| NodeError::Network(e.to_string()))
}

impl PeerClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NodeError> {
        Ok(Self::with_client(url, build_http_client(timeout)?, timeout))
    }

    /// Shares an existing connection pool. `url` may omit the scheme.
    pub fn with_client(url: &str, client: Client, request_timeout: Duration) -> Self {
        let url = url.trim_end_matches('/');
        let base_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        Self { base_url, client, request_timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Status query. `me` announces our own query surface so the peer registers us.
    pub async fn status(&self, me: Option<(&str, u16)>) -> Result<StatusResponse, NodeError> {
        let url = format!("{}/p2p/status", self.base_url);
        let mut req = self.client.get(&url).timeout(self.request_timeout);
        if let Some((host, port)) = me {
            req = req.query(&[("rpc_host", host.to_string()), ("rpc_port", port.to_string())]);
        }
        let resp = req.send().await.map_err(|e| NodeError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NodeError::Network(format!("Status request failed: {}", resp.status())));
        }

        resp.json().await.map_err(|e| NodeError::Network(e.to_string()))
    }

    /// Catch-up query. The response body is NDJSON, one block record per line,
    /// and may take far longer than `request_timeout` to arrive in full.
    pub async fn stream_blocks(&self, from: &Hash) -> Result<reqwest::Response, NodeError> {
        let url = format!("{}/p2p/sync", self.base_url);
        let send = self.client.get(&url).query(&[("from", from.to_base64())]).send();
        // Only the wait for response headers is bounded here.
        let resp = tokio::time::timeout(self.request_timeout, send)
            .await
            .map_err(|_| NodeError::Network("Sync request timed out".to_string()))?
            .map_err(|e| NodeError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NodeError::Network(format!("Sync request failed: {}", resp.status())));
        }

        Ok(resp)
    }

    pub async fn chain(&self) -> Result<ChainResponse, NodeError> {
        let url = format!("{}/chain", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NodeError::Network(format!("Chain request failed: {}", resp.status())));
        }

        resp.json().await.map_err(|e| NodeError::Network(e.to_string()))
    }
}
