//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! One POST per request; batches go out as a single JSON array. Failover,
//! cooldown and timeouts per logical call live in the pool, not here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use chainread_core::error::TransportError;
use chainread_core::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use chainread_core::transport::RpcTransport;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP JSON-RPC transport for one node.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, body: &T) -> Result<Vec<u8>, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Other(format!("transport to {} is closed", self.url)));
        }

        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        Ok(bytes.to_vec())
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let body = self.post(&req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// True HTTP batch: send all requests as a JSON array in one HTTP call.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }
        let body = self.post(&reqs).await?;
        parse_batch(&body)
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Some nodes answer a batch they refuse with a single error object instead
/// of an array.
fn parse_batch(body: &[u8]) -> Result<Vec<JsonRpcResponse>, TransportError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(TransportError::from))
            .collect(),
        Value::Object(mut obj) => match obj.remove("error") {
            Some(err) => Err(TransportError::Rpc(serde_json::from_value::<JsonRpcError>(err)?)),
            None => Err(TransportError::Other(
                "batch response is an object without error".into(),
            )),
        },
        other => Err(TransportError::Other(format!(
            "unexpected batch response: {other}"
        ))),
    }
}
