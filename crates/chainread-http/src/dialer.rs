use std::sync::Arc;

use async_trait::async_trait;

use chainread_core::error::TransportError;
use chainread_core::transport::{Dialer, RpcTransport};

use crate::client::{HttpClientConfig, HttpRpcClient};

/// Produces [`HttpRpcClient`]s for `http://` and `https://` addresses.
///
/// HTTP has no connection to establish up front; reachability is checked by
/// the endpoint handshake that follows the dial.
#[derive(Debug, Clone, Default)]
pub struct HttpDialer {
    config: HttpClientConfig,
}

impl HttpDialer {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dialer for HttpDialer {
    async fn dial(&self, address: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let url = reqwest::Url::parse(address)
            .map_err(|_| TransportError::UnsupportedScheme(address.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(TransportError::UnsupportedScheme(address.to_string())),
        }
        tracing::debug!(url = address, "Dialing HTTP endpoint");
        Ok(Arc::new(HttpRpcClient::new(address, self.config.clone())?))
    }
}
