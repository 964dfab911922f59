//! In-memory nodes for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Dialer, RpcTransport};

type Handler = Box<dyn Fn(&[Value]) -> Result<Value, JsonRpcError> + Send + Sync>;

struct NodeInner {
    address: String,
    latency: Mutex<Duration>,
    handlers: Mutex<HashMap<String, Handler>>,
    failing: AtomicBool,
    methods: Mutex<Vec<String>>,
    batch_sizes: Mutex<Vec<usize>>,
}

/// A scripted node. Answers `net_version` with `"1"` and
/// `web3_clientVersion` with `mock/<address>` until told otherwise.
#[derive(Clone)]
pub(crate) struct MockNode {
    inner: Arc<NodeInner>,
}

impl MockNode {
    pub(crate) fn new(address: &str) -> Self {
        let node = Self {
            inner: Arc::new(NodeInner {
                address: address.to_string(),
                latency: Mutex::new(Duration::ZERO),
                handlers: Mutex::new(HashMap::new()),
                failing: AtomicBool::new(false),
                methods: Mutex::new(Vec::new()),
                batch_sizes: Mutex::new(Vec::new()),
            }),
        };
        node.respond("net_version", |_| Ok(json!("1")));
        let version = format!("mock/{address}");
        node.respond("web3_clientVersion", move |_| Ok(json!(version)));
        node
    }

    /// Delay applied to every request.
    pub(crate) fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock().unwrap() = latency;
        self
    }

    pub(crate) fn respond<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, JsonRpcError> + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .lock()
            .unwrap()
            .insert(method.to_string(), Box::new(handler));
    }

    /// Every request fails at the transport level from now on.
    pub(crate) fn fail_with_http(&self) {
        self.inner.failing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn address(&self) -> &str {
        &self.inner.address
    }

    /// Methods served so far, batch elements included, handshake excluded.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.inner
            .methods
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() != "net_version" && m.as_str() != "web3_clientVersion")
            .cloned()
            .collect()
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.inner.batch_sizes.lock().unwrap().clone()
    }

    fn answer(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        self.inner.methods.lock().unwrap().push(req.method.clone());
        let handlers = self.inner.handlers.lock().unwrap();
        let outcome = match handlers.get(&req.method) {
            Some(handler) => handler(&req.params),
            None => Err(JsonRpcError {
                code: -32601,
                message: format!("the method {} does not exist", req.method),
                data: None,
            }),
        };
        match outcome {
            Ok(value) => JsonRpcResponse::success(req.id.clone(), value),
            Err(err) => JsonRpcResponse::failure(req.id.clone(), err),
        }
    }

    async fn delay(&self) -> Result<(), TransportError> {
        let latency = *self.inner.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Http("connection reset".into()));
        }
        Ok(())
    }
}

struct MockTransport {
    node: MockNode,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.node.delay().await?;
        Ok(self.node.answer(&req))
    }

    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        self.node.delay().await?;
        self.node.inner.batch_sizes.lock().unwrap().push(reqs.len());
        Ok(reqs.iter().map(|r| self.node.answer(r)).collect())
    }

    fn url(&self) -> &str {
        self.node.address()
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dials [`MockNode`]s by address. Unknown addresses are refused.
pub(crate) struct MockDialer {
    nodes: HashMap<String, MockNode>,
    dials: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MockDialer {
    pub(crate) fn with_nodes(nodes: impl IntoIterator<Item = MockNode>) -> Arc<Self> {
        Arc::new(Self {
            nodes: nodes
                .into_iter()
                .map(|n| (n.address().to_string(), n))
                .collect(),
            dials: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Transports closed so far.
    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, address: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let node = self
            .nodes
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::Http(format!("connection refused: {address}")))?;
        Ok(Arc::new(MockTransport {
            node,
            closed: self.closed.clone(),
        }))
    }
}

/// An endpoint connected to `node`.
pub(crate) async fn connected(node: &MockNode) -> Endpoint {
    let dialer = MockDialer::with_nodes([node.clone()]);
    Endpoint::connect(node.address(), dialer)
        .await
        .expect("mock handshake")
}
