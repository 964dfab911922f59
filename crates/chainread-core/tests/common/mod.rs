//! Scripted nodes for pool-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use chainread_core::{
    ConnectionPool, Dialer, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PoolConfig,
    RpcTransport, TransportError,
};

/// One fake node. Serves `eth_blockNumber` as its own height so tests can
/// tell which node answered.
pub struct Node {
    pub address: String,
    pub height: u64,
    latency: Duration,
    down: AtomicBool,
    no_result: AtomicBool,
    null_result: AtomicBool,
    reverse_batches: AtomicBool,
    element_error: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    served: AtomicUsize,
}

impl Node {
    pub fn new(address: &str, height: u64, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            height,
            latency,
            down: AtomicBool::new(false),
            no_result: AtomicBool::new(false),
            null_result: AtomicBool::new(false),
            reverse_batches: AtomicBool::new(false),
            element_error: AtomicBool::new(false),
            gate: Mutex::new(None),
            served: AtomicUsize::new(0),
        })
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Answer chain queries with neither `result` nor `error`.
    pub fn set_no_result(&self, on: bool) {
        self.no_result.store(on, Ordering::SeqCst);
    }

    /// Answer chain queries with `result: null`.
    pub fn set_null_result(&self, on: bool) {
        self.null_result.store(on, Ordering::SeqCst);
    }

    pub fn reverse_batches(&self) {
        self.reverse_batches.store(true, Ordering::SeqCst);
    }

    /// Answer the second element of every batch with a node error object.
    pub fn fail_batch_element(&self, on: bool) {
        self.element_error.store(on, Ordering::SeqCst);
    }

    /// Hold chain queries until the returned handle is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Chain queries answered so far (handshakes excluded).
    pub fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    async fn answer(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tokio::time::sleep(self.latency).await;
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::Http(format!("{} is down", self.address)));
        }
        let result = match req.method.as_str() {
            "net_version" => json!("1"),
            "web3_clientVersion" => json!(format!("fake/{}", self.address)),
            _ => {
                let gate = self.gate.lock().unwrap().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                self.served.fetch_add(1, Ordering::SeqCst);
                if self.no_result.load(Ordering::SeqCst) {
                    return Ok(JsonRpcResponse {
                        jsonrpc: "2.0".into(),
                        id: req.id.clone(),
                        result: None,
                        error: None,
                    });
                }
                if self.null_result.load(Ordering::SeqCst) {
                    Value::Null
                } else if req.method == "eth_blockNumber" {
                    json!(format!("{:#x}", self.height))
                } else {
                    // echo the first parameter
                    req.params.first().cloned().unwrap_or(Value::Null)
                }
            }
        };
        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }
}

struct FakeTransport {
    node: Arc<Node>,
}

#[async_trait]
impl RpcTransport for FakeTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.node.answer(&req).await
    }

    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut responses = Vec::with_capacity(reqs.len());
        for req in &reqs {
            responses.push(self.node.answer(req).await?);
        }
        if self.node.element_error.load(Ordering::SeqCst) && responses.len() > 1 {
            responses[1] = JsonRpcResponse::failure(
                reqs[1].id.clone(),
                JsonRpcError {
                    code: -32005,
                    message: "limit exceeded".into(),
                    data: None,
                },
            );
        }
        if self.node.reverse_batches.load(Ordering::SeqCst) {
            responses.reverse();
        }
        Ok(responses)
    }

    fn url(&self) -> &str {
        &self.node.address
    }
}

pub struct FakeDialer {
    nodes: HashMap<String, Arc<Node>>,
    dials: Mutex<HashMap<String, usize>>,
}

impl FakeDialer {
    pub fn new(nodes: &[Arc<Node>]) -> Arc<Self> {
        Arc::new(Self {
            nodes: nodes
                .iter()
                .map(|n| (n.address.clone(), n.clone()))
                .collect(),
            dials: Mutex::new(HashMap::new()),
        })
    }

    pub fn dials(&self, address: &str) -> usize {
        self.dials
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(&self, address: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        *self
            .dials
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default() += 1;
        let node = self
            .nodes
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::Http(format!("no route to {address}")))?;
        Ok(Arc::new(FakeTransport { node }))
    }
}

pub async fn pool(nodes: &[Arc<Node>], config: PoolConfig) -> (ConnectionPool, Arc<FakeDialer>) {
    let dialer = FakeDialer::new(nodes);
    let addresses: Vec<String> = nodes.iter().map(|n| n.address.clone()).collect();
    let pool = ConnectionPool::connect(addresses, dialer.clone(), config)
        .await
        .expect("pool connects");
    (pool, dialer)
}

/// Yield until `check` holds. Relies on the paused clock to make progress.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
