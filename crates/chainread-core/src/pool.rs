//! Latency-ordered connection pool with exclusive claims and cooldown-based
//! failover.
//!
//! Every routed call scans the endpoints fastest first and claims the first
//! free one with a single compare-and-swap. An endpoint serves at most one
//! call at a time. Transport faults put the endpoint into cooldown and the
//! scan continues with the next free endpoint.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::call::RpcCall;
use crate::caller::RpcCaller;
use crate::config::{MissingPolicy, PoolConfig};
use crate::cooldown::CooldownRegistry;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, TransportError};
use crate::transport::Dialer;

/// Routing status of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Available for a new call.
    Free = 0,
    /// Claimed by an in-flight call.
    Busy = 1,
    /// Faulted; waiting for a reconnect.
    CoolingDown = 2,
}

impl SlotState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Free,
            1 => Self::Busy,
            _ => Self::CoolingDown,
        }
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Busy => write!(f, "busy"),
            Self::CoolingDown => write!(f, "cooling-down"),
        }
    }
}

pub(crate) struct Slot {
    pub(crate) endpoint: Arc<Endpoint>,
    state: AtomicU8,
}

impl Slot {
    fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            state: AtomicU8::new(SlotState::Free as u8),
        }
    }

    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn try_claim(&self) -> Option<SlotClaim<'_>> {
        self.state
            .compare_exchange(
                SlotState::Free as u8,
                SlotState::Busy as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| SlotClaim {
                slot: self,
                armed: true,
            })
    }

    pub(crate) fn release(&self) {
        self.state.store(SlotState::Free as u8, Ordering::Release);
    }
}

/// Exclusive use of one slot. Dropping the claim frees the slot, including
/// when the call future is dropped mid-flight.
struct SlotClaim<'a> {
    slot: &'a Slot,
    armed: bool,
}

impl SlotClaim<'_> {
    /// Hand the slot over to the cooldown registry instead of freeing it.
    fn into_cooldown(mut self) {
        self.slot
            .state
            .store(SlotState::CoolingDown as u8, Ordering::Release);
        self.armed = false;
    }
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.release();
        }
    }
}

/// Snapshot of one pool member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub address: String,
    pub client_version: String,
    pub network_id: String,
    pub latency: Duration,
    pub state: SlotState,
}

/// A fixed set of endpoints sorted by handshake latency.
pub struct ConnectionPool {
    slots: Vec<Arc<Slot>>,
    cooldowns: CooldownRegistry,
    config: PoolConfig,
    closed: AtomicBool,
}

impl ConnectionPool {
    /// Dial every address (at most `dial_concurrency` at a time, each bounded
    /// by `dial_timeout`) and keep the ones that complete the handshake.
    ///
    /// Fails with [`ClientError::NoConnection`] if none does.
    pub async fn connect<I, S>(
        addresses: I,
        dialer: Arc<dyn Dialer>,
        config: PoolConfig,
    ) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dial_timeout = config.dial_timeout;
        let endpoints: Vec<Endpoint> = stream::iter(addresses.into_iter().map(Into::into))
            .map(|address: String| {
                let dialer = dialer.clone();
                async move {
                    let attempt = Endpoint::connect(address.clone(), dialer);
                    match tokio::time::timeout(dial_timeout, attempt).await {
                        Ok(Ok(endpoint)) => Some(endpoint),
                        Ok(Err(e)) => {
                            tracing::debug!(url = %address, error = %e, "Dropping endpoint");
                            None
                        }
                        Err(_) => {
                            tracing::debug!(
                                url = %address,
                                timeout_ms = dial_timeout.as_millis() as u64,
                                "Dropping endpoint: dial timed out"
                            );
                            None
                        }
                    }
                }
            })
            .buffer_unordered(config.dial_concurrency.max(1))
            .filter_map(futures::future::ready)
            .collect()
            .await;

        for endpoint in &endpoints {
            tracing::info!(
                url = endpoint.address(),
                version = %endpoint.client_version(),
                latency_ms = endpoint.latency().as_millis() as u64,
                "Connected to endpoint"
            );
        }
        Self::from_endpoints(endpoints, config)
    }

    /// Build a pool from already connected endpoints.
    pub fn from_endpoints(
        mut endpoints: Vec<Endpoint>,
        config: PoolConfig,
    ) -> Result<Self, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::NoConnection);
        }
        endpoints.sort_by_key(Endpoint::latency);
        Ok(Self {
            slots: endpoints.into_iter().map(|e| Arc::new(Slot::new(e))).collect(),
            cooldowns: CooldownRegistry::new(config.cooldown, config.dial_timeout),
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Number of endpoints, in any state.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Per-endpoint snapshot in routing order.
    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.slots
            .iter()
            .map(|slot| EndpointInfo {
                address: slot.endpoint.address().to_string(),
                client_version: slot.endpoint.client_version(),
                network_id: slot.endpoint.network_id(),
                latency: slot.endpoint.latency(),
                state: slot.state(),
            })
            .collect()
    }

    /// Number of endpoints waiting for a reconnect.
    pub fn pending_reconnects(&self) -> usize {
        self.cooldowns.pending()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Route one call.
    pub async fn call(&self, call: RpcCall) -> Result<Value, ClientError> {
        let call = &call;
        self.route(call.method(), |endpoint| async move {
            endpoint.request(call).await
        })
        .await
    }

    /// Route one call whose `null` result means the data is absent. The
    /// resulting [`ClientError::NotFound`] is subject to the missing policy.
    pub async fn call_required(&self, call: RpcCall) -> Result<Value, ClientError> {
        let call = &call;
        self.route(call.method(), |endpoint| async move {
            match endpoint.request(call).await? {
                Value::Null => Err(ClientError::NotFound),
                value => Ok(value),
            }
        })
        .await
    }

    /// Route a batch. The whole batch goes to a single endpoint.
    pub async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let calls = &calls;
        self.route("batch", |endpoint| async move {
            endpoint.batch_request(calls).await
        })
        .await
    }

    /// Stop all pending reconnects and close every endpoint. Later calls
    /// fail with [`ClientError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cooldowns.shutdown();
        for slot in &self.slots {
            slot.endpoint.close();
        }
        tracing::debug!(size = self.slots.len(), "Connection pool closed");
    }

    async fn route<T, F, Fut>(&self, label: &str, op: F) -> Result<T, ClientError>
    where
        F: Fn(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        let request_timeout = self.config.request_timeout;
        let mut last_error = None;

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(claim) = slot.try_claim() else {
                continue;
            };
            let outcome = match tokio::time::timeout(request_timeout, op(slot.endpoint.clone())).await
            {
                Ok(res) => res,
                Err(_) => Err(TransportError::Timeout {
                    ms: request_timeout.as_millis() as u64,
                }
                .into()),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_missing() => match self.config.missing_policy {
                    MissingPolicy::Return => return Err(e),
                    MissingPolicy::Failover => {
                        drop(claim);
                        last_error = Some(e);
                    }
                },
                Err(e) if e.is_endpoint_fault() => {
                    tracing::warn!(
                        url = slot.endpoint.address(),
                        method = label,
                        error = %e,
                        "Endpoint fault, cooling down"
                    );
                    claim.into_cooldown();
                    self.cooldowns.schedule(index, slot.clone());
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(ClientError::AllBusy))
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("endpoints", &self.endpoints())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl RpcCaller for ConnectionPool {
    async fn call(&self, call: RpcCall) -> Result<Value, ClientError> {
        ConnectionPool::call(self, call).await
    }

    async fn call_required(&self, call: RpcCall) -> Result<Value, ClientError> {
        ConnectionPool::call_required(self, call).await
    }

    async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError> {
        ConnectionPool::batch_call(self, calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::JsonRpcError;
    use crate::testing::{MockDialer, MockNode};
    use serde_json::json;

    async fn pool_of(nodes: Vec<MockNode>, config: PoolConfig) -> ConnectionPool {
        let addresses: Vec<String> = nodes.iter().map(|n| n.address().to_string()).collect();
        let dialer = MockDialer::with_nodes(nodes);
        ConnectionPool::connect(addresses, dialer, config).await.unwrap()
    }

    #[test]
    fn claim_is_exclusive_and_released_on_drop() {
        let slot = Slot {
            endpoint: Arc::new(testing_endpoint()),
            state: AtomicU8::new(SlotState::Free as u8),
        };
        let claim = slot.try_claim().unwrap();
        assert_eq!(slot.state(), SlotState::Busy);
        assert!(slot.try_claim().is_none());
        drop(claim);
        assert_eq!(slot.state(), SlotState::Free);

        slot.try_claim().unwrap().into_cooldown();
        assert_eq!(slot.state(), SlotState::CoolingDown);
        assert!(slot.try_claim().is_none());
    }

    fn testing_endpoint() -> Endpoint {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let dialer = MockDialer::with_nodes([MockNode::new("http://a")]);
            Endpoint::connect("http://a", dialer).await.unwrap()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn connect_sorts_by_latency_and_drops_failures() {
        let slow = MockNode::new("http://slow").with_latency(Duration::from_millis(300));
        let fast = MockNode::new("http://fast").with_latency(Duration::from_millis(10));
        let broken = MockNode::new("http://broken");
        broken.fail_with_http();
        let mid = MockNode::new("http://mid").with_latency(Duration::from_millis(50));

        let pool = pool_of(vec![slow, fast, broken, mid], PoolConfig::default()).await;
        let order: Vec<String> = pool.endpoints().into_iter().map(|e| e.address).collect();
        assert_eq!(order, vec!["http://fast", "http://mid", "http://slow"]);
        assert_eq!(pool.size(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_drops_endpoints_past_dial_timeout() {
        let slow = MockNode::new("http://slow").with_latency(Duration::from_secs(10));
        let fast = MockNode::new("http://fast");
        let pool = pool_of(vec![slow, fast], PoolConfig::default()).await;
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.endpoints()[0].address, "http://fast");
    }

    #[tokio::test]
    async fn connect_with_no_survivors_fails() {
        let dialer = MockDialer::with_nodes([]);
        let err = ConnectionPool::connect(["http://a", "http://b"], dialer, PoolConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoConnection));
    }

    #[tokio::test]
    async fn fastest_endpoint_serves_the_call() {
        let a = MockNode::new("http://a");
        let b = MockNode::new("http://b").with_latency(Duration::from_millis(5));
        a.respond("eth_blockNumber", |_| Ok(json!("0x10")));
        b.respond("eth_blockNumber", |_| Ok(json!("0x11")));
        let pool = pool_of(vec![b, a], PoolConfig::default()).await;

        let value = pool.call(RpcCall::block_number()).await.unwrap();
        assert_eq!(value, json!("0x10"));
        assert!(pool.endpoints().iter().all(|e| e.state == SlotState::Free));
    }

    #[tokio::test(start_paused = true)]
    async fn fault_fails_over_and_cools_down() {
        let a = MockNode::new("http://a");
        let b = MockNode::new("http://b").with_latency(Duration::from_millis(5));
        a.respond("eth_blockNumber", |_| {
            Err(JsonRpcError {
                code: -32005,
                message: "limit exceeded".into(),
                data: None,
            })
        });
        b.respond("eth_blockNumber", |_| Ok(json!("0x11")));
        let pool = pool_of(vec![a, b], PoolConfig::default()).await;

        let value = pool.call(RpcCall::block_number()).await.unwrap();
        assert_eq!(value, json!("0x11"));
        let states: Vec<SlotState> = pool.endpoints().into_iter().map(|e| e.state).collect();
        assert_eq!(states, vec![SlotState::CoolingDown, SlotState::Free]);
        assert_eq!(pool.pending_reconnects(), 1);
    }

    #[tokio::test]
    async fn null_result_passes_through_without_cooldown() {
        let a = MockNode::new("http://a");
        a.respond("eth_getTransactionReceipt", |_| Ok(Value::Null));
        let pool = pool_of(vec![a], PoolConfig::default()).await;

        let value = pool
            .call(RpcCall::new("eth_getTransactionReceipt", vec![json!("0x00")]))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(pool.endpoints()[0].state, SlotState::Free);
    }

    #[tokio::test]
    async fn closed_pool_rejects_calls() {
        let pool = pool_of(vec![MockNode::new("http://a")], PoolConfig::default()).await;
        pool.close();
        assert!(pool.is_closed());
        let err = pool.call(RpcCall::block_number()).await.unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_call() {
        let a = MockNode::new("http://a");
        let pool = pool_of(vec![a.clone()], PoolConfig::default()).await;
        assert!(pool.batch_call(Vec::new()).await.unwrap().is_empty());
        assert!(a.batch_sizes().is_empty());
    }
}
