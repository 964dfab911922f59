//! A single connection to one remote node.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::call::RpcCall;
use crate::caller::{decode, RpcCaller};
use crate::error::{ClientError, TransportError};
use crate::request::{JsonRpcResponse, RpcId, RpcOutcome};
use crate::transport::{Dialer, RpcTransport};

struct Session {
    transport: Arc<dyn RpcTransport>,
    network_id: String,
    client_version: String,
}

/// A connected node: transport plus the metadata learned during the
/// handshake.
///
/// The latency is measured once, at [`Endpoint::connect`], as the round trip
/// of the `net_version` call.
pub struct Endpoint {
    address: String,
    dialer: Arc<dyn Dialer>,
    session: RwLock<Session>,
    latency: Duration,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Endpoint {
    /// Dial `address` and run the `net_version` / `web3_clientVersion`
    /// handshake.
    pub async fn connect(
        address: impl Into<String>,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Self, ClientError> {
        let address = address.into();
        let next_id = AtomicU64::new(1);
        let (session, latency) = handshake(&address, dialer.as_ref(), &next_id).await?;
        Ok(Self {
            address,
            dialer,
            session: RwLock::new(session),
            latency,
            next_id,
            closed: AtomicBool::new(false),
        })
    }

    /// Dial again and swap in the new transport. The latency recorded at
    /// connect time is kept.
    ///
    /// Fails with [`ClientError::Closed`] once the endpoint is closed; a
    /// transport dialed while `close` ran is closed instead of installed.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        let (session, _) = handshake(&self.address, self.dialer.as_ref(), &self.next_id).await?;
        let previous = {
            let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
            if self.is_closed() {
                drop(guard);
                session.transport.close();
                return Err(ClientError::Closed);
            }
            std::mem::replace(&mut *guard, session)
        };
        previous.transport.close();
        Ok(())
    }

    /// Release the transport. Later reconnects are refused.
    pub fn close(&self) {
        let guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if !self.closed.swap(true, Ordering::AcqRel) {
            guard.transport.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn network_id(&self) -> String {
        self.read_session(|s| s.network_id.clone())
    }

    pub fn client_version(&self) -> String {
        self.read_session(|s| s.client_version.clone())
    }

    /// Execute one call.
    pub async fn request(&self, call: &RpcCall) -> Result<Value, ClientError> {
        let transport = self.transport();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outcome = exchange(transport.as_ref(), id, call).await;
        match &outcome {
            Ok(_) => tracing::debug!(url = %self.address, method = call.method(), "RPC call OK"),
            Err(e) => {
                tracing::debug!(url = %self.address, method = call.method(), error = %e, "RPC call failed")
            }
        }
        outcome
    }

    /// Execute `calls` as one physical batch. Results come back in call
    /// order; the first element error fails the whole batch.
    pub async fn batch_request(&self, calls: &[RpcCall]) -> Result<Vec<Value>, ClientError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let transport = self.transport();
        let first = self.next_id.fetch_add(calls.len() as u64, Ordering::Relaxed);
        let reqs = calls
            .iter()
            .zip(first..)
            .map(|(call, id)| call.to_request(id))
            .collect();
        let outcome = match transport.send_batch(reqs).await {
            Ok(responses) => collate(first, calls.len(), responses),
            Err(e) => Err(e.into()),
        };
        let methods = calls
            .iter()
            .map(RpcCall::method)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(",");
        match &outcome {
            Ok(_) => tracing::debug!(
                url = %self.address,
                count = calls.len(),
                methods = %methods,
                "RPC batch call OK"
            ),
            Err(e) => tracing::debug!(
                url = %self.address,
                count = calls.len(),
                methods = %methods,
                error = %e,
                "RPC batch call failed"
            ),
        }
        outcome
    }

    fn transport(&self) -> Arc<dyn RpcTransport> {
        self.read_session(|s| s.transport.clone())
    }

    fn read_session<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        let guard = self.session.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .field("latency", &self.latency)
            .field("client_version", &self.client_version())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl RpcCaller for Endpoint {
    async fn call(&self, call: RpcCall) -> Result<Value, ClientError> {
        self.request(&call).await
    }

    async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError> {
        self.batch_request(&calls).await
    }
}

async fn handshake(
    address: &str,
    dialer: &dyn Dialer,
    ids: &AtomicU64,
) -> Result<(Session, Duration), ClientError> {
    let transport = dialer.dial(address).await?;
    let identify = async {
        let start = Instant::now();
        let network = exchange(
            transport.as_ref(),
            ids.fetch_add(1, Ordering::Relaxed),
            &RpcCall::net_version(),
        )
        .await?;
        let latency = start.elapsed();
        let version = exchange(
            transport.as_ref(),
            ids.fetch_add(1, Ordering::Relaxed),
            &RpcCall::client_version(),
        )
        .await?;
        let network_id: String = decode("net_version", network)?;
        let client_version: String = decode("web3_clientVersion", version)?;
        Ok::<_, ClientError>((network_id, client_version, latency))
    };
    match identify.await {
        Ok((network_id, client_version, latency)) => Ok((
            Session {
                transport,
                network_id,
                client_version,
            },
            latency,
        )),
        Err(e) => {
            transport.close();
            Err(e)
        }
    }
}

async fn exchange(
    transport: &dyn RpcTransport,
    id: u64,
    call: &RpcCall,
) -> Result<Value, ClientError> {
    let resp = transport.send(call.to_request(id)).await?;
    resolve(resp)
}

fn resolve(resp: JsonRpcResponse) -> Result<Value, ClientError> {
    match resp.into_outcome() {
        RpcOutcome::Result(value) => Ok(value),
        RpcOutcome::Error(err) => Err(err.into()),
        RpcOutcome::Empty => Err(ClientError::NoResult),
    }
}

/// Match batch responses back to requests by id; servers may reorder them.
fn collate(
    first: u64,
    count: usize,
    responses: Vec<JsonRpcResponse>,
) -> Result<Vec<Value>, ClientError> {
    let mut by_id: HashMap<u64, JsonRpcResponse> = HashMap::with_capacity(responses.len());
    for resp in responses {
        if let RpcId::Number(id) = &resp.id {
            by_id.insert(*id, resp);
        }
    }
    (first..first + count as u64)
        .map(|id| {
            let resp = by_id
                .remove(&id)
                .ok_or(TransportError::MissingResponse { id })?;
            resolve(resp)
        })
        .collect()
}
