//! The call surface shared by the pool and single endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::call::RpcCall;
use crate::error::ClientError;

/// Something that can execute JSON-RPC calls and batches.
///
/// Implemented by [`ConnectionPool`](crate::ConnectionPool) (routed with
/// failover) and [`Endpoint`](crate::Endpoint) (one fixed node).
#[async_trait]
pub trait RpcCaller: Send + Sync {
    /// Execute one call and return its raw result, which may be JSON `null`.
    async fn call(&self, call: RpcCall) -> Result<Value, ClientError>;

    /// Like [`RpcCaller::call`], but a JSON `null` result is
    /// [`ClientError::NotFound`].
    async fn call_required(&self, call: RpcCall) -> Result<Value, ClientError> {
        match self.call(call).await? {
            Value::Null => Err(ClientError::NotFound),
            value => Ok(value),
        }
    }

    /// Execute `calls` as one physical batch against a single node. Results
    /// are in call order.
    async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError>;
}

#[async_trait]
impl<T: RpcCaller + ?Sized> RpcCaller for &T {
    async fn call(&self, call: RpcCall) -> Result<Value, ClientError> {
        (**self).call(call).await
    }

    async fn call_required(&self, call: RpcCall) -> Result<Value, ClientError> {
        (**self).call_required(call).await
    }

    async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError> {
        (**self).batch_call(calls).await
    }
}

#[async_trait]
impl<T: RpcCaller + ?Sized> RpcCaller for Arc<T> {
    async fn call(&self, call: RpcCall) -> Result<Value, ClientError> {
        (**self).call(call).await
    }

    async fn call_required(&self, call: RpcCall) -> Result<Value, ClientError> {
        (**self).call_required(call).await
    }

    async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, ClientError> {
        (**self).batch_call(calls).await
    }
}

/// Decode a raw result into `T`, naming `what` in the error.
pub fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::decode(what, e))
}
