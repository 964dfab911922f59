//! Error types.
//!
//! [`TransportError`] covers everything that can go wrong talking to one
//! endpoint. [`ClientError`] is what pool and chain-query callers see; its
//! classification decides whether the pool fails over.

use alloy_primitives::B256;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, bad status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A batch response did not contain an entry for this request id.
    #[error("Batch response is missing id {id}")]
    MissingResponse { id: u64 },

    /// The dialer does not know how to reach this address.
    #[error("Unsupported endpoint address: {0}")]
    UnsupportedScheme(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

/// A structural invariant of a multi-call response was violated.
#[derive(Debug, Error)]
pub enum Inconsistency {
    #[error("batch returned {actual} results for {expected} calls")]
    BatchSizeMismatch { expected: usize, actual: usize },

    #[error("got null header for uncle {hash}")]
    NullUncle { hash: B256 },

    #[error("got wrong header for uncle {index}: expected {expected}, got {actual}")]
    UncleHashMismatch {
        index: usize,
        expected: B256,
        actual: B256,
    },

    #[error("got null receipt for tx hash {tx_hash}")]
    NullReceipt { tx_hash: B256 },

    #[error("receipt {tx_hash} does not belong to block {expected} (found in {actual})")]
    ReceiptBlockMismatch {
        tx_hash: B256,
        expected: B256,
        actual: B256,
    },

    #[error("server returned transaction {hash} without signature")]
    UnsignedTransaction { hash: B256 },

    #[error("invalid net_version result {0:?}")]
    InvalidNetworkVersion(String),

    #[error("invalid quantity {value:?}: {reason}")]
    InvalidQuantity { value: String, reason: String },
}

/// Errors surfaced by the pool and the chain-query contract.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested entity does not exist in the node's chain state.
    #[error("not found")]
    NotFound,

    /// The server answered without a result.
    #[error("no result in JSON-RPC response")]
    NoResult,

    /// Transport or protocol failure of one endpoint.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Multi-call response failed cross-validation.
    #[error("inconsistent response: {0}")]
    Inconsistent(#[from] Inconsistency),

    /// A result value did not match the expected shape.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Every endpoint is claimed by an in-flight call or cooling down.
    #[error("all endpoints are busy")]
    AllBusy,

    /// Pool construction could not connect to any endpoint.
    #[error("no connection established")]
    NoConnection,

    /// The pool has been closed.
    #[error("connection pool is closed")]
    Closed,
}

impl ClientError {
    /// Returns `true` for NotFound / NoResult: the data is absent, the
    /// endpoint is fine.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound | Self::NoResult)
    }

    /// Returns `true` if the endpoint that produced this error should be put
    /// into cooldown.
    pub fn is_endpoint_fault(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if a cross-validation check failed.
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::Inconsistent(_))
    }

    pub(crate) fn decode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { what, source }
    }
}

impl From<JsonRpcError> for ClientError {
    fn from(err: JsonRpcError) -> Self {
        Self::Transport(TransportError::Rpc(err))
    }
}
