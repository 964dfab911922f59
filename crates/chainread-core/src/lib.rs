//! chainread-core: resilient read access to Ethereum-style JSON-RPC nodes.
//!
//! # Overview
//!
//! - [`Endpoint`]: one connected node with its handshake metadata
//! - [`ConnectionPool`]: latency-ordered endpoints, exclusive claims,
//!   cooldown-based failover
//! - [`RpcCall`]: typed method + parameter builders
//! - [`BlockAssembler`] / [`ReceiptBatcher`]: multi-call assembly of blocks
//!   and receipts with cross-validation
//! - [`ChainReader`]: the read-only chain-query contract, available on
//!   anything that implements [`RpcCaller`]
//! - [`RpcTransport`] / [`Dialer`]: the seam to a concrete transport

pub mod assembler;
pub mod call;
pub mod caller;
pub mod config;
mod cooldown;
pub mod endpoint;
pub mod error;
pub mod pool;
pub mod reader;
pub mod receipts;
pub mod request;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::BlockAssembler;
pub use call::{BlockId, BlockNumber, CallRequest, RpcCall};
pub use caller::RpcCaller;
pub use config::{MissingPolicy, PoolConfig};
pub use endpoint::Endpoint;
pub use error::{ClientError, Inconsistency, TransportError};
pub use pool::{ConnectionPool, EndpointInfo, SlotState};
pub use reader::ChainReader;
pub use receipts::{ReceiptBatcher, RECEIPT_BATCH_SIZE};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, RpcOutcome};
pub use transport::{Dialer, RpcTransport};
pub use types::{Block, BlockBody, Header, Log, Receipt, Transaction, TxType, Withdrawal};
