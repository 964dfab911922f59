//! Typed JSON-RPC calls.
//!
//! [`RpcCall`] pairs a method name with its already-encoded parameters. The
//! per-method constructors keep parameter shapes type checked;
//! [`RpcCall::new`] remains available for any other method.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Serialize;
use serde_json::{json, Value};

use crate::request::JsonRpcRequest;
use crate::types::quantity;

/// Method names used by this crate.
pub mod methods {
    pub const NET_VERSION: &str = "net_version";
    pub const CLIENT_VERSION: &str = "web3_clientVersion";
    pub const BLOCK_NUMBER: &str = "eth_blockNumber";
    pub const GET_BLOCK_BY_HASH: &str = "eth_getBlockByHash";
    pub const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
    pub const GET_TRANSACTION_BY_HASH: &str = "eth_getTransactionByHash";
    pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    pub const GET_BLOCK_RECEIPTS: &str = "eth_getBlockReceipts";
    pub const GET_CODE: &str = "eth_getCode";
    pub const CALL: &str = "eth_call";
    pub const GET_UNCLE_BY_BLOCK_HASH_AND_INDEX: &str = "eth_getUncleByBlockHashAndIndex";
}

/// Block selector for methods that take a block number parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockNumber {
    #[default]
    Latest,
    Pending,
    Number(u64),
}

impl BlockNumber {
    /// Wire encoding: `"latest"`, `"pending"` or a minimal hex quantity.
    pub fn to_arg(&self) -> String {
        match self {
            Self::Latest => "latest".into(),
            Self::Pending => "pending".into(),
            Self::Number(n) => quantity::encode(*n),
        }
    }
}

impl From<u64> for BlockNumber {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<u64>> for BlockNumber {
    fn from(n: Option<u64>) -> Self {
        n.map_or(Self::Latest, Self::Number)
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            other => f.write_str(&other.to_arg()),
        }
    }
}

impl FromStr for BlockNumber {
    type Err = String;

    /// Accepts `latest`, `pending`, decimal or `0x` hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Self::Latest),
            "pending" => Ok(Self::Pending),
            hex if hex.starts_with("0x") => quantity::parse(hex).map(Self::Number),
            dec => dec
                .parse::<u64>()
                .map(Self::Number)
                .map_err(|e| format!("invalid block number {dec:?}: {e}")),
        }
    }
}

/// A block addressed by hash or by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Hash(B256),
    Number(BlockNumber),
}

impl BlockId {
    pub fn to_arg(&self) -> String {
        match self {
            Self::Hash(hash) => format!("{hash:#x}"),
            Self::Number(number) => number.to_arg(),
        }
    }
}

impl From<B256> for BlockId {
    fn from(hash: B256) -> Self {
        Self::Hash(hash)
    }
}

impl From<BlockNumber> for BlockId {
    fn from(number: BlockNumber) -> Self {
        Self::Number(number)
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        Self::Number(BlockNumber::Number(n))
    }
}

impl FromStr for BlockId {
    type Err = String;

    /// A 32-byte `0x` hash, otherwise anything [`BlockNumber`] accepts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 66 && s.starts_with("0x") {
            return B256::from_str(s)
                .map(Self::Hash)
                .map_err(|e| format!("invalid block hash {s:?}: {e}"));
        }
        BlockNumber::from_str(s).map(Self::Number)
    }
}

/// Message for `eth_call`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Always sent; `null` simulates a contract creation.
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(with = "quantity::opt", skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

impl CallRequest {
    pub fn to(address: Address) -> Self {
        Self {
            to: Some(address),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        self.data = (!data.is_empty()).then_some(data);
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// One JSON-RPC method invocation with encoded parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    method: Cow<'static, str>,
    params: Vec<Value>,
}

impl RpcCall {
    /// Any method with any parameter shape.
    pub fn new(method: impl Into<Cow<'static, str>>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    pub fn net_version() -> Self {
        Self::new(methods::NET_VERSION, vec![])
    }

    pub fn client_version() -> Self {
        Self::new(methods::CLIENT_VERSION, vec![])
    }

    pub fn block_number() -> Self {
        Self::new(methods::BLOCK_NUMBER, vec![])
    }

    pub fn block_by_hash(hash: B256, full: bool) -> Self {
        Self::new(methods::GET_BLOCK_BY_HASH, vec![json!(hash), json!(full)])
    }

    pub fn block_by_number(number: BlockNumber, full: bool) -> Self {
        Self::new(
            methods::GET_BLOCK_BY_NUMBER,
            vec![json!(number.to_arg()), json!(full)],
        )
    }

    pub fn transaction_by_hash(hash: B256) -> Self {
        Self::new(methods::GET_TRANSACTION_BY_HASH, vec![json!(hash)])
    }

    pub fn transaction_receipt(hash: B256) -> Self {
        Self::new(methods::GET_TRANSACTION_RECEIPT, vec![json!(hash)])
    }

    pub fn block_receipts(block: BlockId) -> Self {
        Self::new(methods::GET_BLOCK_RECEIPTS, vec![json!(block.to_arg())])
    }

    pub fn code(account: Address, number: BlockNumber) -> Self {
        Self::new(
            methods::GET_CODE,
            vec![json!(account), json!(number.to_arg())],
        )
    }

    pub fn call(msg: &CallRequest, number: BlockNumber) -> Self {
        Self::new(methods::CALL, vec![json!(msg), json!(number.to_arg())])
    }

    pub fn uncle_by_block_hash_and_index(block_hash: B256, index: u64) -> Self {
        Self::new(
            methods::GET_UNCLE_BY_BLOCK_HASH_AND_INDEX,
            vec![json!(block_hash), json!(quantity::encode(index))],
        )
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn to_request(&self, id: u64) -> JsonRpcRequest {
        JsonRpcRequest::new(id, self.method.as_ref(), self.params.clone())
    }
}

impl fmt::Display for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.method)
    }
}
