//! Transactions as returned by `eth_getTransactionByHash` and full blocks.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::quantity;

/// Transaction type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    #[default]
    Legacy,
    /// EIP-2930.
    AccessList,
    /// EIP-1559.
    DynamicFee,
    /// Any discriminator this crate does not model, kept verbatim.
    Other(u64),
}

impl TxType {
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Legacy => 0,
            Self::AccessList => 1,
            Self::DynamicFee => 2,
            Self::Other(n) => n,
        }
    }
}

impl From<u64> for TxType {
    fn from(value: u64) -> Self {
        match value {
            0 => Self::Legacy,
            1 => Self::AccessList,
            2 => Self::DynamicFee,
            n => Self::Other(n),
        }
    }
}

impl Serialize for TxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        quantity::serialize(&self.as_u64(), serializer)
    }
}

impl<'de> Deserialize<'de> for TxType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        quantity::parse(&text)
            .map(Self::from)
            .map_err(|reason| de::Error::custom(format!("transaction type {text:?}: {reason}")))
    }
}

/// One entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// A transaction with its signature and, once mined, inclusion metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(with = "quantity")]
    pub nonce: u64,
    #[serde(with = "quantity")]
    pub gas: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    pub value: U256,
    pub input: Bytes,
    #[serde(rename = "type", default)]
    pub tx_type: TxType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListItem>>,
    #[serde(default, with = "quantity::opt", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Signature values. Absent for unsigned payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<U256>,
    #[serde(default, with = "quantity::opt", skip_serializing_if = "Option::is_none")]
    pub y_parity: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default, with = "quantity::opt")]
    pub block_number: Option<u64>,
    #[serde(default, with = "quantity::opt")]
    pub transaction_index: Option<u64>,
}

impl Transaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Not yet included in a block.
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }

    /// `gas * gasPrice + value`, when a gas price is known.
    pub fn cost(&self) -> Option<U256> {
        self.gas_price
            .map(|price| price.saturating_mul(U256::from(self.gas)).saturating_add(self.value))
    }
}
