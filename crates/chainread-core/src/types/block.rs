//! Assembled blocks.

use alloy_primitives::B256;
use serde::Serialize;

use super::header::Header;
use super::transaction::Transaction;
use super::withdrawal::Withdrawal;

/// Block body with every transaction and uncle materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullBody {
    pub transactions: Vec<Transaction>,
    pub uncles: Vec<Header>,
}

/// Block body carrying only hash references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactBody {
    pub transactions: Vec<B256>,
    pub uncles: Vec<B256>,
}

/// A block is either fully hydrated or fully compact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BlockBody {
    Full(FullBody),
    Compact(CompactBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(flatten)]
    pub header: Header,
    #[serde(flatten)]
    pub body: BlockBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl Block {
    pub fn compact(
        header: Header,
        transactions: Vec<B256>,
        uncles: Vec<B256>,
        withdrawals: Option<Vec<Withdrawal>>,
    ) -> Self {
        Self {
            header,
            body: BlockBody::Compact(CompactBody {
                transactions,
                uncles,
            }),
            withdrawals,
        }
    }

    pub fn full(
        header: Header,
        transactions: Vec<Transaction>,
        uncles: Vec<Header>,
        withdrawals: Option<Vec<Withdrawal>>,
    ) -> Self {
        Self {
            header,
            body: BlockBody::Full(FullBody {
                transactions,
                uncles,
            }),
            withdrawals,
        }
    }

    pub fn hash(&self) -> B256 {
        self.header.block_hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn is_full(&self) -> bool {
        matches!(self.body, BlockBody::Full(_))
    }

    /// Transaction hashes in block order, whichever body shape is held.
    pub fn transaction_hashes(&self) -> Vec<B256> {
        match &self.body {
            BlockBody::Full(body) => body.transactions.iter().map(|tx| tx.hash).collect(),
            BlockBody::Compact(body) => body.transactions.clone(),
        }
    }

    /// Uncle hashes in block order, whichever body shape is held.
    pub fn uncle_hashes(&self) -> Vec<B256> {
        match &self.body {
            BlockBody::Full(body) => body.uncles.iter().map(Header::hash_slow).collect(),
            BlockBody::Compact(body) => body.uncles.clone(),
        }
    }

    /// Full transactions, if this block is hydrated.
    pub fn transactions(&self) -> Option<&[Transaction]> {
        match &self.body {
            BlockBody::Full(body) => Some(&body.transactions),
            BlockBody::Compact(_) => None,
        }
    }

    /// Uncle headers, if this block is hydrated.
    pub fn uncles(&self) -> Option<&[Header]> {
        match &self.body {
            BlockBody::Full(body) => Some(&body.uncles),
            BlockBody::Compact(_) => None,
        }
    }
}
