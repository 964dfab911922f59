//! Materializes [`Block`]s from `eth_getBlockBy*` envelopes.
//!
//! A compact block is built from the envelope alone. A full block needs a
//! second round trip: envelopes only list uncle hashes, so the uncle headers
//! are fetched with one batch of `eth_getUncleByBlockHashAndIndex` calls and
//! checked against the hashes the envelope listed.

use alloy_primitives::B256;
use serde::Deserialize;

use crate::call::{BlockNumber, RpcCall};
use crate::caller::RpcCaller;
use crate::error::{ClientError, Inconsistency};
use crate::types::{Block, Header, Transaction, Withdrawal};

#[derive(Deserialize)]
struct CompactEnvelope {
    #[serde(default)]
    transactions: Vec<B256>,
    #[serde(default)]
    uncles: Vec<B256>,
    #[serde(default)]
    withdrawals: Option<Vec<Withdrawal>>,
}

#[derive(Deserialize)]
struct FullEnvelope {
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    uncles: Vec<B256>,
    #[serde(default)]
    withdrawals: Option<Vec<Withdrawal>>,
}

/// Builds blocks through any [`RpcCaller`].
#[derive(Debug, Clone)]
pub struct BlockAssembler<C> {
    caller: C,
}

impl<C: RpcCaller> BlockAssembler<C> {
    pub fn new(caller: C) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    pub async fn block_by_hash(&self, hash: B256, full: bool) -> Result<Block, ClientError> {
        self.assemble(RpcCall::block_by_hash(hash, full), full).await
    }

    pub async fn block_by_number(
        &self,
        number: BlockNumber,
        full: bool,
    ) -> Result<Block, ClientError> {
        self.assemble(RpcCall::block_by_number(number, full), full)
            .await
    }

    async fn assemble(&self, call: RpcCall, full: bool) -> Result<Block, ClientError> {
        let envelope = self.caller.call_required(call).await?;
        let header = Header::deserialize(&envelope)
            .map_err(|e| ClientError::decode("block header", e))?;

        if !full {
            let body = CompactEnvelope::deserialize(&envelope)
                .map_err(|e| ClientError::decode("compact block body", e))?;
            return Ok(Block::compact(
                header,
                body.transactions,
                body.uncles,
                body.withdrawals,
            ));
        }

        let body = FullEnvelope::deserialize(&envelope)
            .map_err(|e| ClientError::decode("block body", e))?;
        let uncles = self.uncles(header.block_hash(), &body.uncles).await?;
        Ok(Block::full(header, body.transactions, uncles, body.withdrawals))
    }

    async fn uncles(&self, block_hash: B256, hashes: &[B256]) -> Result<Vec<Header>, ClientError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let calls = (0..hashes.len() as u64)
            .map(|index| RpcCall::uncle_by_block_hash_and_index(block_hash, index))
            .collect();
        let values = self.caller.batch_call(calls).await?;
        if values.len() != hashes.len() {
            return Err(Inconsistency::BatchSizeMismatch {
                expected: hashes.len(),
                actual: values.len(),
            }
            .into());
        }

        hashes
            .iter()
            .zip(values)
            .enumerate()
            .map(|(index, (&expected, value))| {
                if value.is_null() {
                    return Err(Inconsistency::NullUncle { hash: expected }.into());
                }
                let uncle: Header = serde_json::from_value(value)
                    .map_err(|e| ClientError::decode("uncle header", e))?;
                let actual = uncle.hash_slow();
                if actual != expected {
                    return Err(Inconsistency::UncleHashMismatch {
                        index,
                        expected,
                        actual,
                    }
                    .into());
                }
                Ok(uncle)
            })
            .collect()
    }
}
