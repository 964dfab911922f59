//! Fetches the receipts of a block's transactions in fixed-size batches.

use alloy_primitives::B256;

use crate::call::RpcCall;
use crate::caller::RpcCaller;
use crate::error::{ClientError, Inconsistency};
use crate::types::Receipt;

/// Maximum number of receipt calls per physical batch.
pub const RECEIPT_BATCH_SIZE: usize = 100;

/// Retrieves receipts for a known list of transaction hashes.
///
/// Chunks are sent one after another, each as a single batch; results keep
/// the input order. Every receipt must be present and must belong to the
/// requested block, otherwise the whole fetch fails.
#[derive(Debug, Clone)]
pub struct ReceiptBatcher<C> {
    caller: C,
    chunk_size: usize,
}

impl<C: RpcCaller> ReceiptBatcher<C> {
    pub fn new(caller: C) -> Self {
        Self {
            caller,
            chunk_size: RECEIPT_BATCH_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn receipts(
        &self,
        block_hash: B256,
        tx_hashes: &[B256],
    ) -> Result<Vec<Receipt>, ClientError> {
        let mut receipts = Vec::with_capacity(tx_hashes.len());
        for chunk in tx_hashes.chunks(self.chunk_size) {
            let calls = chunk
                .iter()
                .map(|hash| RpcCall::transaction_receipt(*hash))
                .collect();
            let values = self.caller.batch_call(calls).await?;
            if values.len() != chunk.len() {
                return Err(Inconsistency::BatchSizeMismatch {
                    expected: chunk.len(),
                    actual: values.len(),
                }
                .into());
            }
            for (&tx_hash, value) in chunk.iter().zip(values) {
                if value.is_null() {
                    return Err(Inconsistency::NullReceipt { tx_hash }.into());
                }
                let receipt: Receipt = serde_json::from_value(value)
                    .map_err(|e| ClientError::decode("transaction receipt", e))?;
                if receipt.block_hash != block_hash {
                    return Err(Inconsistency::ReceiptBlockMismatch {
                        tx_hash,
                        expected: block_hash,
                        actual: receipt.block_hash,
                    }
                    .into());
                }
                receipts.push(receipt);
            }
        }
        Ok(receipts)
    }
}
