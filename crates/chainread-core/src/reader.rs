//! Read-only chain queries.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::assembler::BlockAssembler;
use crate::call::{BlockId, BlockNumber, CallRequest, RpcCall};
use crate::caller::{decode, RpcCaller};
use crate::error::{ClientError, Inconsistency};
use crate::receipts::ReceiptBatcher;
use crate::types::{quantity, Block, Receipt, Transaction};

/// The chain-query contract.
///
/// Every [`RpcCaller`] gets it for free, so the same queries run against a
/// routed [`ConnectionPool`](crate::ConnectionPool) or a single
/// [`Endpoint`](crate::Endpoint).
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `net_version`, parsed as a decimal integer.
    async fn network_id(&self) -> Result<u64, ClientError>;

    async fn block_by_hash(&self, hash: B256, full: bool) -> Result<Block, ClientError>;

    async fn block_by_number(&self, number: BlockNumber, full: bool)
        -> Result<Block, ClientError>;

    /// Height of the most recent block.
    async fn block_number(&self) -> Result<u64, ClientError>;

    /// The transaction and whether it is still pending.
    async fn transaction_by_hash(&self, hash: B256) -> Result<(Transaction, bool), ClientError>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Receipt, ClientError>;

    /// All receipts of a block via `eth_getBlockReceipts`.
    async fn block_receipts(&self, block: BlockId) -> Result<Vec<Receipt>, ClientError>;

    /// Receipts for a known list of transactions, fetched in batches.
    async fn receipts_for_block(
        &self,
        block_hash: B256,
        tx_hashes: &[B256],
    ) -> Result<Vec<Receipt>, ClientError>;

    async fn code_at(&self, account: Address, number: BlockNumber) -> Result<Bytes, ClientError>;

    async fn call_contract(
        &self,
        msg: &CallRequest,
        number: BlockNumber,
    ) -> Result<Bytes, ClientError>;
}

#[async_trait]
impl<C: RpcCaller + ?Sized> ChainReader for C {
    async fn network_id(&self) -> Result<u64, ClientError> {
        let raw: String = decode("net_version", self.call(RpcCall::net_version()).await?)?;
        raw.parse::<u64>()
            .map_err(|_| Inconsistency::InvalidNetworkVersion(raw).into())
    }

    async fn block_by_hash(&self, hash: B256, full: bool) -> Result<Block, ClientError> {
        BlockAssembler::new(self).block_by_hash(hash, full).await
    }

    async fn block_by_number(
        &self,
        number: BlockNumber,
        full: bool,
    ) -> Result<Block, ClientError> {
        BlockAssembler::new(self).block_by_number(number, full).await
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        let raw: String = decode("eth_blockNumber", self.call(RpcCall::block_number()).await?)?;
        quantity::parse(&raw)
            .map_err(|reason| Inconsistency::InvalidQuantity { value: raw, reason }.into())
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<(Transaction, bool), ClientError> {
        let value = self.call_required(RpcCall::transaction_by_hash(hash)).await?;
        let tx: Transaction = decode("transaction", value)?;
        if tx.r.is_none() {
            return Err(Inconsistency::UnsignedTransaction { hash: tx.hash }.into());
        }
        let pending = tx.is_pending();
        Ok((tx, pending))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Receipt, ClientError> {
        let value = self.call_required(RpcCall::transaction_receipt(hash)).await?;
        decode("transaction receipt", value)
    }

    async fn block_receipts(&self, block: BlockId) -> Result<Vec<Receipt>, ClientError> {
        let value = self.call_required(RpcCall::block_receipts(block)).await?;
        let receipts: Vec<Receipt> = decode("block receipts", value)?;
        if let BlockId::Hash(expected) = block {
            if let Some(stray) = receipts.iter().find(|r| r.block_hash != expected) {
                return Err(Inconsistency::ReceiptBlockMismatch {
                    tx_hash: stray.transaction_hash,
                    expected,
                    actual: stray.block_hash,
                }
                .into());
            }
        }
        Ok(receipts)
    }

    async fn receipts_for_block(
        &self,
        block_hash: B256,
        tx_hashes: &[B256],
    ) -> Result<Vec<Receipt>, ClientError> {
        ReceiptBatcher::new(self).receipts(block_hash, tx_hashes).await
    }

    async fn code_at(&self, account: Address, number: BlockNumber) -> Result<Bytes, ClientError> {
        decode("code", self.call(RpcCall::code(account, number)).await?)
    }

    async fn call_contract(
        &self,
        msg: &CallRequest,
        number: BlockNumber,
    ) -> Result<Bytes, ClientError> {
        decode("call result", self.call(RpcCall::call(msg, number)).await?)
    }
}
