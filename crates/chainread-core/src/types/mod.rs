//! Chain data types and their JSON-RPC codecs.

pub mod block;
pub mod header;
pub mod quantity;
pub mod receipt;
pub mod transaction;
pub mod withdrawal;

pub use block::{Block, BlockBody, CompactBody, FullBody};
pub use header::Header;
pub use receipt::{Log, Receipt, RECEIPT_STATUS_FAILED, RECEIPT_STATUS_SUCCESSFUL};
pub use transaction::{AccessListItem, Transaction, TxType};
pub use withdrawal::Withdrawal;
