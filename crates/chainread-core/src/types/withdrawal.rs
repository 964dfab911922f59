use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::quantity;

/// A validator withdrawal (EIP-4895). `amount` is in gwei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(with = "quantity")]
    pub index: u64,
    #[serde(with = "quantity")]
    pub validator_index: u64,
    pub address: Address,
    #[serde(with = "quantity")]
    pub amount: u64,
}
