//! Block header.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256};
use alloy_rlp::{Encodable, Header as RlpHeader};
use serde::{Deserialize, Serialize};

use super::quantity;

/// A block header as served by `eth_getBlockBy*` and
/// `eth_getUncleByBlockHashAndIndex`.
///
/// Fields introduced by later forks are optional and trail the legacy ones in
/// the RLP encoding, in the order declared here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Hash reported by the server. Absent for pending blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
    pub parent_hash: B256,
    #[serde(rename = "sha3Uncles")]
    pub ommers_hash: B256,
    #[serde(rename = "miner")]
    pub beneficiary: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    #[serde(with = "quantity")]
    pub number: u64,
    #[serde(with = "quantity")]
    pub gas_limit: u64,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    #[serde(default, with = "quantity::opt", skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<u64>,
    #[serde(default, with = "quantity::opt", skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

impl Header {
    /// keccak256 of the RLP-encoded header.
    pub fn hash_slow(&self) -> B256 {
        let mut out = Vec::with_capacity(self.rlp_length());
        self.rlp_encode(&mut out);
        keccak256(&out)
    }

    /// The server-reported hash, falling back to [`Header::hash_slow`].
    pub fn block_hash(&self) -> B256 {
        self.hash.unwrap_or_else(|| self.hash_slow())
    }

    /// Optional trailing fields in encoding order. Encoding stops at the first
    /// `None`, matching how forks append fields.
    fn trailing_fields(&self) -> [Option<&dyn Encodable>; 6] {
        [
            self.base_fee_per_gas.as_ref().map(|v| v as &dyn Encodable),
            self.withdrawals_root.as_ref().map(|v| v as &dyn Encodable),
            self.blob_gas_used.as_ref().map(|v| v as &dyn Encodable),
            self.excess_blob_gas.as_ref().map(|v| v as &dyn Encodable),
            self.parent_beacon_block_root
                .as_ref()
                .map(|v| v as &dyn Encodable),
            self.requests_hash.as_ref().map(|v| v as &dyn Encodable),
        ]
    }

    fn fields(&self) -> Vec<&dyn Encodable> {
        let mut fields: Vec<&dyn Encodable> = vec![
            &self.parent_hash,
            &self.ommers_hash,
            &self.beneficiary,
            &self.state_root,
            &self.transactions_root,
            &self.receipts_root,
            &self.logs_bloom,
            &self.difficulty,
            &self.number,
            &self.gas_limit,
            &self.gas_used,
            &self.timestamp,
            &self.extra_data,
            &self.mix_hash,
            &self.nonce,
        ];
        fields.extend(self.trailing_fields().into_iter().map_while(|f| f));
        fields
    }

    fn payload_length(&self) -> usize {
        self.fields().iter().map(|f| f.length()).sum()
    }

    fn rlp_length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }

    fn rlp_encode(&self, out: &mut Vec<u8>) {
        RlpHeader {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        for field in self.fields() {
            field.encode(out);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A post-London header with no server hash set.
    pub(crate) fn sample_header(number: u64) -> Header {
        Header {
            hash: None,
            parent_hash: B256::repeat_byte(0x11),
            ommers_hash: B256::repeat_byte(0x22),
            beneficiary: Address::repeat_byte(0x33),
            state_root: B256::repeat_byte(0x44),
            transactions_root: B256::repeat_byte(0x55),
            receipts_root: B256::repeat_byte(0x66),
            logs_bloom: Bloom::ZERO,
            difficulty: U256::from(0x2_0000u64),
            number,
            gas_limit: 30_000_000,
            gas_used: 12_345_678,
            timestamp: 1_700_000_000 + number,
            extra_data: Bytes::from_static(b"chainread"),
            mix_hash: B256::repeat_byte(0x77),
            nonce: B64::ZERO,
            base_fee_per_gas: Some(U256::from(7u64)),
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            requests_hash: None,
        }
    }

    #[test]
    fn hash_depends_on_every_field() {
        let a = sample_header(10);
        let mut b = a.clone();
        b.gas_used += 1;
        assert_ne!(a.hash_slow(), b.hash_slow());

        let mut c = a.clone();
        c.withdrawals_root = Some(B256::ZERO);
        assert_ne!(a.hash_slow(), c.hash_slow());
    }

    #[test]
    fn server_hash_is_not_part_of_encoding() {
        let a = sample_header(10);
        let mut b = a.clone();
        b.hash = Some(B256::repeat_byte(0xee));
        assert_eq!(a.hash_slow(), b.hash_slow());
        assert_eq!(b.block_hash(), B256::repeat_byte(0xee));
        assert_eq!(a.block_hash(), a.hash_slow());
    }

    #[test]
    fn fields_after_a_gap_are_not_encoded() {
        let a = sample_header(10);
        let mut b = a.clone();
        // blob gas without withdrawals root cannot be encoded positionally
        b.blob_gas_used = Some(1);
        assert_eq!(a.hash_slow(), b.hash_slow());
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(sample_header(1)).unwrap();
        assert_eq!(json["number"], "0x1");
        assert_eq!(json["gasLimit"], "0x1c9c380");
        assert_eq!(json["miner"], "0x3333333333333333333333333333333333333333");
        assert_eq!(json["baseFeePerGas"], "0x7");
        assert!(json.get("sha3Uncles").is_some());
        assert!(json.get("withdrawalsRoot").is_none());
        assert!(json.get("hash").is_none());
    }
}
