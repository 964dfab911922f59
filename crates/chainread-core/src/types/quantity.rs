//! Strict `0x`-hex codec for 64-bit JSON-RPC quantities.
//!
//! Decoding rejects anything the encoder would not produce (missing prefix,
//! leading zeros, empty digits, signs or uppercase digits), so decode followed by encode reproduces the
//! wire text byte for byte.

use serde::{de, Deserialize, Deserializer, Serializer};

/// Render `value` as a minimal `0x` hex quantity.
pub fn encode(value: u64) -> String {
    format!("{value:#x}")
}

/// Parse a minimal `0x` hex quantity.
pub fn parse(text: &str) -> Result<u64, String> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| "missing 0x prefix".to_string())?;
    if digits.is_empty() {
        return Err("empty quantity".into());
    }
    if !digits.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err("non-lowercase-hex digits".into());
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err("leading zero digits".into());
    }
    if digits.len() > 16 {
        return Err("quantity exceeds 64 bits".into());
    }
    u64::from_str_radix(digits, 16).map_err(|e| e.to_string())
}

pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode(*value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).map_err(|reason| de::Error::custom(format!("{text:?}: {reason}")))
}

/// Same codec for optional fields; JSON `null` maps to `None`.
pub mod opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&encode(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => parse(&text)
                .map(Some)
                .map_err(|reason| de::Error::custom(format!("{text:?}: {reason}"))),
            None => Ok(None),
        }
    }
}
