//! Bech32 account addresses
//!
//! Contract and account addresses travel as bech32 strings on the command line
//! and in generated transactions, but every message carries the canonical
//! 20-byte form. Decoding is strict: checksum, prefix and length all have to
//! match before an address reaches a message.

use bitcoin::bech32::{self, Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{ComputeError, Result};

/// Default account prefix of the compute chain
pub const DEFAULT_BECH32_PREFIX: &str = "secret";

/// Length of a canonical account address
pub const ADDRESS_LEN: usize = 20;

/// Canonical account address together with the prefix it renders under.
/// `Default` is the empty address, which message validation rejects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AccAddress {
    prefix: String,
    bytes: Vec<u8>,
}

impl AccAddress {
    /// Build an address from canonical bytes
    pub fn from_canonical(prefix: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ADDRESS_LEN {
            return Err(ComputeError::AddressFormat(format!(
                "invalid address length: expected {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            )));
        }
        Hrp::parse(prefix)
            .map_err(|e| ComputeError::AddressFormat(format!("invalid bech32 prefix '{}': {}", prefix, e)))?;
        Ok(Self {
            prefix: prefix.to_lowercase(),
            bytes: bytes.to_vec(),
        })
    }

    /// Decode a bech32 address, requiring the given prefix
    pub fn from_bech32(s: &str, expected_prefix: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ComputeError::AddressFormat("empty address string is not allowed".to_string()));
        }

        let (hrp, data) = bech32::decode(trimmed)
            .map_err(|e| ComputeError::AddressFormat(format!("decoding bech32 failed for '{}': {}", trimmed, e)))?;

        let prefix = hrp.to_lowercase();
        if prefix != expected_prefix.to_lowercase() {
            return Err(ComputeError::AddressFormat(format!(
                "invalid bech32 prefix: expected {}, got {}",
                expected_prefix, prefix
            )));
        }

        Self::from_canonical(&prefix, &data)
    }

    /// Canonical address bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as bech32
    pub fn to_bech32(&self) -> String {
        if self.bytes.is_empty() {
            return String::new();
        }
        // prefix and length were checked on construction
        match Hrp::parse(&self.prefix).map(|hrp| bech32::encode::<Bech32>(hrp, &self.bytes)) {
            Ok(Ok(encoded)) => encoded,
            _ => hex::encode(&self.bytes),
        }
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl FromStr for AccAddress {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bech32(s, DEFAULT_BECH32_PREFIX)
    }
}

impl Serialize for AccAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let (hrp, _) = bech32::decode(&s).map_err(serde::de::Error::custom)?;
        AccAddress::from_bech32(&s, &hrp.to_lowercase()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AccAddress {
        AccAddress::from_canonical("secret", &[7u8; ADDRESS_LEN]).unwrap()
    }

    #[test]
    fn test_bech32_roundtrip_preserves_canonical_bytes() {
        let addr = sample();
        let encoded = addr.to_bech32();
        assert!(encoded.starts_with("secret1"));

        let decoded: AccAddress = encoded.parse().unwrap();
        assert_eq!(decoded.as_bytes(), &[7u8; ADDRESS_LEN]);
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        let other = AccAddress::from_canonical("cosmos", &[1u8; ADDRESS_LEN]).unwrap();
        let err = AccAddress::from_str(&other.to_bech32()).unwrap_err();
        assert!(matches!(err, ComputeError::AddressFormat(_)));
    }

    #[test]
    fn test_rejects_bad_checksum_and_garbage() {
        let mut encoded = sample().to_bech32();
        let last = encoded.pop().unwrap();
        encoded.push(if last == 'q' { 'p' } else { 'q' });

        assert!(matches!(AccAddress::from_str(&encoded), Err(ComputeError::AddressFormat(_))));
        assert!(matches!(AccAddress::from_str("not-an-address"), Err(ComputeError::AddressFormat(_))));
        assert!(matches!(AccAddress::from_str(""), Err(ComputeError::AddressFormat(_))));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(AccAddress::from_canonical("secret", &[0u8; 19]).is_err());
        let hrp = Hrp::parse("secret").unwrap();
        let long = bech32::encode::<Bech32>(hrp, &[0u8; 32]).unwrap();
        assert!(matches!(AccAddress::from_str(&long), Err(ComputeError::AddressFormat(_))));
    }

    #[test]
    fn test_serde_as_bech32_string() {
        let addr = sample();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_bech32()));
        let back: AccAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
