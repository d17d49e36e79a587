//! Address normalization.
//!
//! All addresses in the indexed store are lowercase 20-byte hex with a
//! `0x` prefix (spec.md §3). This module wraps [`alloy_primitives::Address`]
//! so every boundary (RPC responses, store rows, verification requests)
//! goes through the same normalization and parse errors.

use alloy_primitives::Address as AlloyAddress;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A normalized, lowercase, `0x`-prefixed 20-byte address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(AlloyAddress);

/// Errors parsing an address from a string.
#[derive(Debug, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid address: {0}")]
    Invalid(String),
}

impl Address {
    pub const ZERO: Address = Address(AlloyAddress::ZERO);

    pub fn is_zero(&self) -> bool {
        self.0 == AlloyAddress::ZERO
    }

    pub fn inner(&self) -> AlloyAddress {
        self.0
    }

    /// Canonical lowercase `0x`-prefixed representation, as stored in the DB.
    pub fn as_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }
}

impl From<AlloyAddress> for Address {
    fn from(value: AlloyAddress) -> Self {
        Address(value)
    }
}

impl From<Address> for AlloyAddress {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlloyAddress::from_str(s)
            .map(Address)
            .map_err(|e| AddressParseError::Invalid(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_lowercase_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_lowercase_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_lowercase() {
        let addr: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BEAed"
            .parse()
            .expect("valid address");
        assert_eq!(
            addr.as_lowercase_hex(),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
        assert_eq!(addr.to_string(), addr.as_lowercase_hex());
    }

    #[test]
    fn zero_address_is_zero() {
        let zero: Address = "0x0000000000000000000000000000000000000000"
            .parse()
            .expect("valid address");
        assert!(zero.is_zero());
        assert_eq!(zero, Address::ZERO);
    }

    #[test]
    fn rejects_malformed_address() {
        let result: Result<Address, _> = "not-an-address".parse();
        assert!(result.is_err());
    }
}
