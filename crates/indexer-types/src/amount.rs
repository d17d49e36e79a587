//! Arbitrary-precision, non-negative token amounts.
//!
//! Spec.md §3 requires large integers to be stored as decimal strings, never
//! machine integers. We back [`TokenAmount`] with [`alloy_primitives::U256`]
//! (256 bits is wide enough for any ERC-20/721/1155 value) and expose only
//! decimal-string and checked-arithmetic views, so every layer above this
//! type gets I3 (balance non-negativity) for free: subtraction saturates at
//! zero rather than wrapping or panicking.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A non-negative, arbitrary-precision token amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TokenAmount(U256);

#[derive(Debug, thiserror::Error)]
pub enum AmountParseError {
    #[error("invalid token amount: {0}")]
    Invalid(String),
}

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(U256::ZERO);

    pub fn from_u256(value: U256) -> Self {
        TokenAmount(value)
    }

    pub fn inner(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts, saturating at `U256::MAX` (never observed in
    /// practice for real transfer values, but avoids a panic on overflow).
    pub fn saturating_add(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_add(other.0))
    }

    /// Subtracts `other` from `self`, clamping at zero per the balance
    /// maintenance rule in spec.md §4.B: `balance(from) <- max(0, balance - value)`.
    pub fn saturating_sub(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_sub(other.0))
    }

    /// Decimal string representation, as persisted in the store.
    pub fn as_decimal_string(&self) -> String {
        self.0.to_string()
    }
}

impl FromStr for TokenAmount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        U256::from_str(s)
            .map(TokenAmount)
            .map_err(|e| AmountParseError::Invalid(format!("{s}: {e}")))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal_string())
    }
}

impl Serialize for TokenAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_decimal_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TokenAmount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_clamps_at_zero() {
        let zero = TokenAmount::ZERO;
        let value: TokenAmount = "100".parse().unwrap();
        assert_eq!(zero.saturating_sub(value), TokenAmount::ZERO);
    }

    #[test]
    fn addition_accumulates() {
        let a: TokenAmount = "1000".parse().unwrap();
        let b: TokenAmount = "400".parse().unwrap();
        assert_eq!(a.saturating_sub(b).as_decimal_string(), "600");
    }

    #[test]
    fn rejects_non_numeric() {
        let result: Result<TokenAmount, _> = "not-a-number".parse();
        assert!(result.is_err());
    }

    #[test]
    fn roundtrips_through_decimal_string() {
        let amount: TokenAmount = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(amount.as_decimal_string(), "123456789012345678901234567890");
    }
}
