//! [`AmountValue`] represents a token amount in smallest units.
//!
//! Servers send amounts as decimal strings, e.g. `"10000"` for 0.01 USDC.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Represents a token amount in the smallest unit of the asset.
///
/// Uses a `u128` internally to support large values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AmountValue(pub u128);

impl From<u32> for AmountValue {
    fn from(value: u32) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u64> for AmountValue {
    fn from(value: u64) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u128> for AmountValue {
    fn from(value: u128) -> Self {
        AmountValue(value)
    }
}

impl TryFrom<AmountValue> for u64 {
    type Error = std::num::TryFromIntError;

    fn try_from(value: AmountValue) -> Result<Self, Self::Error> {
        u64::try_from(value.0)
    }
}

impl FromStr for AmountValue {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(AmountValue)
    }
}

impl Display for AmountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AmountValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AmountValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_decimal_string() {
        let amount: AmountValue = serde_json::from_str("\"10000\"").unwrap();
        assert_eq!(amount, AmountValue(10_000));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"10000\"");
    }

    #[test]
    fn test_amount_rejects_non_decimal() {
        assert!(serde_json::from_str::<AmountValue>("\"0x10\"").is_err());
        assert!(serde_json::from_str::<AmountValue>("\"-1\"").is_err());
    }

    #[test]
    fn test_amount_to_u64() {
        assert_eq!(u64::try_from(AmountValue(42)).unwrap(), 42);
        assert!(u64::try_from(AmountValue(u128::MAX)).is_err());
    }
}
