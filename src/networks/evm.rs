use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use alloy_primitives::address;
use serde::{Deserialize, Serialize};

/// EVM networks the client can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvmNetwork {
    Base,
    BaseTestnet,
}

pub const BASE_CHAIN_ID: u64 = 8453;
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

impl EvmNetwork {
    pub fn name(&self) -> &'static str {
        match self {
            EvmNetwork::Base => "base",
            EvmNetwork::BaseTestnet => "base-testnet",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            EvmNetwork::Base => BASE_CHAIN_ID,
            EvmNetwork::BaseTestnet => BASE_SEPOLIA_CHAIN_ID,
        }
    }
}

/// Chain id used to sign for a network name.
///
/// Unrecognized EVM variants sign for Base mainnet.
pub fn chain_id_for(network: &str) -> u64 {
    match network {
        "base-testnet" | "base-sepolia" => EvmNetwork::BaseTestnet,
        _ => EvmNetwork::Base,
    }
    .chain_id()
}

/// Name and version of the EIP-712 domain of USDC (FiatTokenV2) contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcDomain {
    pub name: &'static str,
    pub version: &'static str,
}

pub const USDC_EIP712_DOMAIN: UsdcDomain = UsdcDomain {
    name: "USD Coin",
    version: "2",
};

/// Destination used when the requirements carry no `from` override.
pub const FALLBACK_PAY_TO: EvmAddress = EvmAddress(address!(
    "0xB389c8b863193B2A1e48deFD007413702196723B"
));

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub alloy_primitives::Address);

impl From<alloy_primitives::Address> for EvmAddress {
    fn from(addr: alloy_primitives::Address) -> Self {
        EvmAddress(addr)
    }
}

impl FromStr for EvmAddress {
    type Err = alloy_primitives::AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = alloy_primitives::Address::from_str(s)?;
        Ok(EvmAddress(addr))
    }
}

impl Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmAddress({})", self.0)
    }
}

impl Serialize for EvmAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}
