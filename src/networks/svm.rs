use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey};

use crate::errors::Error;

pub const SOLANA: &str = "solana";
pub const SOLANA_DEVNET: &str = "solana-devnet";

pub const USDC_MINT_MAINNET: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDC_MINT_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// Solana clusters the client can pay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolanaNetwork {
    Mainnet,
    Devnet,
}

impl SolanaNetwork {
    pub fn name(&self) -> &'static str {
        match self {
            SolanaNetwork::Mainnet => SOLANA,
            SolanaNetwork::Devnet => SOLANA_DEVNET,
        }
    }

    /// The USDC mint payments on this cluster are made in.
    pub fn usdc_mint(&self) -> Pubkey {
        match self {
            SolanaNetwork::Mainnet => USDC_MINT_MAINNET,
            SolanaNetwork::Devnet => USDC_MINT_DEVNET,
        }
    }

    /// Public RPC endpoint used when no override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            SolanaNetwork::Mainnet => "https://api.mainnet-beta.solana.com",
            SolanaNetwork::Devnet => "https://api.devnet.solana.com",
        }
    }
}

impl Display for SolanaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SolanaNetwork {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SOLANA => Ok(SolanaNetwork::Mainnet),
            SOLANA_DEVNET => Ok(SolanaNetwork::Devnet),
            other => Err(Error::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl Serialize for SolanaNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SolanaNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SolanaNetwork::from_str(&s).map_err(serde::de::Error::custom)
    }
}
