//! Network identifiers and the EVM / SVM family split.
//!
//! Four networks are known to the client: `base`, `base-testnet`, `solana` and
//! `solana-devnet`. Servers may still name other networks in a 402 response; those
//! are classified as EVM-family so that dispatch never leaves a network unhandled.

pub mod evm;
pub mod svm;
pub mod svm_rpc;

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

pub use evm::EvmNetwork;
pub use svm::SolanaNetwork;

/// Returns `true` only for the Solana mainnet and devnet identifiers.
pub fn is_solana_network(network: &str) -> bool {
    matches!(network, svm::SOLANA | svm::SOLANA_DEVNET)
}

/// The chain family a network identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFamily {
    Evm,
    Solana,
}

impl NetworkFamily {
    /// Classify any network identifier.
    ///
    /// Anything that is not a known Solana identifier, including typos and
    /// unknown chains, falls back to [`NetworkFamily::Evm`].
    pub fn classify(network: &str) -> Self {
        if is_solana_network(network) {
            NetworkFamily::Solana
        } else {
            NetworkFamily::Evm
        }
    }
}

/// One of the four networks the client can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Evm(EvmNetwork),
    Solana(SolanaNetwork),
}

impl Network {
    pub const BASE: Network = Network::Evm(EvmNetwork::Base);
    pub const BASE_TESTNET: Network = Network::Evm(EvmNetwork::BaseTestnet);
    pub const SOLANA: Network = Network::Solana(SolanaNetwork::Mainnet);
    pub const SOLANA_DEVNET: Network = Network::Solana(SolanaNetwork::Devnet);

    pub const ALL: [Network; 4] = [
        Network::BASE,
        Network::BASE_TESTNET,
        Network::SOLANA,
        Network::SOLANA_DEVNET,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Evm(n) => n.name(),
            Network::Solana(n) => n.name(),
        }
    }

    pub fn family(&self) -> NetworkFamily {
        match self {
            Network::Evm(_) => NetworkFamily::Evm,
            Network::Solana(_) => NetworkFamily::Solana,
        }
    }

    pub fn is_solana(&self) -> bool {
        self.family() == NetworkFamily::Solana
    }

    /// Membership test against the four known identifiers.
    pub fn is_supported(network: &str) -> bool {
        Network::ALL.iter().any(|n| n.name() == network)
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::BASE
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.name() == s)
            .ok_or_else(|| Error::UnsupportedNetwork(s.to_string()))
    }
}

impl Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Network::from_str(&s).map_err(serde::de::Error::custom)
    }
}
