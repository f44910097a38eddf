use std::{fmt::Debug, sync::Arc};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::{errors::Error, networks::SolanaNetwork, types::AmountValue};

/// A confirmed on-chain USDC transfer, as sent in the `X-PAYMENT` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaAuthorization {
    pub network: SolanaNetwork,
    /// Base58 transaction signature
    pub signature: String,
    pub from: String,
    pub to: String,
    /// Amount in micro-USDC
    pub amount: AmountValue,
    /// Unix milliseconds
    pub timestamp: u64,
    /// Whether this client saw the transfer confirm. Not part of the header.
    #[serde(skip_serializing, default)]
    pub confirmed: bool,
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A wallet that signs and broadcasts transactions itself, e.g. a browser
/// extension or a remote signing service.
pub trait ExternalSolanaSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> BoxFuture<'_, Result<Signature, BoxError>>;
}

/// A wallet as handed over by the caller.
#[derive(Clone)]
pub enum WalletHandle {
    External(Arc<dyn ExternalSolanaSigner>),
    Keypair(Arc<Keypair>),
    /// An address without signing capability.
    WatchOnly(Pubkey),
}

impl WalletHandle {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            WalletHandle::External(signer) => signer.pubkey(),
            WalletHandle::Keypair(keypair) => keypair.pubkey(),
            WalletHandle::WatchOnly(pubkey) => *pubkey,
        }
    }
}

impl From<Keypair> for WalletHandle {
    fn from(keypair: Keypair) -> Self {
        WalletHandle::Keypair(Arc::new(keypair))
    }
}

impl Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletHandle::External(signer) => write!(f, "External({})", signer.pubkey()),
            WalletHandle::Keypair(keypair) => write!(f, "Keypair({})", keypair.pubkey()),
            WalletHandle::WatchOnly(pubkey) => write!(f, "WatchOnly({pubkey})"),
        }
    }
}

/// A wallet resolved to the way it signs, decided once at connect time.
#[derive(Clone)]
pub enum SolanaSigner {
    Browser(Arc<dyn ExternalSolanaSigner>),
    LocalKeypair(Arc<Keypair>),
}

impl SolanaSigner {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            SolanaSigner::Browser(signer) => signer.pubkey(),
            SolanaSigner::LocalKeypair(keypair) => keypair.pubkey(),
        }
    }
}

impl TryFrom<WalletHandle> for SolanaSigner {
    type Error = Error;

    fn try_from(handle: WalletHandle) -> Result<Self, Self::Error> {
        match handle {
            WalletHandle::External(signer) => Ok(SolanaSigner::Browser(signer)),
            WalletHandle::Keypair(keypair) => Ok(SolanaSigner::LocalKeypair(keypair)),
            WalletHandle::WatchOnly(pubkey) => Err(Error::UnsupportedWallet(format!(
                "{pubkey} cannot sign transactions"
            ))),
        }
    }
}

impl Debug for SolanaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolanaSigner::Browser(signer) => write!(f, "Browser({})", signer.pubkey()),
            SolanaSigner::LocalKeypair(keypair) => write!(f, "LocalKeypair({})", keypair.pubkey()),
        }
    }
}
