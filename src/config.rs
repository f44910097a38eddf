use bon::Builder;

use crate::{networks::Network, schemes::exact_svm::WalletHandle};

/// Base URL of the hosted LLM API.
pub const DEFAULT_BASE_URL: &str = "https://jatevo.ai";

/// Client configuration.
#[derive(Builder, Clone)]
pub struct ClientConfig {
    /// Base URL model endpoints and balance lookups are resolved against.
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    /// Hex encoded secp256k1 key used to sign EVM payment authorizations.
    #[builder(into)]
    pub private_key: Option<String>,
    /// Network the client prefers when a server offers several.
    #[builder(default)]
    pub network: Network,
    /// Log each step of the payment protocol at debug level.
    #[builder(default)]
    pub debug: bool,
    /// Solana RPC endpoint, defaults to the public endpoint of the cluster.
    #[builder(into)]
    pub solana_rpc_url: Option<String>,
    /// Wallet connected at construction when the network is a Solana cluster.
    #[builder(into)]
    pub solana_wallet: Option<WalletHandle>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::builder().build()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("network", &self.network)
            .field("debug", &self.debug)
            .field("solana_rpc_url", &self.solana_rpc_url)
            .field("solana_wallet", &self.solana_wallet)
            .finish()
    }
}
