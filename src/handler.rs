//! Turns selected payment requirements into an `X-PAYMENT` header.

use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;

use crate::{
    errors::{Error, Result},
    networks::{Network, NetworkFamily, SolanaNetwork, svm_rpc::SolanaRpc},
    schemes::{
        exact_evm_signer::{AuthorizationSigner, EvmAuthorizationBuilder},
        exact_svm::{SolanaSigner, WalletHandle},
        exact_svm_executor::SolanaPaymentExecutor,
    },
    transport::{EncodedPaymentHeader, PaymentAuthorization, PaymentRequirements},
};

/// Dispatches each payment to the EVM or Solana scheme by the network the
/// requirements name, not the network the client is configured for.
pub struct PaymentHandler<S = PrivateKeySigner, R = RpcClient>
where
    S: AuthorizationSigner,
    R: SolanaRpc,
{
    active_network: Network,
    evm: Option<EvmAuthorizationBuilder<S>>,
    solana: Option<Arc<SolanaPaymentExecutor<R>>>,
    solana_signer: Option<SolanaSigner>,
    debug: bool,
}

impl<S, R> Clone for PaymentHandler<S, R>
where
    S: AuthorizationSigner + Clone,
    R: SolanaRpc,
{
    fn clone(&self) -> Self {
        PaymentHandler {
            active_network: self.active_network,
            evm: self.evm.clone(),
            solana: self.solana.clone(),
            solana_signer: self.solana_signer.clone(),
            debug: self.debug,
        }
    }
}

impl<S, R> PaymentHandler<S, R>
where
    S: AuthorizationSigner + Sync,
    R: SolanaRpc,
{
    pub fn new(
        active_network: Network,
        evm_signer: Option<S>,
        solana: Option<Arc<SolanaPaymentExecutor<R>>>,
    ) -> Self {
        PaymentHandler {
            active_network,
            evm: evm_signer.map(|signer| EvmAuthorizationBuilder::new(signer, active_network.name())),
            solana,
            solana_signer: None,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn active_network(&self) -> Network {
        self.active_network
    }

    pub fn evm_builder(&self) -> Option<&EvmAuthorizationBuilder<S>> {
        self.evm.as_ref()
    }

    pub fn solana_executor(&self) -> Option<&Arc<SolanaPaymentExecutor<R>>> {
        self.solana.as_ref()
    }

    pub fn solana_signer(&self) -> Option<&SolanaSigner> {
        self.solana_signer.as_ref()
    }

    /// Attach a wallet and return the address it pays from.
    ///
    /// On a Solana network the handle is resolved to a signer once, here. On an
    /// EVM network payments are always signed with the configured key.
    pub fn connect_wallet(&mut self, handle: WalletHandle) -> Result<String> {
        match self.active_network.family() {
            NetworkFamily::Solana => {
                let signer = SolanaSigner::try_from(handle)?;
                let address = signer.pubkey().to_string();
                self.solana_signer = Some(signer);
                Ok(address)
            }
            NetworkFamily::Evm => self.address().ok_or_else(|| {
                Error::Configuration("no signing key for EVM network".to_string())
            }),
        }
    }

    pub fn disconnect_wallet(&mut self) {
        self.solana_signer = None;
    }

    /// Address payments on the active network are made from, if any.
    pub fn address(&self) -> Option<String> {
        match self.active_network.family() {
            NetworkFamily::Solana => self
                .solana_signer
                .as_ref()
                .map(|signer| signer.pubkey().to_string()),
            NetworkFamily::Evm => self.evm.as_ref().map(|evm| evm.address().to_string()),
        }
    }

    pub fn supports_network(&self, network: &str) -> bool {
        Network::is_supported(network)
    }

    /// Produce proof of payment for `requirements`.
    ///
    /// On Solana this broadcasts a transfer and waits for it to confirm.
    pub async fn authorize(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentAuthorization> {
        match requirements.network_family() {
            NetworkFamily::Evm => {
                let evm = self.evm.as_ref().ok_or_else(|| {
                    Error::Configuration("no signing key for EVM network".to_string())
                })?;

                debug_step!(
                    self.debug,
                    network = %requirements.network,
                    chain_id = evm.chain_id,
                    value = %requirements.max_amount_required,
                    "Signing EIP-3009 transfer authorization"
                );

                Ok(evm.build(requirements).await?.into())
            }
            NetworkFamily::Solana => {
                let network: SolanaNetwork = requirements.network.parse()?;
                let executor = self.solana.as_ref().ok_or_else(|| {
                    Error::Configuration(format!(
                        "no Solana connection for network {network}"
                    ))
                })?;
                if executor.network != network {
                    return Err(Error::Configuration(format!(
                        "payment requested on {network} but the client is connected to {}",
                        executor.network
                    )));
                }

                let amount = u64::try_from(requirements.max_amount_required).map_err(|_| {
                    Error::InvalidRequirements(format!(
                        "amount {} exceeds u64",
                        requirements.max_amount_required
                    ))
                })?;

                debug_step!(
                    self.debug,
                    %network,
                    amount,
                    pay_to = %requirements.pay_to,
                    "Executing Solana USDC transfer"
                );

                let authorization = executor
                    .execute_payment(amount, &requirements.pay_to, self.solana_signer.as_ref())
                    .await?;
                Ok(authorization.into())
            }
        }
    }

    /// [`PaymentHandler::authorize`] and encode the result for the `X-PAYMENT` header.
    pub async fn create_header(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<EncodedPaymentHeader> {
        self.authorize(requirements).await?.encode()
    }
}
