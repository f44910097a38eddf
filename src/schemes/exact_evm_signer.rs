use alloy_core::{
    sol,
    sol_types::{Eip712Domain, SolStruct, eip712_domain},
};
use alloy_primitives::{FixedBytes, U256};
use alloy_signer::{Error as AlloySignerError, Signer as AlloySigner};

use crate::{
    errors::{Error, Result},
    networks::evm::{EvmAddress, FALLBACK_PAY_TO, USDC_EIP712_DOMAIN, chain_id_for},
    schemes::exact_evm::{EvmAuthorization, Nonce, SignatureParts},
    transport::PaymentRequirements,
};

use std::time::SystemTime;

/// How long a signed authorization stays valid.
pub const AUTHORIZATION_VALIDITY_SECS: u64 = 3600;

pub trait AuthorizationSigner {
    type Error: std::error::Error + Send + Sync + 'static;

    fn signer_address(&self) -> EvmAddress;

    /// Sign the EIP-712 hash of `authorization`, returning `r || s || v`.
    fn sign_authorization(
        &self,
        authorization: &TransferWithAuthorization,
        asset_eip712_domain: &Eip712Domain,
    ) -> impl Future<Output = std::result::Result<[u8; 65], Self::Error>> + Send;
}

sol!(
    /// EIP-3009 `TransferWithAuthorization` struct
    ///
    /// For generating the EIP-712 signing hash
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

impl<S: AlloySigner + Send + Sync> AuthorizationSigner for S {
    type Error = AlloySignerError;

    fn signer_address(&self) -> EvmAddress {
        EvmAddress(AlloySigner::address(self))
    }

    async fn sign_authorization(
        &self,
        authorization: &TransferWithAuthorization,
        domain: &Eip712Domain,
    ) -> std::result::Result<[u8; 65], Self::Error> {
        let eip712_hash = authorization.eip712_signing_hash(domain);
        let signature = self.sign_hash(&eip712_hash).await?;

        Ok(signature.as_bytes())
    }
}

/// Builds signed USDC transfer authorizations. Performs no network I/O.
#[derive(Debug, Clone)]
pub struct EvmAuthorizationBuilder<S: AuthorizationSigner> {
    pub signer: S,
    /// Chain id of the active network, signed into the EIP-712 domain
    pub chain_id: u64,
}

impl<S: AuthorizationSigner> EvmAuthorizationBuilder<S> {
    pub fn new(signer: S, active_network: &str) -> Self {
        EvmAuthorizationBuilder {
            signer,
            chain_id: chain_id_for(active_network),
        }
    }

    pub fn address(&self) -> EvmAddress {
        self.signer.signer_address()
    }

    pub async fn build(&self, requirements: &PaymentRequirements) -> Result<EvmAuthorization> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        let deadline = now + AUTHORIZATION_VALIDITY_SECS;

        let nonce = match &requirements.nonce {
            Some(nonce) => nonce.parse::<Nonce>().map_err(|err| {
                Error::InvalidRequirements(format!("nonce '{nonce}': {err}"))
            })?,
            None => Nonce::random(),
        };

        let verifying_contract: EvmAddress = requirements.asset.parse().map_err(|err| {
            Error::InvalidRequirements(format!("asset '{}': {err}", requirements.asset))
        })?;

        let to = match &requirements.from {
            Some(from) => from
                .parse::<EvmAddress>()
                .map_err(|err| Error::InvalidRequirements(format!("from '{from}': {err}")))?,
            None => FALLBACK_PAY_TO,
        };

        let from = self.signer.signer_address();

        let domain = eip712_domain!(
            name: USDC_EIP712_DOMAIN.name,
            version: USDC_EIP712_DOMAIN.version,
            chain_id: self.chain_id,
            verifying_contract: verifying_contract.0,
        );

        let message = TransferWithAuthorization {
            from: from.0,
            to: to.0,
            value: U256::from(requirements.max_amount_required.0),
            validAfter: U256::ZERO,
            validBefore: U256::from(deadline),
            nonce: FixedBytes(nonce.0),
        };

        let signature = self
            .signer
            .sign_authorization(&message, &domain)
            .await
            .map_err(|err| Error::Signing(err.to_string()))?;

        Ok(EvmAuthorization {
            from,
            to,
            value: requirements.max_amount_required,
            nonce,
            deadline,
            signature: SignatureParts::from_bytes(&signature),
        })
    }
}
