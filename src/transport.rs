//! Wire types of the x402 exchange: the 402 challenge body and the `X-PAYMENT` header.

use std::fmt::Display;

use base64::{Engine, prelude::BASE64_STANDARD};
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    networks::NetworkFamily,
    schemes::{exact_evm::EvmAuthorization, exact_svm::SolanaAuthorization},
    types::AmountValue,
};

/// Request header carrying the encoded payment authorization.
pub const X_PAYMENT: HeaderName = HeaderName::from_static("x-payment");

/// One payment option offered by the server in a 402 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Network name, e.g. `base` or `solana-devnet`
    pub network: String,
    /// Maximum amount required for the payment in smallest units
    pub max_amount_required: AmountValue,
    /// Token contract address or mint
    pub asset: String,
    /// Receiver address
    pub pay_to: String,
    /// Destination override for EVM authorizations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_duration: Option<u64>,
    /// Pre-agreed EIP-3009 nonce, 0x-prefixed 32-byte hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
}

impl PaymentRequirements {
    pub fn network_family(&self) -> NetworkFamily {
        NetworkFamily::classify(&self.network)
    }

    /// Read one raw `accepts` entry.
    pub fn from_entry(entry: &serde_json::Value) -> Result<Self> {
        PaymentRequirements::deserialize(entry).map_err(|err| {
            let network = entry
                .get("network")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<missing>");
            Error::InvalidRequirements(format!("payment option for '{network}': {err}"))
        })
    }
}

/// Body of a 402 Payment Required response.
///
/// Entries of `accepts` stay raw until one is chosen, so an option this client
/// cannot read does not hide the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub accepts: Vec<serde_json::Value>,
}

/// Proof of payment attached to the retried request.
///
/// The EVM variant is an off-chain signature nothing has broadcast yet; the
/// Solana variant describes a transfer that already landed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentAuthorization {
    Evm(EvmAuthorization),
    Solana(SolanaAuthorization),
}

impl PaymentAuthorization {
    pub fn network_family(&self) -> NetworkFamily {
        match self {
            PaymentAuthorization::Evm(_) => NetworkFamily::Evm,
            PaymentAuthorization::Solana(_) => NetworkFamily::Solana,
        }
    }

    pub fn encode(&self) -> Result<EncodedPaymentHeader> {
        EncodedPaymentHeader::try_from(self)
    }
}

impl From<EvmAuthorization> for PaymentAuthorization {
    fn from(value: EvmAuthorization) -> Self {
        PaymentAuthorization::Evm(value)
    }
}

impl From<SolanaAuthorization> for PaymentAuthorization {
    fn from(value: SolanaAuthorization) -> Self {
        PaymentAuthorization::Solana(value)
    }
}

/// Base64 encoded JSON of a [`PaymentAuthorization`], the `X-PAYMENT` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPaymentHeader(pub String);

impl EncodedPaymentHeader {
    pub fn decode(&self) -> Result<PaymentAuthorization> {
        let decoded_bytes = BASE64_STANDARD.decode(&self.0)?;
        let json_str = String::from_utf8(decoded_bytes)?;
        let authorization = serde_json::from_str(&json_str)?;
        Ok(authorization)
    }

    pub fn header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.0)
            .map_err(|err| Error::InvalidRequirements(format!("invalid header value: {err}")))
    }
}

impl Display for EncodedPaymentHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&PaymentAuthorization> for EncodedPaymentHeader {
    type Error = Error;

    fn try_from(value: &PaymentAuthorization) -> Result<Self> {
        let json = serde_json::to_string(value)?;
        Ok(EncodedPaymentHeader(BASE64_STANDARD.encode(json)))
    }
}
