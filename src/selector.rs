//! Choosing one payment option out of a 402 response.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    errors::{Error, Result},
    transport::{PaymentRequiredBody, PaymentRequirements},
};

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// An entry for the active network was offered.
    Matched(PaymentRequirements),
    /// Nothing matched the active network; the first entry was taken instead.
    Fallback {
        requirements: PaymentRequirements,
        requested: String,
    },
}

impl Selection {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Selection::Fallback { .. })
    }

    pub fn requirements(&self) -> &PaymentRequirements {
        match self {
            Selection::Matched(requirements) => requirements,
            Selection::Fallback { requirements, .. } => requirements,
        }
    }

    pub fn into_requirements(self) -> PaymentRequirements {
        match self {
            Selection::Matched(requirements) => requirements,
            Selection::Fallback { requirements, .. } => requirements,
        }
    }
}

/// Select requirements from a raw 402 response body.
pub fn select(body: &[u8], active_network: &str) -> Result<Selection> {
    let body: PaymentRequiredBody =
        serde_json::from_slice(body).map_err(|_| Error::NoPaymentOptions)?;
    select_from_accepts(&body.accepts, active_network)
}

/// Select requirements from an already parsed 402 response body.
pub fn select_from_value(body: &Value, active_network: &str) -> Result<Selection> {
    let body = PaymentRequiredBody::deserialize(body).map_err(|_| Error::NoPaymentOptions)?;
    select_from_accepts(&body.accepts, active_network)
}

/// Prefer the entry for `active_network`, else the first one offered.
///
/// Only the chosen entry is parsed; the others may be in any shape.
pub fn select_from_accepts(accepts: &[Value], active_network: &str) -> Result<Selection> {
    let matched = accepts
        .iter()
        .find(|entry| entry.get("network").and_then(Value::as_str) == Some(active_network));
    if let Some(entry) = matched {
        return PaymentRequirements::from_entry(entry).map(Selection::Matched);
    }

    let requirements =
        PaymentRequirements::from_entry(accepts.first().ok_or(Error::NoPaymentOptions)?)?;

    #[cfg(feature = "tracing")]
    tracing::warn!(
        requested = active_network,
        offered = %requirements.network,
        "No payment option for the active network, using the first one offered"
    );

    Ok(Selection::Fallback {
        requirements,
        requested: active_network.to_string(),
    })
}
