use bytes::Bytes;

/// Error types for X402 client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A signing key, wallet, or chain connection required for the payment is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The 402 response offered no usable payment requirements.
    #[error("No payment requirements found in 402 response")]
    NoPaymentOptions,

    /// A selected payment requirement carries a field that cannot be used.
    #[error("Invalid payment requirements: {0}")]
    InvalidRequirements(String),

    /// The network identifier is not one of the known networks.
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The sender holds fewer tokens than the payment requires.
    #[error("Insufficient USDC balance. Have: {have} USDC, Need: {need} USDC")]
    InsufficientFunds { have: UsdcAmount, need: UsdcAmount },

    /// The sender has never held the payment token.
    #[error("No USDC token account found for {0}. Please ensure you have USDC in your wallet.")]
    AccountNotFound(String),

    /// Producing the EIP-712 signature failed.
    #[error("Signer error: {0}")]
    Signing(String),

    /// The system clock is before the unix epoch.
    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),

    /// The wallet handle cannot sign transactions.
    #[error("Unsupported wallet type: {0}")]
    UnsupportedWallet(String),

    /// The on-chain transfer failed to broadcast or confirm.
    ///
    /// The transfer may still have landed; retrying the whole operation can double pay.
    #[error("Payment execution failed: {0}")]
    PaymentExecution(String),

    /// The server answered the paid retry with another 402.
    #[error("Payment rejected: server responded 402 to the paid retry")]
    PaymentRejected(Box<http::Response<Bytes>>),

    /// The underlying HTTP transport failed.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A typed API call returned a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: http::StatusCode, body: String },

    /// The model identifier is not in the registry.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Building an outgoing HTTP request failed.
    #[error("HTTP request build error: {0}")]
    HttpBuild(#[from] http::Error),

    /// URL parsing errors.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization errors.
    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Base64 encoding/decoding errors.
    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    /// UTF-8 decoding errors.
    #[error("UTF-8 decode error: {0}")]
    Utf8DecodeError(#[from] std::string::FromUtf8Error),
}

/// A token amount in micro-units, displayed in whole USDC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcAmount(pub u64);

impl std::fmt::Display for UsdcAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 1_000_000;
        let frac = self.0 % 1_000_000;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let frac = format!("{frac:06}");
            write!(f, "{whole}.{}", frac.trim_end_matches('0'))
        }
    }
}

/// A specialized `Result` type for X402 client operations.
pub type Result<T> = std::result::Result<T, Error>;
