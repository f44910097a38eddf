//! # x402 LLM Kit
//!
//! A client for pay-per-request HTTP APIs speaking the x402 protocol.
//!
//! When a server answers `402 Payment Required`, the client picks one of the
//! payment options it offers, produces proof of payment and replays the request
//! once with an `X-PAYMENT` header.
//!
//! - On EVM networks (`base`, `base-testnet`) the proof is an EIP-3009
//!   `TransferWithAuthorization` signed as EIP-712 typed data. Nothing is broadcast.
//! - On Solana (`solana`, `solana-devnet`) the client broadcasts an SPL USDC
//!   transfer, waits for confirmation, and sends the transaction signature.
//!
//! ## Example
//!
//! ```no_run
//! use x402_llm_kit::{
//!     client::X402Client, config::ClientConfig, llm::ChatOptions, models::ModelId,
//!     networks::Network,
//! };
//!
//! # async fn run() -> x402_llm_kit::errors::Result<()> {
//! let client = X402Client::new(
//!     ClientConfig::builder()
//!         .private_key("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
//!         .network(Network::BASE)
//!         .build(),
//! )?;
//!
//! let reply = client
//!     .chat(ModelId::Qwen, "Write a haiku about Rust", ChatOptions::default())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit protocol diagnostics through [`tracing`]. Step-by-step
//!   debug events are only emitted when [`config::ClientConfig::debug`] is set.
//! - `reqwest-transport`: the default [`transports::ReqwestTransport`].

/// Debug event for one protocol step, emitted only when `$enabled` is true.
#[cfg(feature = "tracing")]
macro_rules! debug_step {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!($($arg)+);
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_step {
    ($enabled:expr, $($arg:tt)+) => {
        let _ = &$enabled;
    };
}

pub mod client;
pub mod config;
pub mod errors;
pub mod handler;
pub mod llm;
pub mod models;
pub mod networks;
pub mod schemes;
pub mod selector;
pub mod transport;
pub mod transports;
pub mod types;
