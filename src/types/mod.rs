//! Common re-usable types for the X402 client.

mod amount;

pub use amount::*;
