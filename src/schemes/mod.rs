//! Payment schemes: `exact` over EIP-3009 on EVM chains and over SPL token
//! transfers on Solana.

pub mod exact_evm;
pub mod exact_evm_signer;
pub mod exact_svm;
pub mod exact_svm_executor;
