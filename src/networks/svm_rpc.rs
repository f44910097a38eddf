//! The subset of Solana JSON-RPC the payment executor relies on.
//!
//! [`SolanaRpc`] is implemented for the nonblocking [`RpcClient`]; tests and
//! custom deployments can plug in their own node access.

use std::time::Duration;

use solana_commitment_config::CommitmentConfig;
use solana_program_pack::Pack;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::client_error::Error as ClientError;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Chain access needed to execute and verify a token payment.
pub trait SolanaRpc: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a connection to the given RPC endpoint at `confirmed` commitment.
    fn connect(url: &str) -> Self
    where
        Self: Sized;

    /// Token balance of an SPL token account, `None` if the account does not exist.
    fn token_account_balance(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send;

    /// Latest blockhash and the last block height at which it is valid.
    fn latest_blockhash(&self) -> impl Future<Output = Result<(Hash, u64), Self::Error>> + Send;

    /// Broadcast a fully signed transaction and wait until it is confirmed.
    fn send_and_confirm(
        &self,
        transaction: &Transaction,
    ) -> impl Future<Output = Result<Signature, Self::Error>> + Send;

    /// Wait until an already broadcast transaction is confirmed.
    ///
    /// Fails once the chain passes `last_valid_block_height` without the signature landing.
    fn confirm_signature(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// `Some(true)` if the transaction landed without error, `Some(false)` if it
    /// landed with an error, `None` if it is not visible.
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum SolanaRpcError {
    #[error("RPC client error: {0}")]
    Client(#[from] ClientError),
    #[error("Invalid token account data at {0}")]
    InvalidAccountData(Pubkey),
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },
    #[error("Blockhash expired before transaction {0} was confirmed")]
    BlockhashExpired(Signature),
}

impl SolanaRpc for RpcClient {
    type Error = SolanaRpcError;

    fn connect(url: &str) -> Self {
        RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed())
    }

    async fn token_account_balance(&self, address: &Pubkey) -> Result<Option<u64>, Self::Error> {
        let account = self
            .get_account_with_commitment(address, self.commitment())
            .await?
            .value;

        let Some(account) = account else {
            return Ok(None);
        };

        let token_account = spl_token::state::Account::unpack(&account.data)
            .map_err(|_| SolanaRpcError::InvalidAccountData(*address))?;

        Ok(Some(token_account.amount))
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64), Self::Error> {
        let latest = self
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?;
        Ok(latest)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, Self::Error> {
        let signature = self.send_and_confirm_transaction(transaction).await?;
        Ok(signature)
    }

    async fn confirm_signature(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), Self::Error> {
        loop {
            let status = self
                .get_signature_status_with_commitment(signature, self.commitment())
                .await?;

            if let Some(result) = status {
                return result.map_err(|err| SolanaRpcError::TransactionFailed {
                    signature: *signature,
                    reason: err.to_string(),
                });
            }

            if self.get_block_height().await? > last_valid_block_height {
                return Err(SolanaRpcError::BlockhashExpired(*signature));
            }

            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<bool>, Self::Error> {
        let status = self
            .get_signature_status_with_commitment_and_history(signature, self.commitment(), true)
            .await?;
        Ok(status.map(|result| result.is_ok()))
    }
}
