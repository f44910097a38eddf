use std::{str::FromStr, time::SystemTime};

use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::{
    errors::{Error, Result, UsdcAmount},
    networks::{SolanaNetwork, svm_rpc::SolanaRpc},
    schemes::exact_svm::{SolanaAuthorization, SolanaSigner},
    types::AmountValue,
};

/// Pays USDC on a Solana cluster by broadcasting an SPL token transfer.
///
/// Unlike the EVM scheme the payment is final once this returns: the header
/// only carries the signature of a transfer that already landed.
#[derive(Debug)]
pub struct SolanaPaymentExecutor<R: SolanaRpc> {
    pub rpc: R,
    pub network: SolanaNetwork,
    pub debug: bool,
}

impl<R: SolanaRpc> SolanaPaymentExecutor<R> {
    pub fn new(rpc: R, network: SolanaNetwork) -> Self {
        SolanaPaymentExecutor {
            rpc,
            network,
            debug: false,
        }
    }

    /// Connect to `rpc_url`, or the cluster's public endpoint when `None`.
    pub fn connect(network: SolanaNetwork, rpc_url: Option<&str>) -> Self {
        let url = rpc_url.unwrap_or(network.default_rpc_url());
        Self::new(R::connect(url), network)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub async fn execute_payment(
        &self,
        amount: u64,
        receiver: &str,
        wallet: Option<&SolanaSigner>,
    ) -> Result<SolanaAuthorization> {
        let wallet = wallet.ok_or_else(|| {
            Error::Configuration("Solana wallet not connected".to_string())
        })?;
        let sender = wallet.pubkey();
        let receiver_key = Pubkey::from_str(receiver).map_err(|err| {
            Error::InvalidRequirements(format!("receiver '{receiver}': {err}"))
        })?;

        let mint = self.network.usdc_mint();
        let sender_ata = get_associated_token_address(&sender, &mint);
        let receiver_ata = get_associated_token_address(&receiver_key, &mint);

        let have = self
            .rpc
            .token_account_balance(&sender_ata)
            .await
            .map_err(|err| Error::PaymentExecution(err.to_string()))?
            .ok_or_else(|| Error::AccountNotFound(sender.to_string()))?;

        debug_step!(
            self.debug,
            network = %self.network,
            %sender,
            balance = have,
            amount,
            "Checked sender USDC balance"
        );

        if have < amount {
            return Err(Error::InsufficientFunds {
                have: UsdcAmount(have),
                need: UsdcAmount(amount),
            });
        }

        let mut instructions: Vec<Instruction> = Vec::with_capacity(2);

        let receiver_exists = self
            .rpc
            .token_account_balance(&receiver_ata)
            .await
            .map_err(|err| Error::PaymentExecution(err.to_string()))?
            .is_some();
        if !receiver_exists {
            debug_step!(
                self.debug,
                %receiver_ata,
                "Receiver token account missing, creating it"
            );
            instructions.push(create_associated_token_account_idempotent(
                &sender,
                &receiver_key,
                &mint,
                &spl_token::id(),
            ));
        }

        instructions.push(
            spl_token::instruction::transfer(
                &spl_token::id(),
                &sender_ata,
                &receiver_ata,
                &sender,
                &[],
                amount,
            )
            .map_err(|err| Error::PaymentExecution(err.to_string()))?,
        );

        let (blockhash, last_valid_block_height) = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|err| Error::PaymentExecution(err.to_string()))?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&sender));

        let signature = match wallet {
            SolanaSigner::Browser(signer) => {
                transaction.message.recent_blockhash = blockhash;
                let signature = signer
                    .sign_and_send_transaction(transaction)
                    .await
                    .map_err(|err| Error::PaymentExecution(err.to_string()))?;
                self.rpc
                    .confirm_signature(&signature, last_valid_block_height)
                    .await
                    .map_err(|err| Error::PaymentExecution(err.to_string()))?;
                signature
            }
            SolanaSigner::LocalKeypair(keypair) => {
                transaction
                    .try_sign(&[keypair.as_ref()], blockhash)
                    .map_err(|err| Error::PaymentExecution(err.to_string()))?;
                self.rpc
                    .send_and_confirm(&transaction)
                    .await
                    .map_err(|err| Error::PaymentExecution(err.to_string()))?
            }
        };

        debug_step!(self.debug, %signature, "USDC transfer confirmed");

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_millis() as u64;

        Ok(SolanaAuthorization {
            network: self.network,
            signature: signature.to_string(),
            from: sender.to_string(),
            to: receiver.to_string(),
            amount: AmountValue::from(amount),
            timestamp,
            confirmed: true,
        })
    }

    /// Whether `signature` names a transaction that landed without error.
    pub async fn verify_payment(&self, signature: &str) -> bool {
        let Ok(signature) = Signature::from_str(signature) else {
            return false;
        };
        matches!(self.rpc.signature_status(&signature).await, Ok(Some(true)))
    }

    /// USDC balance of `owner` in micro-units; 0 if it has no token account.
    pub async fn token_balance(&self, owner: &str) -> Result<u64> {
        let owner = Pubkey::from_str(owner)
            .map_err(|err| Error::InvalidRequirements(format!("owner '{owner}': {err}")))?;
        let ata = get_associated_token_address(&owner, &self.network.usdc_mint());

        let balance = self
            .rpc
            .token_account_balance(&ata)
            .await
            .map_err(|err| Error::PaymentExecution(err.to_string()))?;

        Ok(balance.unwrap_or(0))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use futures_util::future::BoxFuture;
    use solana_sdk::{hash::Hash, signature::Keypair, signer::Signer};

    use super::*;
    use crate::schemes::exact_svm::{BoxError, ExternalSolanaSigner, WalletHandle};

    #[derive(Debug, thiserror::Error)]
    #[error("mock rpc: {0}")]
    pub struct MockRpcError(pub String);

    #[derive(Debug, Default)]
    pub struct MockRpcState {
        pub balances: HashMap<Pubkey, u64>,
        pub sent: Vec<Transaction>,
        pub confirmed: Vec<Signature>,
        pub statuses: HashMap<Signature, bool>,
        pub fail_send: bool,
    }

    /// In-memory chain for executor tests.
    #[derive(Debug, Default, Clone)]
    pub struct MockRpc {
        pub state: Arc<Mutex<MockRpcState>>,
    }

    impl MockRpc {
        pub fn with_balance(owner: &Pubkey, network: SolanaNetwork, amount: u64) -> Self {
            let rpc = MockRpc::default();
            let ata = get_associated_token_address(owner, &network.usdc_mint());
            rpc.state.lock().unwrap().balances.insert(ata, amount);
            rpc
        }
    }

    impl SolanaRpc for MockRpc {
        type Error = MockRpcError;

        fn connect(_url: &str) -> Self {
            MockRpc::default()
        }

        async fn token_account_balance(
            &self,
            address: &Pubkey,
        ) -> std::result::Result<Option<u64>, Self::Error> {
            Ok(self.state.lock().unwrap().balances.get(address).copied())
        }

        async fn latest_blockhash(&self) -> std::result::Result<(Hash, u64), Self::Error> {
            Ok((Hash::new_from_array([7u8; 32]), 1_000))
        }

        async fn send_and_confirm(
            &self,
            transaction: &Transaction,
        ) -> std::result::Result<Signature, Self::Error> {
            let mut state = self.state.lock().unwrap();
            if state.fail_send {
                return Err(MockRpcError("node unavailable".to_string()));
            }
            state.sent.push(transaction.clone());
            Ok(transaction.signatures[0])
        }

        async fn confirm_signature(
            &self,
            signature: &Signature,
            _last_valid_block_height: u64,
        ) -> std::result::Result<(), Self::Error> {
            self.state.lock().unwrap().confirmed.push(*signature);
            Ok(())
        }

        async fn signature_status(
            &self,
            signature: &Signature,
        ) -> std::result::Result<Option<bool>, Self::Error> {
            Ok(self.state.lock().unwrap().statuses.get(signature).copied())
        }
    }

    struct MockBrowserWallet {
        keypair: Keypair,
        received: Mutex<Vec<Transaction>>,
    }

    impl ExternalSolanaSigner for MockBrowserWallet {
        fn pubkey(&self) -> Pubkey {
            self.keypair.pubkey()
        }

        fn sign_and_send_transaction(
            &self,
            mut transaction: Transaction,
        ) -> BoxFuture<'_, std::result::Result<Signature, BoxError>> {
            Box::pin(async move {
                let blockhash = transaction.message.recent_blockhash;
                transaction.try_sign(&[&self.keypair], blockhash)?;
                let signature = transaction.signatures[0];
                self.received.lock().unwrap().push(transaction);
                Ok(signature)
            })
        }
    }

    fn local_signer(keypair: Keypair) -> SolanaSigner {
        SolanaSigner::try_from(WalletHandle::from(keypair)).unwrap()
    }

    #[tokio::test]
    async fn test_insufficient_funds_broadcasts_nothing() {
        let keypair = Keypair::new();
        let rpc = MockRpc::with_balance(&keypair.pubkey(), SolanaNetwork::Devnet, 5_000);
        let executor = SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Devnet);

        let err = executor
            .execute_payment(
                10_000,
                &Pubkey::new_unique().to_string(),
                Some(&local_signer(keypair)),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Insufficient USDC balance. Have: 0.005 USDC, Need: 0.01 USDC"
        );
        assert!(rpc.state.lock().unwrap().sent.is_empty());
    }

    #[tokio::test]
    async fn test_missing_sender_account() {
        let rpc = MockRpc::default();
        let executor = SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Mainnet);

        let err = executor
            .execute_payment(
                10_000,
                &Pubkey::new_unique().to_string(),
                Some(&local_signer(Keypair::new())),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountNotFound(_)));
        assert!(rpc.state.lock().unwrap().sent.is_empty());
    }

    #[tokio::test]
    async fn test_missing_wallet_is_configuration_error() {
        let executor = SolanaPaymentExecutor::new(MockRpc::default(), SolanaNetwork::Devnet);
        let err = executor
            .execute_payment(10_000, &Pubkey::new_unique().to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_creates_receiver_account_when_missing() {
        let keypair = Keypair::new();
        let sender = keypair.pubkey();
        let receiver = Pubkey::new_unique();
        let rpc = MockRpc::with_balance(&sender, SolanaNetwork::Devnet, 50_000);
        let executor = SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Devnet);

        let authorization = executor
            .execute_payment(10_000, &receiver.to_string(), Some(&local_signer(keypair)))
            .await
            .unwrap();

        let state = rpc.state.lock().unwrap();
        assert_eq!(state.sent.len(), 1);
        let transaction = &state.sent[0];
        assert_eq!(transaction.message.instructions.len(), 2);
        assert_eq!(transaction.message.account_keys[0], sender);
        assert_eq!(authorization.signature, transaction.signatures[0].to_string());

        assert_eq!(authorization.network, SolanaNetwork::Devnet);
        assert_eq!(authorization.from, sender.to_string());
        assert_eq!(authorization.to, receiver.to_string());
        assert_eq!(authorization.amount, AmountValue(10_000));
        assert!(authorization.confirmed);
    }

    #[tokio::test]
    async fn test_existing_receiver_account_transfers_only() {
        let keypair = Keypair::new();
        let receiver = Pubkey::new_unique();
        let rpc = MockRpc::with_balance(&keypair.pubkey(), SolanaNetwork::Mainnet, 10_000);
        let receiver_ata =
            get_associated_token_address(&receiver, &SolanaNetwork::Mainnet.usdc_mint());
        rpc.state.lock().unwrap().balances.insert(receiver_ata, 0);
        let executor = SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Mainnet);

        executor
            .execute_payment(10_000, &receiver.to_string(), Some(&local_signer(keypair)))
            .await
            .unwrap();

        let state = rpc.state.lock().unwrap();
        assert_eq!(state.sent[0].message.instructions.len(), 1);
    }

    #[tokio::test]
    async fn test_browser_wallet_signs_and_sends() {
        let keypair = Keypair::new();
        let rpc = MockRpc::with_balance(&keypair.pubkey(), SolanaNetwork::Devnet, 10_000);
        let wallet = Arc::new(MockBrowserWallet {
            keypair,
            received: Mutex::new(Vec::new()),
        });
        let signer =
            SolanaSigner::try_from(WalletHandle::External(wallet.clone())).unwrap();
        let executor = SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Devnet);

        let authorization = executor
            .execute_payment(10_000, &Pubkey::new_unique().to_string(), Some(&signer))
            .await
            .unwrap();

        assert_eq!(wallet.received.lock().unwrap().len(), 1);
        let state = rpc.state.lock().unwrap();
        assert!(state.sent.is_empty());
        assert_eq!(state.confirmed.len(), 1);
        assert_eq!(authorization.signature, state.confirmed[0].to_string());
    }

    #[tokio::test]
    async fn test_send_failure_is_payment_execution_error() {
        let keypair = Keypair::new();
        let rpc = MockRpc::with_balance(&keypair.pubkey(), SolanaNetwork::Devnet, 10_000);
        rpc.state.lock().unwrap().fail_send = true;
        let executor = SolanaPaymentExecutor::new(rpc, SolanaNetwork::Devnet);

        let err = executor
            .execute_payment(
                10_000,
                &Pubkey::new_unique().to_string(),
                Some(&local_signer(keypair)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PaymentExecution(_)));
    }

    #[tokio::test]
    async fn test_verify_payment() {
        let rpc = MockRpc::default();
        let landed = Signature::from([1u8; 64]);
        let failed = Signature::from([2u8; 64]);
        {
            let mut state = rpc.state.lock().unwrap();
            state.statuses.insert(landed, true);
            state.statuses.insert(failed, false);
        }
        let executor = SolanaPaymentExecutor::new(rpc, SolanaNetwork::Devnet);

        assert!(executor.verify_payment(&landed.to_string()).await);
        assert!(!executor.verify_payment(&failed.to_string()).await);
        assert!(!executor.verify_payment(&Signature::from([3u8; 64]).to_string()).await);
        assert!(!executor.verify_payment("not-a-signature").await);
    }

    #[tokio::test]
    async fn test_token_balance_defaults_to_zero() {
        let owner = Pubkey::new_unique();
        let rpc = MockRpc::with_balance(&owner, SolanaNetwork::Devnet, 42);
        let executor = SolanaPaymentExecutor::new(rpc, SolanaNetwork::Devnet);

        assert_eq!(executor.token_balance(&owner.to_string()).await.unwrap(), 42);
        assert_eq!(
            executor
                .token_balance(&Pubkey::new_unique().to_string())
                .await
                .unwrap(),
            0
        );
    }
}
