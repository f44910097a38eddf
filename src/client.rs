//! The paying HTTP client.
//!
//! Every request goes out unpaid first. A `402 Payment Required` answer is
//! turned into an `X-PAYMENT` header and the request is replayed exactly once.

use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use bytes::Bytes;
use http::{Method, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use url::Url;

use crate::{
    config::ClientConfig,
    errors::{Error, Result},
    handler::PaymentHandler,
    llm::{ChatOptions, LlmRequest, LlmResponse},
    models::{CostEstimate, MODELS, ModelId, ModelInfo},
    networks::{Network, NetworkFamily, svm_rpc::SolanaRpc},
    schemes::{exact_svm::WalletHandle, exact_svm_executor::SolanaPaymentExecutor},
    selector::select,
    transport::{EncodedPaymentHeader, X_PAYMENT},
    transports::HttpTransport,
};

#[cfg(feature = "reqwest-transport")]
use crate::transports::ReqwestTransport;

/// A wallet attached to a session.
#[derive(Debug, Clone)]
pub struct ConnectedWallet {
    pub address: String,
    pub network: Network,
    /// `None` for EVM sessions, which always pay with the configured key.
    pub handle: Option<WalletHandle>,
}

/// Everything a payment needs, fixed for the lifetime of the value.
///
/// Connecting, disconnecting and switching networks produce a new session.
pub struct ClientSession<R: SolanaRpc = RpcClient> {
    handler: PaymentHandler<PrivateKeySigner, R>,
    connected_wallet: Option<ConnectedWallet>,
}

impl<R: SolanaRpc> Clone for ClientSession<R> {
    fn clone(&self) -> Self {
        ClientSession {
            handler: self.handler.clone(),
            connected_wallet: self.connected_wallet.clone(),
        }
    }
}

impl<R: SolanaRpc> ClientSession<R> {
    pub fn new(handler: PaymentHandler<PrivateKeySigner, R>) -> Self {
        ClientSession {
            handler,
            connected_wallet: None,
        }
    }

    /// Build a session for `network` without any wallet attached.
    ///
    /// A Solana RPC connection is only opened for Solana networks.
    pub fn for_network(config: &ClientConfig, network: Network) -> Result<Self> {
        let evm_signer = config
            .private_key
            .as_deref()
            .map(|key| {
                key.parse::<PrivateKeySigner>()
                    .map_err(|err| Error::Configuration(format!("invalid private key: {err}")))
            })
            .transpose()?;

        let solana = match network {
            Network::Solana(cluster) => Some(Arc::new(
                SolanaPaymentExecutor::<R>::connect(cluster, config.solana_rpc_url.as_deref())
                    .with_debug(config.debug),
            )),
            Network::Evm(_) => None,
        };

        let handler = PaymentHandler::new(network, evm_signer, solana).with_debug(config.debug);
        Ok(ClientSession::new(handler))
    }

    /// Session for the configured network, with the configured Solana wallet
    /// connected when there is one.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let session = Self::for_network(config, config.network)?;
        match (&config.solana_wallet, config.network.family()) {
            (Some(handle), NetworkFamily::Solana) => session.connect_wallet(Some(handle.clone())),
            _ => Ok(session),
        }
    }

    pub fn network(&self) -> Network {
        self.handler.active_network()
    }

    pub fn handler(&self) -> &PaymentHandler<PrivateKeySigner, R> {
        &self.handler
    }

    pub fn connected_wallet(&self) -> Option<&ConnectedWallet> {
        self.connected_wallet.as_ref()
    }

    pub fn connect_wallet(&self, handle: Option<WalletHandle>) -> Result<Self> {
        let mut session = self.clone();
        let network = session.network();

        let address = match (network.family(), handle.clone()) {
            (_, Some(handle)) => session.handler.connect_wallet(handle)?,
            (NetworkFamily::Evm, None) => session.handler.address().ok_or_else(|| {
                Error::Configuration("no signing key for EVM network".to_string())
            })?,
            (NetworkFamily::Solana, None) => {
                return Err(Error::Configuration(
                    "no Solana wallet to connect".to_string(),
                ));
            }
        };

        session.connected_wallet = Some(ConnectedWallet {
            address,
            network,
            handle: handle.filter(|_| network.is_solana()),
        });
        Ok(session)
    }

    pub fn disconnect_wallet(&self) -> Self {
        let mut session = self.clone();
        session.handler.disconnect_wallet();
        session.connected_wallet = None;
        session
    }
}

/// Response of the hosted balance endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub balance: String,
    pub formatted: String,
}

/// Where one call is in the x402 exchange.
enum CallState {
    /// Nothing paid yet. Holds a copy of the request for the paid replay.
    Unpaid { replay: http::Request<Bytes> },
    /// The replay carrying `X-PAYMENT` is in flight.
    Paid,
}

/// HTTP client that pays for `402 Payment Required` responses.
pub struct X402Client<T: HttpTransport, R: SolanaRpc = RpcClient> {
    transport: T,
    config: ClientConfig,
    session: ClientSession<R>,
}

#[cfg(feature = "reqwest-transport")]
impl X402Client<ReqwestTransport> {
    /// Client over a default [`reqwest::Client`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        X402Client::with_transport(ReqwestTransport::default(), config)
    }
}

impl<T: HttpTransport, R: SolanaRpc> X402Client<T, R> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Result<Self> {
        let session = ClientSession::from_config(&config)?;
        Ok(X402Client {
            transport,
            config,
            session,
        })
    }

    /// Client with a prepared session, e.g. one over a custom RPC connection.
    pub fn with_session(transport: T, config: ClientConfig, session: ClientSession<R>) -> Self {
        X402Client {
            transport,
            config,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &ClientSession<R> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request`, paying and replaying it once if the server answers 402.
    pub async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let mut state = CallState::Unpaid {
            replay: clone_request(&request),
        };
        let mut next = request;

        loop {
            let response = self
                .transport
                .send(next)
                .await
                .map_err(|err| Error::Transport(Box::new(err)))?;

            if response.status() != StatusCode::PAYMENT_REQUIRED {
                return Ok(response);
            }

            match state {
                CallState::Paid => {
                    debug_step!(self.config.debug, "Server rejected the payment with another 402");
                    return Err(Error::PaymentRejected(Box::new(response)));
                }
                CallState::Unpaid { mut replay } => {
                    debug_step!(self.config.debug, "Received 402 Payment Required");

                    let header = self.pay(response.body()).await.inspect_err(|_err| {
                        debug_step!(self.config.debug, error = %_err, "Payment failed");
                    })?;

                    replay.headers_mut().insert(X_PAYMENT, header.header_value()?);
                    next = replay;
                    state = CallState::Paid;
                }
            }
        }
    }

    async fn pay(&self, body: &Bytes) -> Result<EncodedPaymentHeader> {
        let selection = select(body, self.session.network().name())?;
        let requirements = selection.requirements();

        debug_step!(
            self.config.debug,
            network = %requirements.network,
            fallback = selection.is_fallback(),
            "Using {} network for payment",
            requirements.network
        );

        let header = self.session.handler.create_header(requirements).await?;

        debug_step!(self.config.debug, "Created payment header, retrying request");

        Ok(header)
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?)
    }

    async fn request_json<Res: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Res> {
        let mut builder = http::Request::builder()
            .method(method)
            .uri(self.url(path)?.as_str());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder.body(body.unwrap_or_default())?;

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status(),
                body: String::from_utf8_lossy(response.body()).into_owned(),
            });
        }

        Ok(serde_json::from_slice(response.body())?)
    }

    /// POST `request` to the model's completion endpoint.
    pub async fn query(&self, model: ModelId, request: &LlmRequest) -> Result<LlmResponse> {
        let info = model.info();

        debug_step!(
            self.config.debug,
            "Querying {} at {}",
            info.name,
            info.endpoint
        );

        let body = Bytes::from(serde_json::to_vec(request)?);
        self.request_json(Method::POST, info.endpoint, Some(body))
            .await
    }

    /// Send a single user message and return the first reply, empty if there is none.
    pub async fn chat(
        &self,
        model: ModelId,
        message: impl Into<String>,
        options: ChatOptions,
    ) -> Result<String> {
        let response = self.query(model, &options.request(message)).await?;
        Ok(response.first_content().to_string())
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        &MODELS
    }

    pub fn model(&self, id: &str) -> Result<&'static ModelInfo> {
        Ok(id.parse::<ModelId>()?.info())
    }

    pub fn estimate_cost(&self, model: ModelId) -> CostEstimate {
        CostEstimate::from(model.info())
    }

    /// The connected wallet's address, else the address of the EVM signing key.
    pub fn wallet_address(&self) -> Option<String> {
        match &self.session.connected_wallet {
            Some(wallet) => Some(wallet.address.clone()),
            None => self
                .session
                .handler
                .evm_builder()
                .map(|evm| evm.address().to_string()),
        }
    }

    fn resolve_address(&self, address: Option<&str>) -> Result<String> {
        address
            .map(str::to_string)
            .or_else(|| self.wallet_address())
            .ok_or_else(|| {
                Error::Configuration("No wallet address provided or configured".to_string())
            })
    }

    /// USDC balance as reported by the hosted API.
    pub async fn check_balance(&self, address: Option<&str>) -> Result<BalanceInfo> {
        let address = self.resolve_address(address)?;
        self.request_json(Method::GET, &format!("/api/x402/balance/{address}"), None)
            .await
            .inspect_err(|_err| {
                debug_step!(self.config.debug, error = %_err, "Balance check failed");
            })
    }

    /// On-chain USDC balance in micro-units, 0 for an address that never held USDC.
    pub async fn check_solana_balance(&self, address: Option<&str>) -> Result<u64> {
        let executor = self.session.handler.solana_executor().ok_or_else(|| {
            Error::Configuration("Solana handler not initialized".to_string())
        })?;
        let address = self.resolve_address(address)?;
        executor.token_balance(&address).await
    }

    pub fn connect_wallet(&mut self, handle: Option<WalletHandle>) -> Result<&ConnectedWallet> {
        self.session = self.session.connect_wallet(handle)?;
        let wallet = self.session.connected_wallet.as_ref().ok_or_else(|| {
            Error::Configuration("wallet connection did not complete".to_string())
        })?;

        debug_step!(
            self.config.debug,
            address = %wallet.address,
            network = %wallet.network,
            "Connected wallet"
        );

        Ok(wallet)
    }

    pub fn disconnect_wallet(&mut self) {
        self.session = self.session.disconnect_wallet();
    }

    pub fn is_wallet_connected(&self) -> bool {
        self.session.connected_wallet.is_some()
    }

    pub fn connected_wallet(&self) -> Option<&ConnectedWallet> {
        self.session.connected_wallet()
    }

    pub fn network(&self) -> Network {
        self.session.network()
    }

    pub fn supports_network(&self, network: &str) -> bool {
        self.session.handler.supports_network(network)
    }

    /// Move to `network`. Any connected wallet is dropped.
    pub fn switch_network(&mut self, network: Network) -> Result<()> {
        self.session = ClientSession::for_network(&self.config, network)?;
        self.config.network = network;
        Ok(())
    }
}

fn clone_request(request: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut clone = http::Request::new(request.body().clone());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.version_mut() = request.version();
    *clone.headers_mut() = request.headers().clone();
    clone
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use serde_json::json;
    use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

    use super::*;
    use crate::{
        networks::SolanaNetwork, schemes::exact_svm_executor::tests::MockRpc,
        transport::PaymentAuthorization,
    };

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[derive(Debug, thiserror::Error)]
    #[error("unused")]
    struct Unreachable;

    struct NoTransport;

    impl HttpTransport for NoTransport {
        type Error = Unreachable;

        async fn send(
            &self,
            _request: http::Request<Bytes>,
        ) -> std::result::Result<http::Response<Bytes>, Self::Error> {
            Err(Unreachable)
        }
    }

    fn client(config: ClientConfig) -> X402Client<NoTransport, MockRpc> {
        X402Client::with_transport(NoTransport, config).unwrap()
    }

    /// Answers with canned responses in order and keeps every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<http::Response<Bytes>>>,
        requests: Mutex<Vec<http::Request<Bytes>>>,
    }

    impl HttpTransport for ScriptedTransport {
        type Error = Unreachable;

        async fn send(
            &self,
            request: http::Request<Bytes>,
        ) -> std::result::Result<http::Response<Bytes>, Self::Error> {
            self.requests.lock().unwrap().push(request);
            self.responses.lock().unwrap().pop_front().ok_or(Unreachable)
        }
    }

    fn json_response(status: StatusCode, body: serde_json::Value) -> http::Response<Bytes> {
        http::Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_clone_request_keeps_fields() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("https://jatevo.ai/api/x402/llm/qwen")
            .header(CONTENT_TYPE, "application/json")
            .header("x-trace", "abc")
            .body(Bytes::from_static(b"{\"messages\":[]}"))
            .unwrap();

        let clone = clone_request(&request);
        assert_eq!(clone.method(), request.method());
        assert_eq!(clone.uri(), request.uri());
        assert_eq!(clone.version(), request.version());
        assert_eq!(clone.headers(), request.headers());
        assert_eq!(clone.body(), request.body());
    }

    #[test]
    fn test_wallet_address_from_private_key() {
        let client = client(ClientConfig::builder().private_key(HARDHAT_KEY).build());
        assert_eq!(
            client.wallet_address().as_deref(),
            Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert!(!client.is_wallet_connected());
    }

    #[test]
    fn test_invalid_private_key() {
        let result = X402Client::<NoTransport, MockRpc>::with_transport(
            NoTransport,
            ClientConfig::builder().private_key("not a key").build(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_configured_solana_wallet_is_connected() {
        let keypair = Keypair::new();
        let address = keypair.pubkey().to_string();
        let client = client(
            ClientConfig::builder()
                .network(Network::SOLANA_DEVNET)
                .solana_wallet(keypair)
                .build(),
        );

        let wallet = client.connected_wallet().unwrap();
        assert_eq!(wallet.address, address);
        assert_eq!(wallet.network, Network::SOLANA_DEVNET);
        assert_eq!(client.wallet_address(), Some(address));
    }

    #[test]
    fn test_connect_and_disconnect_evm_wallet() {
        let mut client = client(ClientConfig::builder().private_key(HARDHAT_KEY).build());

        let wallet = client.connect_wallet(None).unwrap();
        assert_eq!(wallet.address, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(wallet.network, Network::BASE);
        assert!(client.is_wallet_connected());

        client.disconnect_wallet();
        assert!(!client.is_wallet_connected());
    }

    #[test]
    fn test_connect_solana_without_wallet_fails() {
        let mut client = client(ClientConfig::builder().network(Network::SOLANA).build());
        assert!(matches!(
            client.connect_wallet(None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            client.connect_wallet(Some(WalletHandle::WatchOnly(Pubkey::new_unique()))),
            Err(Error::UnsupportedWallet(_))
        ));
        assert!(!client.is_wallet_connected());
    }

    #[test]
    fn test_switch_network_clears_wallet() {
        let mut client = client(
            ClientConfig::builder()
                .network(Network::SOLANA_DEVNET)
                .solana_wallet(Keypair::new())
                .build(),
        );
        assert!(client.is_wallet_connected());
        assert!(client.session().handler().solana_executor().is_some());

        client.switch_network(Network::BASE_TESTNET).unwrap();
        assert_eq!(client.network(), Network::BASE_TESTNET);
        assert!(!client.is_wallet_connected());
        assert!(client.session().handler().solana_executor().is_none());

        client.switch_network(Network::SOLANA).unwrap();
        let executor = client.session().handler().solana_executor().unwrap();
        assert_eq!(executor.network, SolanaNetwork::Mainnet);
        assert!(!client.is_wallet_connected());
    }

    #[tokio::test]
    async fn test_check_solana_balance() {
        let keypair = Keypair::new();
        let owner = keypair.pubkey();
        let rpc = MockRpc::with_balance(&owner, SolanaNetwork::Devnet, 1_500_000);
        let config = ClientConfig::builder().network(Network::SOLANA_DEVNET).build();
        let handler = PaymentHandler::new(
            Network::SOLANA_DEVNET,
            None,
            Some(Arc::new(SolanaPaymentExecutor::new(rpc, SolanaNetwork::Devnet))),
        );
        let session = ClientSession::new(handler)
            .connect_wallet(Some(keypair.into()))
            .unwrap();
        let client = X402Client::with_session(NoTransport, config, session);

        assert_eq!(client.check_solana_balance(None).await.unwrap(), 1_500_000);
        assert_eq!(
            client
                .check_solana_balance(Some(&Pubkey::new_unique().to_string()))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_solana_payment_is_replayed_with_signature() {
        let keypair = Keypair::new();
        let sender = keypair.pubkey();
        let receiver = Pubkey::new_unique();
        let rpc = MockRpc::with_balance(&sender, SolanaNetwork::Devnet, 50_000);
        let handler = PaymentHandler::new(
            Network::SOLANA_DEVNET,
            None,
            Some(Arc::new(SolanaPaymentExecutor::new(rpc.clone(), SolanaNetwork::Devnet))),
        );
        let session = ClientSession::new(handler)
            .connect_wallet(Some(keypair.into()))
            .unwrap();

        let transport = ScriptedTransport::default();
        transport.responses.lock().unwrap().extend([
            json_response(
                StatusCode::PAYMENT_REQUIRED,
                json!({
                    "x402Version": 1,
                    "accepts": [
                        { "network": "base", "maxAmountRequired": 10000 },
                        {
                            "network": "solana-devnet",
                            "maxAmountRequired": "10000",
                            "asset": SolanaNetwork::Devnet.usdc_mint().to_string(),
                            "payTo": receiver.to_string()
                        }
                    ]
                }),
            ),
            json_response(StatusCode::OK, json!({ "ok": true })),
        ]);
        let config = ClientConfig::builder().network(Network::SOLANA_DEVNET).build();
        let client = X402Client::with_session(transport, config, session);

        let request = http::Request::builder()
            .method(Method::GET)
            .uri("https://jatevo.ai/paid")
            .body(Bytes::new())
            .unwrap();
        let response = client.send(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let requests = client.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].headers().get(X_PAYMENT).is_none());
        let header = requests[1].headers().get(X_PAYMENT).unwrap().to_str().unwrap();
        let PaymentAuthorization::Solana(authorization) =
            EncodedPaymentHeader(header.to_string()).decode().unwrap()
        else {
            panic!("expected a Solana authorization");
        };
        assert_eq!(authorization.from, sender.to_string());
        assert_eq!(authorization.to, receiver.to_string());
        assert_eq!(authorization.amount, crate::types::AmountValue(10_000));

        let state = rpc.state.lock().unwrap();
        assert_eq!(state.sent.len(), 1);
        assert_eq!(authorization.signature, state.sent[0].signatures[0].to_string());
    }

    #[tokio::test]
    async fn test_check_solana_balance_requires_solana_network() {
        let client = client(ClientConfig::default());
        assert!(matches!(
            client.check_solana_balance(Some("anything")).await,
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_model_lookup() {
        let client = client(ClientConfig::default());
        assert_eq!(client.models().len(), 6);
        assert_eq!(client.model("glm").unwrap().name, "GLM 4.5");
        assert!(matches!(client.model("llama"), Err(Error::UnknownModel(_))));
        assert_eq!(client.estimate_cost(ModelId::GptOss).price_per_request, "$0.01");
    }
}
