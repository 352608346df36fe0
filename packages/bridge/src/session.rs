//! The wallet session state machine.
//!
//! ```text
//!               connect() ok
//!  Disconnected ────────────► Connected
//!       ▲                         │
//!       └─────disconnect() ok─────┘
//! ```
//!
//! `connect` is the only plain-text exchange: the app sends its X25519
//! public key, the wallet answers with its own plus a sealed
//! [`ConnectPayload`]. Every later request is a JSON object sealed under the
//! shared key with a fresh nonce, and every answer is either a sealed `data`
//! field or an `errorCode`/`errorMessage` pair.
//!
//! The state lock is a plain [`std::sync::Mutex`] and is never held across
//! an `.await`: request building and answer opening happen in synchronous
//! helpers around the one suspension point, [`RequestProtocol::send`].
//! Auto-connect is serialised by a separate async gate, so concurrent
//! signing calls on a disconnected session share one handshake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use urlencoding::encode;
use walletlink::{codec, InboundMessage, LinkMessage, Nonce, OutboundMessage, SecureSession};
use walletlink_wire::fields::query;
use walletlink_wire::{
    method, ConnectPayload, DisplayEncoding, RemoteError, SendOptions, SessionPayload,
    SignAllTransactionsRequest, SignAndSendTransactionRequest, SignMessageRequest,
    SignTransactionRequest, SignatureResponse, SignedTransactionResponse,
    SignedTransactionsResponse,
};

use crate::config::BridgeConfig;
use crate::error::WalletError;
use crate::platform::{LinkEvents, UrlOpener};
use crate::protocol::RequestProtocol;
use crate::provider::WalletProvider;

struct Connection {
    session_token: String,
    wallet_address: String,
}

struct State {
    crypto: SecureSession,
    connection: Option<Connection>,
}

/// A connection to one wallet over redirect links.
pub struct WalletSession {
    config: BridgeConfig,
    protocol: RequestProtocol,
    state: Mutex<State>,
    connect_gate: tokio::sync::Mutex<()>,
    auto_connect: AtomicBool,
}

impl WalletSession {
    /// Create a disconnected session with a fresh key pair. Answers are
    /// read from `events` until [`close`](Self::close) or drop.
    pub fn new(config: BridgeConfig, opener: Arc<dyn UrlOpener>, events: &LinkEvents) -> Self {
        let protocol = RequestProtocol::new(
            config.provider_url.clone(),
            Arc::clone(&config.link),
            opener,
            events,
        );
        let auto_connect = AtomicBool::new(config.auto_connect);
        Self {
            config,
            protocol,
            state: Mutex::new(State {
                crypto: SecureSession::new(),
                connection: None,
            }),
            connect_gate: tokio::sync::Mutex::new(()),
            auto_connect,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connection.is_some()
    }

    /// The connected wallet's address (base58).
    pub fn wallet_address(&self) -> Option<String> {
        self.lock()
            .connection
            .as_ref()
            .map(|c| c.wallet_address.clone())
    }

    /// This app's current X25519 public key (base58).
    pub fn public_key(&self) -> String {
        self.lock().crypto.public_key_base58()
    }

    pub fn auto_connect(&self) -> bool {
        self.auto_connect.load(Ordering::SeqCst)
    }

    pub fn set_auto_connect(&self, enabled: bool) {
        self.auto_connect.store(enabled, Ordering::SeqCst);
    }

    /// Cancel every pending call with
    /// [`ProtocolError::ProtocolClosed`](crate::ProtocolError::ProtocolClosed)
    /// and stop listening for answers. The connection state is left as is.
    pub fn close(&self) {
        self.protocol.close();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn ensure_connected(&self) -> Result<(), WalletError> {
        if self.is_connected() {
            return Ok(());
        }
        if !self.auto_connect() {
            return Err(WalletError::NotConnected);
        }
        // Held across the handshake; later callers wait here for its outcome.
        let _gate = self.connect_gate.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        debug!("auto-connecting before signing call");
        match self.connect().await {
            // A caller-issued connect finished first.
            Ok(_) | Err(WalletError::AlreadyConnected) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn handshake_request(&self) -> Result<OutboundMessage, WalletError> {
        let state = self.lock();
        if state.connection.is_some() {
            return Err(WalletError::AlreadyConnected);
        }
        Ok(LinkMessage::new(method::CONNECT)
            .with_param(query::APP_URL, &self.config.app_url)
            .with_param(query::DAPP_PUBLIC_KEY, state.crypto.public_key_base58())
            .with_param(
                query::REDIRECT_LINK,
                self.config.link.redirect_url(method::CONNECT),
            )
            .with_param(query::CLUSTER, self.config.cluster.as_str()))
    }

    fn complete_handshake(&self, response: &InboundMessage) -> Result<String, WalletError> {
        let wallet_key: [u8; 32] =
            codec::decode_array(required(response, query::WALLET_PUBLIC_KEY)?)?;
        let nonce: Nonce = codec::decode_array(required(response, query::NONCE)?)?;
        let data = required(response, query::DATA)?;

        let mut state = self.lock();
        if state.connection.is_some() {
            return Err(WalletError::AlreadyConnected);
        }
        state.crypto.derive_shared_secret(&wallet_key)?;
        let payload: ConnectPayload = match open_json(&state.crypto, data, &nonce) {
            Ok(payload) => payload,
            Err(e) => {
                state.crypto.clear_shared_secret();
                return Err(e);
            }
        };
        state.connection = Some(Connection {
            session_token: payload.session,
            wallet_address: payload.public_key.clone(),
        });
        Ok(payload.public_key)
    }

    /// Seal the request built from the session token, addressed to `method`.
    fn sealed_request<Req, F>(&self, method: &str, build: F) -> Result<OutboundMessage, WalletError>
    where
        Req: Serialize,
        F: FnOnce(String) -> Req,
    {
        let nonce = walletlink::nonce();
        let state = self.lock();
        let token = state
            .connection
            .as_ref()
            .map(|c| c.session_token.clone())
            .ok_or(WalletError::NotConnected)?;
        let json = serde_json::to_string(&build(token))
            .map_err(|e| WalletError::MalformedPayload(e.to_string()))?;
        let payload = state.crypto.encrypt(&json, &nonce)?;

        Ok(LinkMessage::new(method)
            .with_param(query::REDIRECT_LINK, self.config.link.redirect_url(method))
            .with_param(query::DAPP_PUBLIC_KEY, state.crypto.public_key_base58())
            .with_param(query::NONCE, codec::encode(nonce))
            .with_param(query::PAYLOAD, payload))
    }

    fn open_response<Resp: DeserializeOwned>(
        &self,
        response: &InboundMessage,
    ) -> Result<Resp, WalletError> {
        let nonce: Nonce = codec::decode_array(required(response, query::NONCE)?)?;
        let data = required(response, query::DATA)?;
        open_json(&self.lock().crypto, data, &nonce)
    }

    /// One sealed round trip: connect if needed, send, check for a wallet
    /// error, open the answer.
    async fn call<Req, Resp, F>(&self, method: &'static str, build: F) -> Result<Resp, WalletError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
        F: FnOnce(String) -> Req + Send,
    {
        self.ensure_connected().await?;
        let request = self.sealed_request(method, build)?;
        let response = self.protocol.send(request).await?;
        check_for_error(&response)?;
        self.open_response(&response)
    }
}

#[async_trait]
impl WalletProvider for WalletSession {
    async fn connect(&self) -> Result<String, WalletError> {
        let request = self.handshake_request()?;
        let response = self.protocol.send(request).await?;
        check_for_error(&response)?;
        let address = self.complete_handshake(&response)?;
        info!(wallet = %address, "wallet connected");
        Ok(address)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        if !self.is_connected() {
            return Err(WalletError::NotConnected);
        }
        let request = self.sealed_request(method::DISCONNECT, |session| SessionPayload { session })?;
        let response = self.protocol.send(request).await?;
        check_for_error(&response)?;

        let mut state = self.lock();
        state.connection = None;
        state.crypto = SecureSession::new();
        info!("wallet disconnected");
        Ok(())
    }

    async fn sign_message(
        &self,
        message: &[u8],
        display: Option<DisplayEncoding>,
    ) -> Result<String, WalletError> {
        let message = codec::encode(message);
        let response: SignatureResponse = self
            .call(method::SIGN_MESSAGE, move |session| SignMessageRequest {
                session,
                message,
                display,
            })
            .await?;
        Ok(response.signature)
    }

    async fn sign_transaction(&self, transaction: &[u8]) -> Result<Vec<u8>, WalletError> {
        let transaction = codec::encode(transaction);
        let response: SignedTransactionResponse = self
            .call(method::SIGN_TRANSACTION, move |session| SignTransactionRequest {
                session,
                transaction,
            })
            .await?;
        Ok(codec::decode(&response.transaction)?)
    }

    async fn sign_all_transactions(
        &self,
        transactions: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        let transactions = codec::encode_all(transactions);
        let sent = transactions.len();
        let response: SignedTransactionsResponse = self
            .call(method::SIGN_ALL_TRANSACTIONS, move |session| {
                SignAllTransactionsRequest {
                    session,
                    transactions,
                }
            })
            .await?;
        if response.transactions.len() != sent {
            return Err(WalletError::MalformedPayload(format!(
                "sent {sent} transactions, got {} back",
                response.transactions.len()
            )));
        }
        response
            .transactions
            .iter()
            .map(|t| codec::decode(t).map_err(WalletError::from))
            .collect()
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: &[u8],
        options: Option<SendOptions>,
    ) -> Result<String, WalletError> {
        let transaction = codec::encode(transaction);
        let response: SignatureResponse = self
            .call(method::SIGN_AND_SEND_TRANSACTION, move |session| {
                SignAndSendTransactionRequest {
                    session,
                    transaction,
                    send_options: options,
                }
            })
            .await?;
        Ok(response.signature)
    }

    async fn browse(&self, url: &str) -> Result<(), WalletError> {
        let link = browse_url(&self.config, url);
        self.protocol.open(&link).map_err(|e| {
            warn!(error = %e, "browse link did not open");
            WalletError::from(e)
        })
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("connected", &self.is_connected())
            .field("auto_connect", &self.auto_connect())
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

/// `{browse_url}/{url}?ref={app_url}`, both values percent-encoded.
pub fn browse_url(config: &BridgeConfig, url: &str) -> String {
    format!(
        "{}/{}?{}={}",
        config.browse_url.trim_end_matches('/'),
        encode(url),
        query::REF,
        encode(&config.app_url)
    )
}

/// Fail with the wallet's own error if the answer carries one. Runs before
/// any decryption: error answers have no sealed payload.
fn check_for_error(response: &InboundMessage) -> Result<(), WalletError> {
    match response.params.get(query::ERROR_CODE) {
        Some(code) => {
            let err = RemoteError::from_wire(code, response.params.get(query::ERROR_MESSAGE));
            debug!(wire = %response.method, code = %err.code, "wallet returned an error");
            Err(err.into())
        }
        None => Ok(()),
    }
}

fn required<'a>(response: &'a InboundMessage, field: &'static str) -> Result<&'a str, WalletError> {
    response
        .params
        .get(field)
        .ok_or(WalletError::MissingField(field))
}

fn open_json<T: DeserializeOwned>(
    crypto: &SecureSession,
    sealed: &str,
    nonce: &Nonce,
) -> Result<T, WalletError> {
    let json = crypto.decrypt(sealed, nonce)?;
    serde_json::from_str(&json).map_err(|e| WalletError::MalformedPayload(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
