//! Shared helpers for the walletlink conformance test suite.
//!
//! Provides [`MockWallet`]: an in-process wallet peer that plays the other
//! side of the redirect-link protocol with real cryptography. It is handed
//! to a [`WalletSession`] as its [`UrlOpener`]; every request URL the
//! session opens is decoded, answered, and the answer is delivered back
//! through the same [`LinkEvents`] hub the session listens on.
//!
//! - The handshake uses a fresh X25519 key per connect, like a real wallet.
//! - Signatures are real Ed25519 signatures by the wallet's account key, so
//!   tests can verify them against [`MockWallet::verifying_key`].
//! - [`Behaviour`] switches between answering at once, holding answers until
//!   released, and rejecting with a wallet error code.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use walletlink::link::{parse_query, render_query};
use walletlink::{codec, LinkMessage, Nonce, Params, SecureSession};
use walletlink_bridge::{BridgeConfig, LinkEvents, PlatformError, UrlOpener, WalletSession};
use walletlink_wire::fields::query;
use walletlink_wire::{
    method, ConnectPayload, ErrorCode, SessionPayload, SignAllTransactionsRequest,
    SignAndSendTransactionRequest, SignMessageRequest, SignTransactionRequest,
    SignatureResponse, SignedTransactionResponse, SignedTransactionsResponse,
};

/// How the wallet answers the next requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behaviour {
    /// Answer inside `open_url`, before it returns.
    Approve,
    /// Compute the answer but keep it until [`MockWallet::release_next`].
    Hold,
    /// Answer every request with `errorCode` / `errorMessage`.
    Reject { code: ErrorCode, message: String },
}

/// One request URL the wallet received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Method name as it appeared in the provider URL.
    pub method: String,
    /// Plain query params.
    pub params: Params,
    /// The opened sealed payload, when there was one.
    pub payload: Option<Value>,
}

struct WalletState {
    behaviour: Behaviour,
    crypto: Option<SecureSession>,
    session_token: Option<String>,
    sessions_issued: u32,
    held: VecDeque<String>,
    requests: Vec<RecordedRequest>,
}

/// An in-process wallet peer. Cheap to share behind an `Arc`.
pub struct MockWallet {
    account: SigningKey,
    events: LinkEvents,
    state: Mutex<WalletState>,
}

type Answer = Result<Vec<(&'static str, String)>, (ErrorCode, String)>;

impl MockWallet {
    /// A wallet that answers on `events`.
    pub fn new(events: LinkEvents) -> Self {
        Self {
            account: SigningKey::generate(&mut OsRng),
            events,
            state: Mutex::new(WalletState {
                behaviour: Behaviour::Approve,
                crypto: None,
                session_token: None,
                sessions_issued: 0,
                held: VecDeque::new(),
                requests: Vec::new(),
            }),
        }
    }

    /// The user's account address: the Ed25519 public key, base58.
    pub fn address(&self) -> String {
        codec::encode(self.account.verifying_key().as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.account.verifying_key()
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        self.lock().behaviour = behaviour;
    }

    /// The session token handed out by the last successful connect, if the
    /// wallet still considers it live.
    pub fn session_token(&self) -> Option<String> {
        self.lock().session_token.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.lock().requests.last().cloned()
    }

    /// Answers computed under [`Behaviour::Hold`] and not yet delivered.
    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// Take the oldest held answer without delivering it.
    pub fn take_next(&self) -> Option<String> {
        self.lock().held.pop_front()
    }

    /// Deliver the oldest held answer. Returns `false` when none is held.
    pub fn release_next(&self) -> bool {
        match self.take_next() {
            Some(url) => {
                self.events.deliver(&url);
                true
            }
            None => false,
        }
    }

    /// Deliver every held answer in arrival order. Returns how many were
    /// delivered.
    pub fn release_all(&self) -> usize {
        let mut released = 0;
        while self.release_next() {
            released += 1;
        }
        released
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Decode a provider URL, produce the redirect URL answering it.
    fn answer(&self, url: &str) -> Result<Option<String>, PlatformError> {
        let (path, raw_query) = url.split_once('?').unwrap_or((url, ""));
        let method = path.rsplit('/').next().unwrap_or_default().to_string();
        let params = parse_query(raw_query)
            .map_err(|e| PlatformError::OpenFailed(format!("unreadable request: {e}")))?;

        let mut state = self.lock();
        let payload = state
            .crypto
            .as_ref()
            .and_then(|crypto| open_payload::<Value>(crypto, &params).ok());
        state.requests.push(RecordedRequest {
            method: method.clone(),
            params: params.clone(),
            payload,
        });
        let Some(redirect) = params.get(query::REDIRECT_LINK).map(str::to_string) else {
            return Ok(None);
        };

        let answer = match state.behaviour.clone() {
            Behaviour::Reject { code, message } => Err((code, message)),
            _ => self.handle(&mut state, &method, &params),
        };
        let fields = match answer {
            Ok(fields) => fields,
            Err((code, message)) => vec![
                (query::ERROR_CODE, code.to_wire()),
                (query::ERROR_MESSAGE, message),
            ],
        };
        Ok(Some(redirect_with(&redirect, fields)))
    }

    fn handle(&self, state: &mut WalletState, name: &str, params: &Params) -> Answer {
        match name {
            method::CONNECT => self.connect(state, params),
            method::DISCONNECT => {
                let _: SessionPayload = self.session_request(state, params)?;
                state.session_token = None;
                state.crypto = None;
                Ok(Vec::new())
            }
            method::SIGN_MESSAGE => {
                let req: SignMessageRequest = self.session_request(state, params)?;
                let message = decode_field(&req.message)?;
                let signature = self.account.sign(&message);
                seal(state, &SignatureResponse {
                    signature: codec::encode(signature.to_bytes()),
                })
            }
            method::SIGN_TRANSACTION => {
                let req: SignTransactionRequest = self.session_request(state, params)?;
                let signed = self.sign_transaction(&decode_field(&req.transaction)?);
                seal(state, &SignedTransactionResponse {
                    transaction: codec::encode(signed),
                })
            }
            method::SIGN_ALL_TRANSACTIONS => {
                let req: SignAllTransactionsRequest = self.session_request(state, params)?;
                let mut signed = Vec::with_capacity(req.transactions.len());
                for tx in &req.transactions {
                    signed.push(codec::encode(self.sign_transaction(&decode_field(tx)?)));
                }
                seal(state, &SignedTransactionsResponse {
                    transactions: signed,
                })
            }
            method::SIGN_AND_SEND_TRANSACTION => {
                let req: SignAndSendTransactionRequest = self.session_request(state, params)?;
                let signature = self.account.sign(&decode_field(&req.transaction)?);
                seal(state, &SignatureResponse {
                    signature: codec::encode(signature.to_bytes()),
                })
            }
            other => Err((
                ErrorCode::MethodNotFound,
                format!("method {other:?} not supported"),
            )),
        }
    }

    fn connect(&self, state: &mut WalletState, params: &Params) -> Answer {
        let dapp_key: [u8; 32] = params
            .get(query::DAPP_PUBLIC_KEY)
            .and_then(|k| codec::decode_array(k).ok())
            .ok_or_else(|| invalid("missing or bad dapp_encryption_public_key"))?;
        if params.get(query::APP_URL).is_none() {
            return Err(invalid("missing app_url"));
        }

        let mut crypto = SecureSession::new();
        crypto
            .derive_shared_secret(&dapp_key)
            .map_err(|e| invalid(&e.to_string()))?;
        state.sessions_issued += 1;
        let token = format!("session-{}", state.sessions_issued);
        let wallet_key = crypto.public_key_base58();
        state.crypto = Some(crypto);
        state.session_token = Some(token.clone());

        let mut fields = vec![(query::WALLET_PUBLIC_KEY, wallet_key)];
        fields.extend(seal(state, &ConnectPayload {
            public_key: self.address(),
            session: token,
        })?);
        Ok(fields)
    }

    /// Open a sealed request and check that it names the live session.
    fn session_request<T: DeserializeOwned + HasSession>(
        &self,
        state: &WalletState,
        params: &Params,
    ) -> Result<T, (ErrorCode, String)> {
        let crypto = state
            .crypto
            .as_ref()
            .ok_or_else(|| (ErrorCode::Unauthorized, "no session".to_string()))?;
        let request: T = open_payload(crypto, params).map_err(|e| invalid(&e))?;
        if state.session_token.as_deref() != Some(request.session()) {
            return Err((ErrorCode::Unauthorized, "unknown session".into()));
        }
        Ok(request)
    }

    /// `signature || transaction`
    fn sign_transaction(&self, transaction: &[u8]) -> Vec<u8> {
        let mut signed = self.account.sign(transaction).to_bytes().to_vec();
        signed.extend_from_slice(transaction);
        signed
    }
}

impl UrlOpener for MockWallet {
    fn open_url(&self, url: &str) -> Result<(), PlatformError> {
        let Some(answer) = self.answer(url)? else {
            // Fire-and-forget links (browse) get no answer.
            return Ok(());
        };
        let hold = self.lock().behaviour == Behaviour::Hold;
        if hold {
            self.lock().held.push_back(answer);
        } else {
            self.events.deliver(&answer);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockWallet")
            .field("address", &self.address())
            .field("held", &self.held())
            .finish_non_exhaustive()
    }
}

/// Payload structs that carry a session token.
trait HasSession {
    fn session(&self) -> &str;
}

macro_rules! has_session {
    ($($ty:ty),*) => {
        $(impl HasSession for $ty {
            fn session(&self) -> &str {
                &self.session
            }
        })*
    };
}

has_session!(
    SessionPayload,
    SignMessageRequest,
    SignTransactionRequest,
    SignAllTransactionsRequest,
    SignAndSendTransactionRequest
);

fn invalid(reason: &str) -> (ErrorCode, String) {
    (ErrorCode::InvalidInput, reason.to_string())
}

fn decode_field(text: &str) -> Result<Vec<u8>, (ErrorCode, String)> {
    codec::decode(text).map_err(|e| invalid(&e.to_string()))
}

fn open_payload<T: DeserializeOwned>(crypto: &SecureSession, params: &Params) -> Result<T, String> {
    let nonce: Nonce = params
        .get(query::NONCE)
        .ok_or("missing nonce")
        .and_then(|n| codec::decode_array(n).map_err(|_| "bad nonce"))?;
    let sealed = params.get(query::PAYLOAD).ok_or("missing payload")?;
    let json = crypto.decrypt(sealed, &nonce).map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| e.to_string())
}

fn seal<T: serde::Serialize>(state: &WalletState, body: &T) -> Answer {
    let crypto = state
        .crypto
        .as_ref()
        .ok_or_else(|| (ErrorCode::InternalError, "no session".to_string()))?;
    let nonce = walletlink::nonce();
    let json = serde_json::to_string(body).map_err(|e| (ErrorCode::InternalError, e.to_string()))?;
    let data = crypto
        .encrypt(&json, &nonce)
        .map_err(|e| (ErrorCode::InternalError, e.to_string()))?;
    Ok(vec![(query::NONCE, codec::encode(nonce)), (query::DATA, data)])
}

fn redirect_with(redirect: &str, fields: Vec<(&'static str, String)>) -> String {
    if fields.is_empty() {
        return redirect.to_string();
    }
    let message = fields
        .into_iter()
        .fold(LinkMessage::new(""), |m, (k, v)| m.with_param(k, v));
    format!("{redirect}?{}", render_query(&message.params))
}

/// A session wired to a fresh mock wallet on a private hub.
pub fn connect_pair(config: BridgeConfig) -> (Arc<WalletSession>, Arc<MockWallet>, LinkEvents) {
    let events = LinkEvents::new();
    let wallet = Arc::new(MockWallet::new(events.clone()));
    let opener: Arc<dyn UrlOpener> = Arc::clone(&wallet) as Arc<dyn UrlOpener>;
    let session = Arc::new(WalletSession::new(config, opener, &events));
    (session, wallet, events)
}

/// The config every conformance test starts from.
pub fn test_config() -> BridgeConfig {
    BridgeConfig::deep_link("conformance", "https://app.example")
        .with_provider_url("https://wallet.example/ul/v1")
        .with_browse_url("https://wallet.example/ul/browse")
}
