//! JSON bodies sealed inside `payload` (requests) and `data` (answers).
//!
//! Every binary value (messages, transactions, signatures, keys) is carried
//! as base58 text. Every request after the handshake names the session it
//! belongs to with the opaque token handed out in [`ConnectPayload`].

use serde::{Deserialize, Serialize};

use crate::options::{DisplayEncoding, SendOptions};

/// Sealed answer to `connect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectPayload {
    /// The user's wallet address, base58.
    pub public_key: String,

    /// Opaque session token to echo on every later request.
    pub session: String,
}

/// Sealed `disconnect` request: only the session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPayload {
    pub session: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignMessageRequest {
    pub session: String,

    /// The message bytes, base58.
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayEncoding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignTransactionRequest {
    pub session: String,

    /// Serialized transaction, base58.
    pub transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignAllTransactionsRequest {
    pub session: String,

    /// Serialized transactions, base58, in signing order.
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignAndSendTransactionRequest {
    pub session: String,

    pub transaction: String,

    #[serde(rename = "sendOptions", skip_serializing_if = "Option::is_none")]
    pub send_options: Option<SendOptions>,
}

/// Sealed answer to `signMessage` and `signAndSendTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureResponse {
    /// Signature, base58. For `signAndSendTransaction` this is the
    /// transaction id.
    pub signature: String,
}

/// Sealed answer to `signTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTransactionResponse {
    pub transaction: String,
}

/// Sealed answer to `signAllTransactions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTransactionsResponse {
    pub transactions: Vec<String>,
}
