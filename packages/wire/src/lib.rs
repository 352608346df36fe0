//! Wire vocabulary for walletlink.
//!
//! Encodes the redirect-link contract spoken by the wallet as Rust types and
//! constants: which method names exist, which query fields carry what, and
//! the JSON shape of every sealed payload. Nothing here touches keys or
//! URLs; see the `walletlink` crate for that.
//!
//! # Methods covered
//!
//! | Method | Sealed request | Sealed response |
//! |--------|----------------|-----------------|
//! | `connect` | — (handshake, plain query) | [`ConnectPayload`] |
//! | `disconnect` | [`SessionPayload`] | — |
//! | `signMessage` | [`SignMessageRequest`] | [`SignatureResponse`] |
//! | `signTransaction` | [`SignTransactionRequest`] | [`SignedTransactionResponse`] |
//! | `signAllTransactions` | [`SignAllTransactionsRequest`] | [`SignedTransactionsResponse`] |
//! | `signAndSendTransaction` | [`SignAndSendTransactionRequest`] | [`SignatureResponse`] |
//!
//! Error answers carry [`fields::query::ERROR_CODE`] and
//! [`fields::query::ERROR_MESSAGE`] instead of a sealed payload; they decode
//! into a [`RemoteError`].

pub mod cluster;
pub mod error;
pub mod fields;
pub mod method;
pub mod options;
pub mod payload;

pub use cluster::Cluster;
pub use error::{ErrorCode, RemoteError};
pub use options::{Commitment, DisplayEncoding, SendOptions};
pub use payload::{
    ConnectPayload, SessionPayload, SignAllTransactionsRequest, SignAndSendTransactionRequest,
    SignMessageRequest, SignTransactionRequest, SignatureResponse, SignedTransactionResponse,
    SignedTransactionsResponse,
};
