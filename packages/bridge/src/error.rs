//! Error types for the request protocol and the wallet session.
//!
//! [`WalletError::Remote`] is the only variant an application should expect
//! to handle routinely (the user declined, the wallet is busy). Everything
//! else is a local misuse or a corrupted channel and should propagate.

use thiserror::Error;
use walletlink::{CodecError, CryptoError, LinkError};
use walletlink_wire::RemoteError;

use crate::platform::PlatformError;

/// Errors raised by [`RequestProtocol`](crate::protocol::RequestProtocol).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A call for this wire method is already waiting for its answer.
    #[error("a '{0}' request is already in flight")]
    DuplicateInFlightRequest(String),

    /// The protocol was torn down before (or while) the call was waiting.
    #[error("request protocol closed")]
    ProtocolClosed,

    /// The platform refused to open the request URL.
    #[error("could not open request url: {0}")]
    OpenFailed(String),

    /// An inbound URL could not be turned into a message.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Errors raised by [`WalletSession`](crate::session::WalletSession).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet already connected")]
    AlreadyConnected,

    #[error("wallet not connected")]
    NotConnected,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("response field encoding: {0}")]
    Codec(#[from] CodecError),

    #[error("response is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl WalletError {
    /// The wallet's own error, if this is one.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            WalletError::Remote(e) => Some(e),
            _ => None,
        }
    }
}
