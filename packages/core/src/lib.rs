//! Pure-logic core of the walletlink bridge.
//!
//! A wallet that is only reachable through OS-level redirect links (custom
//! scheme deep links or `https` universal links) is talked to one URL at a
//! time: the app opens a request URL, the wallet later opens the app's
//! redirect link with the answer. This crate holds everything about that
//! exchange that does not need I/O:
//!
//! - the X25519 handshake and XSalsa20-Poly1305 payload sealing,
//! - building redirect links and parsing the URLs that arrive on them,
//! - the base58 text form of every binary value on the wire.
//!
//! It has no networking, no async runtime and no global state, so it
//! compiles unchanged to native and to WebAssembly. The runtime half
//! (correlating answers to pending calls, the wallet state machine) lives
//! in `walletlink-bridge`.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`] | base58 encode/decode of keys, nonces and sealed payloads |
//! | [`crypto`] | [`SecureSession`]: key pair, shared secret, seal/open |
//! | [`link`] | [`LinkConfig`], [`ParsedUrl`], query-string codec |
//! | [`message`] | [`LinkMessage`]: method + ordered params, to/from URL |
//!
//! # Quick start
//!
//! ```rust
//! use walletlink::{LinkConfig, LinkMessage, SecureSession};
//!
//! let config = LinkConfig::deep_link("myapp").with_alias("connect", "onConnect");
//! let session = SecureSession::new();
//!
//! let request = LinkMessage::new("connect")
//!     .with_param("dapp_encryption_public_key", session.public_key_base58())
//!     .with_param("redirect_link", config.redirect_url("connect"));
//! let url = request.to_url("https://phantom.app/ul/v1");
//! assert!(url.starts_with("https://phantom.app/ul/v1/connect?"));
//!
//! let answer = LinkMessage::from_url("myapp://onConnect?nonce=abc", &config).unwrap();
//! assert_eq!(answer.method, "onConnect");
//! ```

pub mod codec;
pub mod crypto;
pub mod link;
pub mod message;

pub use codec::CodecError;
pub use crypto::{nonce, CryptoError, KeyPair, Nonce, SecureSession};
pub use link::{extract_method_name, LinkConfig, LinkError, ParsedUrl};
pub use message::{InboundMessage, LinkMessage, OutboundMessage, Params};
