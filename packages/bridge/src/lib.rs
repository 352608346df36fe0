//! Async runtime half of walletlink.
//!
//! `walletlink` knows how to seal payloads and read redirect URLs; this
//! crate adds time. A request is opened as a URL, the calling task
//! suspends, and some later "URL arrived" notification from the host wakes
//! it with the wallet's answer.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`platform`] | [`UrlOpener`] and the [`LinkEvents`] hub the host feeds |
//! | [`correlation`] | [`CorrelationTable`]: one pending call per wire method |
//! | [`protocol`] | [`RequestProtocol`]: `send(request) -> response`, `close()` |
//! | [`session`] | [`WalletSession`]: connect / sign / disconnect state machine |
//! | [`provider`] | [`WalletProvider`]: the async call surface |
//! | [`config`] | [`BridgeConfig`], from code or `WALLETLINK_*` variables |
//! | [`error`] | [`ProtocolError`], [`WalletError`] |
//!
//! # Wiring it up
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletlink_bridge::{BridgeConfig, LinkEvents, PlatformError, WalletProvider, WalletSession};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let events = LinkEvents::new();
//! let opener = |url: &str| -> Result<(), PlatformError> {
//!     // hand `url` to the OS here
//!     Ok(())
//! };
//! let config = BridgeConfig::deep_link("myapp", "https://myapp.example");
//! let session = WalletSession::new(config, Arc::new(opener), &events);
//!
//! // The host forwards every redirect the OS hands it:
//! //     events.deliver(&incoming_url);
//!
//! let address = session.connect().await?;
//! let signature = session.sign_message(b"hello", None).await?;
//! # let _ = (address, signature);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod correlation;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod provider;
pub mod session;

pub use config::{BridgeConfig, ConfigError};
pub use correlation::{CorrelationTable, PendingCall, Resolution};
pub use error::{ProtocolError, WalletError};
pub use platform::{LinkEvents, PlatformError, Subscription, UrlOpener};
pub use protocol::RequestProtocol;
pub use provider::WalletProvider;
pub use session::{browse_url, WalletSession};
