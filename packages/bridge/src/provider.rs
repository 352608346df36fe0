//! The call surface an application codes against.

use async_trait::async_trait;
use walletlink_wire::{DisplayEncoding, SendOptions};

use crate::error::WalletError;

/// A wallet reachable through redirect links.
///
/// [`WalletSession`](crate::session::WalletSession) is the real
/// implementation; applications can substitute their own in tests.
///
/// Every signing call requires a connected session. With auto-connect
/// enabled a disconnected session connects first; otherwise the call fails
/// with [`WalletError::NotConnected`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Run the key-exchange handshake. Returns the wallet address (base58).
    async fn connect(&self) -> Result<String, WalletError>;

    /// End the session on the wallet side and forget the shared secret.
    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Ask the wallet to sign arbitrary bytes. Returns the signature (base58).
    async fn sign_message(
        &self,
        message: &[u8],
        display: Option<DisplayEncoding>,
    ) -> Result<String, WalletError>;

    /// Ask the wallet to sign one serialized transaction without sending it.
    async fn sign_transaction(&self, transaction: &[u8]) -> Result<Vec<u8>, WalletError>;

    /// Sign a batch of serialized transactions in one round trip. The answer
    /// keeps the request's order.
    async fn sign_all_transactions(
        &self,
        transactions: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, WalletError>;

    /// Sign and submit a transaction. Returns its signature (base58).
    async fn sign_and_send_transaction(
        &self,
        transaction: &[u8],
        options: Option<SendOptions>,
    ) -> Result<String, WalletError>;

    /// Open `url` in the wallet's in-app browser. Nothing comes back.
    async fn browse(&self, url: &str) -> Result<(), WalletError>;
}
