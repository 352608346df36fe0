//! Field names used on the wire.

/// Query-string fields of request and answer URLs.
pub mod query {
    /// App metadata URL (title, icon). Handshake request only.
    pub const APP_URL: &str = "app_url";
    /// Where the wallet should send its answer.
    pub const REDIRECT_LINK: &str = "redirect_link";
    /// The app's X25519 public key, base58.
    pub const DAPP_PUBLIC_KEY: &str = "dapp_encryption_public_key";
    /// The wallet's ephemeral X25519 public key, base58. Handshake answer only.
    pub const WALLET_PUBLIC_KEY: &str = "phantom_encryption_public_key";
    /// Target network. Handshake request only.
    pub const CLUSTER: &str = "cluster";
    /// Nonce the neighbouring sealed field was produced with, base58.
    pub const NONCE: &str = "nonce";
    /// Sealed request payload.
    pub const PAYLOAD: &str = "payload";
    /// Sealed answer payload.
    pub const DATA: &str = "data";
    /// Numeric wallet error code. Excludes [`DATA`].
    pub const ERROR_CODE: &str = "errorCode";
    /// Human-readable wallet error message.
    pub const ERROR_MESSAGE: &str = "errorMessage";
    /// Referrer for the in-app browser link.
    pub const REF: &str = "ref";
}

/// JSON keys inside sealed payloads.
pub mod payload {
    pub const SESSION: &str = "session";
    pub const PUBLIC_KEY: &str = "public_key";
    pub const MESSAGE: &str = "message";
    pub const DISPLAY: &str = "display";
    pub const TRANSACTION: &str = "transaction";
    pub const TRANSACTIONS: &str = "transactions";
    pub const SIGNATURE: &str = "signature";
    pub const SEND_OPTIONS: &str = "sendOptions";
}
