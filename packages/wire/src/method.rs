//! Logical method names understood by the wallet.
//!
//! These appear as the last path segment of the provider URL
//! (`https://phantom.app/ul/v1/signMessage`). Redirect links may rename them
//! through a `LinkConfig` alias; the provider URL never does.

pub const CONNECT: &str = "connect";
pub const DISCONNECT: &str = "disconnect";
pub const SIGN_MESSAGE: &str = "signMessage";
pub const SIGN_TRANSACTION: &str = "signTransaction";
pub const SIGN_ALL_TRANSACTIONS: &str = "signAllTransactions";
pub const SIGN_AND_SEND_TRANSACTION: &str = "signAndSendTransaction";

/// Every method that expects a redirect answer.
pub const ALL: [&str; 6] = [
    CONNECT,
    DISCONNECT,
    SIGN_MESSAGE,
    SIGN_TRANSACTION,
    SIGN_ALL_TRANSACTIONS,
    SIGN_AND_SEND_TRANSACTION,
];
