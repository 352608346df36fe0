//! Wallet-reported failures.
//!
//! An error answer replaces the sealed `data` field with a numeric
//! `errorCode` and a human-readable `errorMessage`:
//!
//! ```text
//! myapp://onSignMessage?errorCode=4001&errorMessage=User%20rejected%20the%20request.
//! ```

use thiserror::Error;

/// The closed set of codes the wallet documents.
///
/// Anything outside the set (including a non-numeric code) decodes as
/// [`ErrorCode::Unrecognized`] carrying the raw text, so an unexpected code
/// is still surfaced as a [`RemoteError`] rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// 4900 — the wallet could not reach the network.
    Disconnected,
    /// 4100 — the requested method or account is not authorized.
    Unauthorized,
    /// 4001 — the user declined.
    UserRejectedRequest,
    /// -32000 — missing or invalid parameters.
    InvalidInput,
    /// -32002 — the wallet is busy with another request.
    RequestedResourceNotAvailable,
    /// -32003 — the transaction was rejected before submission.
    TransactionRejected,
    /// -32601 — the wallet does not know the method.
    MethodNotFound,
    /// -32603 — something went wrong inside the wallet.
    InternalError,
    Unrecognized(String),
}

impl ErrorCode {
    /// Map a numeric code onto the closed set.
    pub fn from_code(code: i64) -> Self {
        match code {
            4900 => ErrorCode::Disconnected,
            4100 => ErrorCode::Unauthorized,
            4001 => ErrorCode::UserRejectedRequest,
            -32000 => ErrorCode::InvalidInput,
            -32002 => ErrorCode::RequestedResourceNotAvailable,
            -32003 => ErrorCode::TransactionRejected,
            -32601 => ErrorCode::MethodNotFound,
            -32603 => ErrorCode::InternalError,
            other => ErrorCode::Unrecognized(other.to_string()),
        }
    }

    /// Decode the raw `errorCode` query value.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(code) => Self::from_code(code),
            Err(_) => ErrorCode::Unrecognized(raw.to_string()),
        }
    }

    /// The numeric code, when there is one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ErrorCode::Disconnected => Some(4900),
            ErrorCode::Unauthorized => Some(4100),
            ErrorCode::UserRejectedRequest => Some(4001),
            ErrorCode::InvalidInput => Some(-32000),
            ErrorCode::RequestedResourceNotAvailable => Some(-32002),
            ErrorCode::TransactionRejected => Some(-32003),
            ErrorCode::MethodNotFound => Some(-32601),
            ErrorCode::InternalError => Some(-32603),
            ErrorCode::Unrecognized(raw) => raw.trim().parse().ok(),
        }
    }

    /// The text to put back on the wire.
    pub fn to_wire(&self) -> String {
        match self {
            ErrorCode::Unrecognized(raw) => raw.clone(),
            known => known.code().map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Unrecognized(raw) => write!(f, "unrecognized code {raw:?}"),
            known => write!(f, "{known:?} ({})", known.to_wire()),
        }
    }
}

/// A failure reported by the wallet itself, as opposed to a local fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("wallet error {code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build from the raw `errorCode` / `errorMessage` query values.
    pub fn from_wire(code: &str, message: Option<&str>) -> Self {
        Self::new(ErrorCode::from_wire(code), message.unwrap_or_default())
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == ErrorCode::UserRejectedRequest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_roundtrip() {
        for code in [4900, 4100, 4001, -32000, -32002, -32003, -32601, -32603] {
            let decoded = ErrorCode::from_code(code);
            assert!(!matches!(decoded, ErrorCode::Unrecognized(_)), "{code}");
            assert_eq!(decoded.code(), Some(code));
            assert_eq!(ErrorCode::from_wire(&decoded.to_wire()), decoded);
        }
    }

    #[test]
    fn unknown_numeric_code_falls_back() {
        let code = ErrorCode::from_wire("1234");
        assert_eq!(code, ErrorCode::Unrecognized("1234".into()));
        assert_eq!(code.code(), Some(1234));
    }

    #[test]
    fn non_numeric_code_falls_back() {
        let err = RemoteError::from_wire("oops", None);
        assert_eq!(err.code, ErrorCode::Unrecognized("oops".into()));
        assert_eq!(err.code.code(), None);
        assert_eq!(err.message, "");
    }

    #[test]
    fn display_names_the_code() {
        let err = RemoteError::from_wire("4001", Some("User rejected the request."));
        assert!(err.is_user_rejection());
        assert_eq!(
            err.to_string(),
            "wallet error UserRejectedRequest (4001): User rejected the request."
        );
    }
}
