//! Base58 text encoding for keys, nonces and sealed payloads.
//!
//! Every binary value that crosses a redirect link (public keys, nonces,
//! ciphertexts, transactions) travels as base58btc text. The alphabet has no
//! characters that need percent-encoding, so encoded values can be dropped
//! into a query string verbatim.

use thiserror::Error;

/// Errors returned when decoding base58 text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid base58 encoding: {0}")]
    InvalidEncoding(String),

    #[error("decoded value has wrong length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Encode raw bytes as base58btc.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    bs58::encode(bytes).into_string()
}

/// Encode each item of a batch, preserving order.
pub fn encode_all<T: AsRef<[u8]>>(items: &[T]) -> Vec<String> {
    items.iter().map(encode).collect()
}

/// Decode base58btc text into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| CodecError::InvalidEncoding(e.to_string()))
}

/// Decode base58btc text that must be exactly `N` bytes long (keys, nonces).
pub fn decode_array<const N: usize>(text: &str) -> Result<[u8; N], CodecError> {
    let bytes = decode(text)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CodecError::InvalidLength { expected: N, actual })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(decode("StV1DL6CwTryKyV").unwrap(), b"hello world");
    }

    #[test]
    fn leading_zeros_survive() {
        let bytes = [0u8, 0, 1, 2];
        assert_eq!(decode(&encode(bytes)).unwrap(), bytes);
    }

    #[test]
    fn rejects_ambiguous_characters() {
        for bad in ["0abc", "Oabc", "Iabc", "labc"] {
            assert!(
                matches!(decode(bad), Err(CodecError::InvalidEncoding(_))),
                "{bad} should not decode"
            );
        }
    }

    #[test]
    fn decode_array_checks_length() {
        let text = encode([7u8; 31]);
        assert_eq!(
            decode_array::<32>(&text),
            Err(CodecError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
        assert_eq!(decode_array::<31>(&text).unwrap(), [7u8; 31]);
    }

    #[test]
    fn encode_all_keeps_order() {
        let batch = vec![vec![1u8], vec![2u8], vec![3u8]];
        let encoded = encode_all(&batch);
        assert_eq!(encoded, vec!["2", "3", "4"]);
    }
}
