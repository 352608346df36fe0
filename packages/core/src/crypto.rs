//! Session cryptography — X25519 key agreement and XSalsa20-Poly1305 sealing.
//!
//! A [`SecureSession`] owns one X25519 key pair for its whole lifetime. The
//! public half is sent to the wallet in the handshake; the wallet answers
//! with its own ephemeral public key, from which both sides derive the same
//! 32-byte box key. Every later payload is sealed under that key with a
//! fresh 24-byte [`Nonce`].
//!
//! The construction is NaCl `crypto_box` split into its two halves, which is
//! what the wallet side speaks:
//!
//! ```text
//! shared  = HSalsa20(X25519(own_secret, peer_public), 0^16)   // box_beforenm
//! sealed  = tag(16) || XSalsa20(shared, nonce) ^ plaintext      // secretbox
//! ```
//!
//! Sealed payloads are rendered as base58 text so they can ride in a query
//! string without escaping.

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;
use salsa20::cipher::consts::U10;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{self, CodecError};

/// Length of an X25519 public or private key.
pub const KEY_LENGTH: usize = 32;

/// Length of an XSalsa20 nonce.
pub const NONCE_LENGTH: usize = 24;

/// A 24-byte XSalsa20 nonce. Never reuse one under the same shared key.
pub type Nonce = [u8; NONCE_LENGTH];

/// Errors returned by [`SecureSession`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("no shared secret: the handshake has not completed")]
    SessionNotEstablished,

    #[error("decryption failed: authentication tag did not verify")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("peer public key is a low-order point")]
    InvalidPublicKey,

    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("sealed payload encoding: {0}")]
    Encoding(#[from] CodecError),
}

/// The public half of a session key pair, as sent in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: [u8; KEY_LENGTH],
}

/// The precomputed box key derived from one handshake.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SharedKey([u8; KEY_LENGTH]);

/// One side of an encrypted wallet session.
///
/// Holds the private key and, once [`derive_shared_secret`] has run, the
/// shared box key. Neither is ever exposed in encoded form.
///
/// [`derive_shared_secret`]: SecureSession::derive_shared_secret
pub struct SecureSession {
    secret: StaticSecret,
    public: PublicKey,
    shared: Option<SharedKey>,
}

impl SecureSession {
    /// Start a session with a freshly generated key pair from OS randomness.
    pub fn new() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Rebuild a session from a known 32-byte private key.
    ///
    /// Meant for tooling that inspects captured traffic; live sessions
    /// should use [`SecureSession::new`].
    pub fn from_private_key(private_key: [u8; KEY_LENGTH]) -> Self {
        Self::from_secret(StaticSecret::from(private_key))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public,
            shared: None,
        }
    }

    /// The public half of this session's key pair.
    pub fn key_pair(&self) -> KeyPair {
        KeyPair {
            public_key: self.public_key(),
        }
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> [u8; KEY_LENGTH] {
        *self.public.as_bytes()
    }

    /// Public key as base58 text, the form used on the wire.
    pub fn public_key_base58(&self) -> String {
        codec::encode(self.public.as_bytes())
    }

    /// Derive and store the shared box key for `peer_public_key`.
    ///
    /// Deterministic and symmetric: A deriving from B's public key yields the
    /// same bytes as B deriving from A's. Calling it again replaces the
    /// previous secret.
    pub fn derive_shared_secret(
        &mut self,
        peer_public_key: &[u8; KEY_LENGTH],
    ) -> Result<(), CryptoError> {
        let peer = PublicKey::from(*peer_public_key);
        let raw = self.secret.diffie_hellman(&peer);
        if !raw.was_contributory() {
            return Err(CryptoError::InvalidPublicKey);
        }

        let key = salsa20::Key::clone_from_slice(raw.as_bytes());
        let boxed = salsa20::hsalsa::<U10>(&key, &Default::default());

        let mut shared = [0u8; KEY_LENGTH];
        shared.copy_from_slice(boxed.as_slice());
        self.shared = Some(SharedKey(shared));
        Ok(())
    }

    /// The shared box key, if a handshake has completed.
    pub fn shared_secret(&self) -> Option<&[u8; KEY_LENGTH]> {
        self.shared.as_ref().map(|k| &k.0)
    }

    pub fn is_established(&self) -> bool {
        self.shared.is_some()
    }

    /// Forget the shared secret. The key pair is kept.
    pub fn clear_shared_secret(&mut self) {
        self.shared = None;
    }

    /// Seal raw bytes, returning `tag || ciphertext`.
    pub fn seal(&self, plaintext: &[u8], nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
        self.cipher()?
            .encrypt(nonce.into(), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Open `tag || ciphertext`. Fails without returning any plaintext if the
    /// tag does not verify.
    pub fn open(&self, sealed: &[u8], nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
        self.cipher()?
            .decrypt(nonce.into(), sealed)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Seal a UTF-8 payload and render it as base58.
    pub fn encrypt(&self, plaintext: &str, nonce: &Nonce) -> Result<String, CryptoError> {
        let sealed = self.seal(plaintext.as_bytes(), nonce)?;
        Ok(codec::encode(sealed))
    }

    /// Decode a base58 sealed payload and open it back into a string.
    pub fn decrypt(&self, ciphertext: &str, nonce: &Nonce) -> Result<String, CryptoError> {
        let sealed = codec::decode(ciphertext)?;
        let plain = self.open(&sealed, nonce)?;
        String::from_utf8(plain).map_err(|_| CryptoError::InvalidUtf8)
    }

    fn cipher(&self) -> Result<XSalsa20Poly1305, CryptoError> {
        let shared = self
            .shared
            .as_ref()
            .ok_or(CryptoError::SessionNotEstablished)?;
        Ok(XSalsa20Poly1305::new((&shared.0).into()))
    }
}

impl Default for SecureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSession")
            .field("public_key", &self.public_key_base58())
            .field("established", &self.is_established())
            .finish_non_exhaustive()
    }
}

/// 24 fresh bytes from the OS CSPRNG.
pub fn nonce() -> Nonce {
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// 32 fresh bytes suitable for [`SecureSession::from_private_key`].
pub fn random_private_key() -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paired() -> (SecureSession, SecureSession) {
        let mut alice = SecureSession::new();
        let mut bob = SecureSession::new();
        alice.derive_shared_secret(&bob.public_key()).unwrap();
        bob.derive_shared_secret(&alice.public_key()).unwrap();
        (alice, bob)
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let (alice, bob) = paired();
        assert_eq!(alice.shared_secret(), bob.shared_secret());
        assert!(alice.shared_secret().is_some());
    }

    #[test]
    fn distinct_peers_give_distinct_secrets() {
        let mut alice = SecureSession::new();
        let bob = SecureSession::new();
        let carol = SecureSession::new();
        alice.derive_shared_secret(&bob.public_key()).unwrap();
        let with_bob = *alice.shared_secret().unwrap();
        alice.derive_shared_secret(&carol.public_key()).unwrap();
        assert_ne!(&with_bob, alice.shared_secret().unwrap());
    }

    #[test]
    fn encrypt_then_decrypt_across_peers() {
        let (alice, bob) = paired();
        let n = nonce();
        let sealed = alice.encrypt("Hello World!", &n).unwrap();
        assert_eq!(bob.decrypt(&sealed, &n).unwrap(), "Hello World!");
    }

    #[test]
    fn sealed_payload_carries_sixteen_byte_tag() {
        let (alice, _) = paired();
        let sealed = alice.seal(b"abc", &nonce()).unwrap();
        assert_eq!(sealed.len(), 3 + 16);
    }

    #[test]
    fn encrypt_without_handshake_fails() {
        let session = SecureSession::new();
        assert_eq!(
            session.encrypt("x", &nonce()),
            Err(CryptoError::SessionNotEstablished)
        );
        assert_eq!(
            session.decrypt("2", &nonce()),
            Err(CryptoError::SessionNotEstablished)
        );
    }

    #[test]
    fn wrong_nonce_is_rejected() {
        let (alice, bob) = paired();
        let sealed = alice.encrypt("payload", &nonce()).unwrap();
        assert_eq!(bob.decrypt(&sealed, &nonce()), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (alice, _) = paired();
        let (_, stranger) = paired();
        let n = nonce();
        let sealed = alice.encrypt("payload", &n).unwrap();
        assert_eq!(stranger.decrypt(&sealed, &n), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn garbage_ciphertext_is_an_encoding_error() {
        let (alice, _) = paired();
        assert!(matches!(
            alice.decrypt("not base58!", &nonce()),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[test]
    fn clearing_drops_the_secret_but_keeps_the_key() {
        let (mut alice, _) = paired();
        let before = alice.public_key();
        alice.clear_shared_secret();
        assert!(!alice.is_established());
        assert_eq!(alice.public_key(), before);
    }

    #[test]
    fn from_private_key_is_deterministic() {
        let key = random_private_key();
        let a = SecureSession::from_private_key(key);
        let b = SecureSession::from_private_key(key);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.key_pair().public_key, a.public_key());
    }

    #[test]
    fn low_order_peer_key_is_rejected() {
        let mut alice = SecureSession::new();
        assert_eq!(
            alice.derive_shared_secret(&[0u8; 32]),
            Err(CryptoError::InvalidPublicKey)
        );
        assert!(!alice.is_established());
    }

    #[test]
    fn nonces_do_not_repeat() {
        let a = nonce();
        let b = nonce();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let (alice, _) = paired();
        let shown = format!("{alice:?}");
        let secret = codec::encode(alice.shared_secret().unwrap());
        assert!(!shown.contains(&secret));
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(plaintext in ".*") {
            let (alice, bob) = paired();
            let n = nonce();
            let sealed = alice.encrypt(&plaintext, &n).unwrap();
            prop_assert_eq!(bob.decrypt(&sealed, &n).unwrap(), plaintext);
        }

        #[test]
        fn any_flipped_byte_is_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..64),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let (alice, bob) = paired();
            let n = nonce();
            let mut sealed = alice.seal(&plaintext, &n).unwrap();
            let i = index.index(sealed.len());
            sealed[i] ^= flip;
            prop_assert_eq!(bob.open(&sealed, &n), Err(CryptoError::DecryptionFailed));
        }
    }
}
