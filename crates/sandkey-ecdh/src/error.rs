//! Error types for keyring operations

use sandkey_arena::{ArenaError, OctetError};
use thiserror::Error;

/// Failures of a single cryptographic primitive.
///
/// These never reach scripts directly; the keyring maps them onto the
/// [`KeyringError`] taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Symmetric key of a length the cipher does not support
    #[error("invalid key length: {actual} bytes")]
    InvalidKeyLength {
        /// Length that was supplied
        actual: usize,
    },

    /// Nonce or IV of the wrong length
    #[error("invalid iv length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Length the cipher requires
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Ciphertext that is not a whole number of blocks
    #[error("ciphertext length {actual} is not a non-zero multiple of the block size")]
    InvalidCiphertextLength {
        /// Length that was supplied
        actual: usize,
    },

    /// Block padding that does not decode
    #[error("invalid padding")]
    InvalidPadding,

    /// Secret scalar rejected by the curve
    #[error("invalid secret key")]
    InvalidSecretKey,

    /// Point rejected by the curve
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Key agreement produced the identity
    #[error("key agreement produced a degenerate shared secret")]
    DegenerateSharedSecret,

    /// AEAD primitive refused the input
    #[error("cipher failure")]
    Cipher,
}

/// The entropy source could not produce seed material
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entropy source unavailable: {reason}")]
pub struct EntropyError {
    /// Why the source failed
    pub reason: String,
}

/// Errors from keyring operations
#[derive(Debug, Error)]
pub enum KeyringError {
    /// No backend is registered under this curve name
    #[error("unsupported curve: {name}")]
    UnsupportedCurve {
        /// Name as given by the caller
        name: String,
    },

    /// The key slot is already occupied and keys are never reassigned
    #[error("key already set")]
    KeyAlreadySet,

    /// Operation needs a secret key and none is stored
    #[error("no secret key")]
    NoSecretKey,

    /// Operation needs a public key and none is stored or given
    #[error("no public key")]
    NoPublicKey,

    /// Key material rejected on import or export
    #[error("invalid key")]
    InvalidKey,

    /// Peer public key rejected during key agreement
    #[error("invalid peer public key")]
    InvalidPeerKey,

    /// A freshly generated or derived public key failed validation
    #[error("generated key failed validation")]
    InvalidKeyGenerated,

    /// Encryption primitive rejected its input
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Reason for encryption failure
        reason: String,
    },

    /// Decryption primitive rejected its input or the tag did not match
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// HMAC output length outside the accepted range
    #[error("hmac failed: length {requested} outside 4..={max}")]
    HmacFailed {
        /// Output length requested
        requested: usize,
        /// Digest size of the curve's hash
        max: usize,
    },

    /// Script argument of the wrong kind
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Accepted value kinds
        expected: &'static str,
        /// Kind of the value that was passed
        found: &'static str,
    },

    /// The arena could not satisfy an allocation
    #[error(transparent)]
    OutOfMemory(#[from] ArenaError),

    /// Numeric or named argument outside its domain
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument
        reason: String,
    },
}

impl KeyringError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// A generated key failing validation means the backend or the generator
    /// is broken; nothing the caller retries can fix it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidKeyGenerated)
    }

    pub(crate) fn encryption(err: &BackendError) -> Self {
        Self::EncryptionFailed { reason: err.to_string() }
    }

    pub(crate) fn decryption(err: &BackendError) -> Self {
        Self::DecryptionFailed { reason: err.to_string() }
    }
}

impl From<OctetError> for KeyringError {
    fn from(err: OctetError) -> Self {
        match err {
            OctetError::TypeMismatch { expected, found } => Self::TypeMismatch { expected, found },
            OctetError::Arena(arena) => Self::OutOfMemory(arena),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_generated_is_fatal() {
        assert!(KeyringError::InvalidKeyGenerated.is_fatal());
    }

    #[test]
    fn caller_errors_are_not_fatal() {
        assert!(!KeyringError::KeyAlreadySet.is_fatal());
        assert!(!KeyringError::InvalidPeerKey.is_fatal());
        assert!(!KeyringError::HmacFailed { requested: 2, max: 32 }.is_fatal());
    }

    #[test]
    fn octet_errors_map_onto_taxonomy() {
        let err: KeyringError =
            OctetError::TypeMismatch { expected: "octet or string", found: "boolean" }.into();
        assert!(matches!(err, KeyringError::TypeMismatch { found: "boolean", .. }));

        let err: KeyringError =
            OctetError::Arena(ArenaError::OutOfMemory { requested: 9, available: 8 }).into();
        assert!(matches!(err, KeyringError::OutOfMemory(ArenaError::OutOfMemory { .. })));
    }

    #[test]
    fn error_display() {
        let err = KeyringError::HmacFailed { requested: 65, max: 64 };
        assert_eq!(err.to_string(), "hmac failed: length 65 outside 4..=64");

        let err = KeyringError::encryption(&BackendError::InvalidKeyLength { actual: 7 });
        assert_eq!(err.to_string(), "encryption failed: invalid key length: 7 bytes");
    }
}
