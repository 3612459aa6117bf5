//! Curve backends
//!
//! A backend binds one named curve to its primitive operations: key
//! generation and derivation, public key validation, Diffie-Hellman,
//! signatures, plus the hash and AEAD construction paired with the curve.
//! Backends are stateless statics; a keyring resolves one by name at creation
//! and keeps a `&'static dyn CurveBackend` for its lifetime.
//!
//! | Curve | Aliases | keysize | fieldsize | hash | AEAD |
//! |---|---|---|---|---|---|
//! | `ed25519` | `ec25519`, `25519`, `curve25519` | 32 | 64 | SHA-512 | ChaCha20-Poly1305 |
//! | `secp256k1` | `k256` | 32 | 65 | SHA-256 | AES-GCM |

mod ed25519;
mod secp256k1;

use std::{fmt, str::FromStr};

use rand::RngCore;
use zeroize::Zeroizing;

pub use self::{ed25519::Ed25519, secp256k1::Secp256k1};
use crate::{
    cipher::{self, AeadAlgorithm},
    digest::HashAlgorithm,
    error::{BackendError, KeyringError},
};

/// Attempts at drawing a secret the curve accepts before giving up.
const KEYGEN_ATTEMPTS: usize = 64;

/// Static parameters of a curve backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveParams {
    /// Canonical curve name
    pub name: &'static str,
    /// Other names the curve resolves from (lower case)
    pub aliases: &'static [&'static str],
    /// Secret key length in bytes
    pub keysize: usize,
    /// Public key length in bytes
    pub fieldsize: usize,
    /// Hash paired with the curve
    pub hash: HashAlgorithm,
    /// AEAD construction paired with the curve
    pub aead: AeadAlgorithm,
}

impl CurveParams {
    /// Digest size of the curve's hash.
    pub fn hash_output_size(&self) -> usize {
        self.hash.output_size()
    }
}

/// Primitive operations bound to one curve.
///
/// Inputs are raw bytes; the keyring enforces key slot rules and moves results
/// into arena-backed octets.
pub trait CurveBackend: Sync {
    /// Static parameters.
    fn params(&self) -> &CurveParams;

    /// Public key for `secret`.
    ///
    /// Fails with [`BackendError::InvalidSecretKey`] if `secret` is not
    /// `keysize` bytes or not a valid scalar.
    fn derive_public(&self, secret: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// True if `public` is a well-formed public key for this curve.
    fn validate_public(&self, public: &[u8]) -> bool;

    /// Shared secret of `keysize` bytes between `secret` and `peer`.
    fn diffie_hellman(
        &self,
        secret: &[u8],
        peer: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, BackendError>;

    /// Signature over `message` with `secret`.
    fn sign(&self, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// True if `signature` is valid for `message` under `public`.
    fn verify(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool;

    /// Fresh `(secret, public)` pair drawn from `rng`.
    fn generate_keypair(
        &self,
        rng: &mut dyn RngCore,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), BackendError> {
        let mut secret = Zeroizing::new(vec![0u8; self.params().keysize]);
        for _ in 0..KEYGEN_ATTEMPTS {
            rng.fill_bytes(&mut secret);
            match self.derive_public(&secret) {
                Ok(public) => return Ok((secret, public)),
                Err(BackendError::InvalidSecretKey) => {},
                Err(err) => return Err(err),
            }
        }
        Err(BackendError::InvalidSecretKey)
    }

    /// Digest of `data` with the curve's hash.
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        self.params().hash.hash(data)
    }

    /// AEAD encryption with the curve's construction.
    fn aead_encrypt(
        &self,
        key: &[u8],
        plaintext: &[u8],
        iv: &[u8],
        header: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), BackendError> {
        self.params().aead.encrypt(key, iv, header, plaintext)
    }

    /// AEAD decryption returning the plaintext and the recomputed tag.
    fn aead_decrypt(
        &self,
        key: &[u8],
        ciphertext: &[u8],
        iv: &[u8],
        header: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), BackendError> {
        self.params().aead.decrypt(key, iv, header, ciphertext)
    }

    /// AES-CBC encryption (zero IV, PKCS#7).
    fn cbc_encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
        cipher::cbc_encrypt(key, plaintext)
    }

    /// AES-CBC decryption (zero IV, PKCS#7).
    fn cbc_decrypt(
        &self,
        key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, BackendError> {
        cipher::cbc_decrypt(key, ciphertext)
    }
}

static ED25519: Ed25519 = Ed25519;
static SECP256K1: Secp256k1 = Secp256k1;

/// Supported curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// Edwards25519 / X25519
    Ed25519,
    /// secp256k1
    Secp256k1,
}

impl Curve {
    /// Every supported curve.
    pub const ALL: [Self; 2] = [Self::Ed25519, Self::Secp256k1];

    /// Case-insensitive lookup by canonical name or alias.
    pub fn resolve(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| {
            let params = curve.backend().params();
            params.name.eq_ignore_ascii_case(name)
                || params.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
        })
    }

    /// Backend implementing this curve.
    pub fn backend(self) -> &'static dyn CurveBackend {
        match self {
            Self::Ed25519 => &ED25519,
            Self::Secp256k1 => &SECP256K1,
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        self.backend().params().name
    }
}

impl FromStr for Curve {
    type Err = KeyringError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::resolve(name).ok_or_else(|| KeyringError::UnsupportedCurve { name: name.to_string() })
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
