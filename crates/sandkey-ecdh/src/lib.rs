//! Sandkey keyring module
//!
//! Cryptography for sandboxed scripts. A script creates a [`Keyring`] bound to
//! one elliptic curve, fills it with a key pair (generated or imported), and
//! uses it for key agreement, signatures and the symmetric helpers that go with
//! the curve: an AEAD, AES-CBC, a hash, HMAC, KDF2 and PBKDF2.
//!
//! # Curves
//!
//! | Curve | Public key | Hash | AEAD |
//! |---|---|---|---|
//! | `ed25519` | Edwards point ‖ Montgomery form (64 bytes) | SHA-512 | ChaCha20-Poly1305 |
//! | `secp256k1` | uncompressed SEC1 point (65 bytes) | SHA-256 | AES-GCM |
//!
//! # Memory
//!
//! Keys, inputs and results are [`Octet`](sandkey_arena::Octet)s allocated
//! from the execution context's arena. Running out of arena space is an
//! ordinary error ([`KeyringError::OutOfMemory`]) and never leaves a keyring
//! half-updated.
//!
//! # Example
//!
//! ```
//! use sandkey_arena::Arena;
//! use sandkey_ecdh::{Keyring, Peer};
//!
//! let arena = Arena::sandbox(64 * 1024)?;
//! let mut alice = Keyring::new(&arena, "ed25519")?;
//! let mut bob = Keyring::new(&arena, "ed25519")?;
//! alice.keygen()?;
//! bob.keygen()?;
//!
//! let ab = alice.session(Peer::Keyring(&bob))?;
//! let ba = bob.session(Peer::Keyring(&alice))?;
//! assert_eq!(ab, ba);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Script surface
//!
//! [`module`] maps the keyring onto the interpreter's value model: the
//! constructor [`new_keyring`] and one [`Method`] per script-visible method.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
mod cipher;
mod config;
mod digest;
mod error;
mod keyring;
pub mod module;
mod seeder;

pub use backend::{Curve, CurveBackend, CurveParams, Ed25519, Secp256k1};
pub use cipher::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, AeadAlgorithm, BLOCK_SIZE};
pub use config::SandboxConfig;
pub use digest::HashAlgorithm;
pub use error::{BackendError, EntropyError, KeyringError};
pub use keyring::{DEFAULT_PBKDF2_ITERATIONS, Keyring, KeyringState, MIN_HMAC_LEN, Peer};
pub use module::{METHODS, MODULE_NAME, Method, new_keyring, new_keyring_with};
pub use seeder::{EntropySource, SEED_SIZE, SystemEntropy, seed_from, seeded_rng};
