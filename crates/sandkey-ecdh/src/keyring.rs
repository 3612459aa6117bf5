//! Curve-polymorphic keyring
//!
//! A [`Keyring`] pairs one curve backend with its own CSPRNG and holds at most
//! one secret and one public key. Every input and output is an arena-backed
//! [`Octet`]; the keyring copies inputs out of the arena before computing and
//! allocates its results afterwards. Outputs whose length the caller chooses
//! (random bytes and derived keys) are reserved in the arena first and
//! filled in place, so an oversized request fails with `OutOfMemory` before
//! any work is done.
//!
//! # Key slots
//!
//! ```text
//! Fresh ──keygen / import secret──▶ HasBoth
//!   │
//!   └──import public──▶ HasPublic
//! ```
//!
//! No transition empties a slot, and a filled slot is never overwritten.
//! Operations check every precondition and allocate every output before they
//! touch a slot, so a failed call leaves the keyring as it was.

use std::fmt;

use rand::RngCore;
use rand_chacha::ChaCha20Rng;
use sandkey_arena::{Arena, Octet};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    backend::{Curve, CurveBackend, CurveParams},
    error::KeyringError,
    seeder::{self, EntropySource, SystemEntropy},
};

/// Iterations used by [`Keyring::pbkdf2`] when none are given.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 1000;

/// Shortest HMAC output [`Keyring::hmac`] will truncate to.
pub const MIN_HMAC_LEN: usize = 4;

/// Which key slots are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringState {
    /// No keys
    Fresh,
    /// Secret key only
    HasSecret,
    /// Public key only
    HasPublic,
    /// Secret and public key
    HasBoth,
}

/// Counterparty of a key agreement.
#[derive(Debug, Clone, Copy)]
pub enum Peer<'a> {
    /// Another keyring; its stored public key is used
    Keyring(&'a Keyring),
    /// A raw public key
    Key(&'a Octet),
}

/// One curve backend, one CSPRNG, at most one key pair.
pub struct Keyring {
    arena: Arena,
    curve: Curve,
    backend: &'static dyn CurveBackend,
    rng: ChaCha20Rng,
    secret: Option<Octet>,
    public: Option<Octet>,
}

impl Keyring {
    /// Keyring for the named curve, seeded from the operating system.
    ///
    /// Curve names are matched case-insensitively against canonical names and
    /// aliases.
    pub fn new(arena: &Arena, curve: &str) -> Result<Self, KeyringError> {
        let curve: Curve = curve.parse()?;
        Ok(Self::with_entropy(arena, curve, &SystemEntropy))
    }

    /// Keyring for `curve` with its generator seeded from `source`.
    pub fn with_entropy(arena: &Arena, curve: Curve, source: &dyn EntropySource) -> Self {
        let rng = seeder::seeded_rng(source);
        debug!(%curve, "keyring created");
        Self {
            arena: arena.clone(),
            curve,
            backend: curve.backend(),
            rng,
            secret: None,
            public: None,
        }
    }

    /// Curve this keyring operates on.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Static parameters of the curve backend.
    pub fn params(&self) -> &CurveParams {
        self.backend.params()
    }

    /// Which key slots are filled.
    pub fn state(&self) -> KeyringState {
        match (&self.secret, &self.public) {
            (None, None) => KeyringState::Fresh,
            (Some(_), None) => KeyringState::HasSecret,
            (None, Some(_)) => KeyringState::HasPublic,
            (Some(_), Some(_)) => KeyringState::HasBoth,
        }
    }

    /// Arena the keyring allocates its results from.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    fn octet(&self, bytes: &[u8]) -> Result<Octet, KeyringError> {
        Ok(Octet::from_slice(&self.arena, bytes)?)
    }

    fn ensure_no_keys(&self) -> Result<(), KeyringError> {
        if self.secret.is_some() || self.public.is_some() {
            return Err(KeyringError::KeyAlreadySet);
        }
        Ok(())
    }

    fn stored_secret(&self) -> Result<Zeroizing<Vec<u8>>, KeyringError> {
        self.secret.as_ref().map(Octet::to_vec).ok_or(KeyringError::NoSecretKey)
    }

    fn stored_public(&self) -> Result<Zeroizing<Vec<u8>>, KeyringError> {
        self.public.as_ref().map(Octet::to_vec).ok_or(KeyringError::NoPublicKey)
    }

    /// Generate and store a fresh key pair.
    ///
    /// Returns copies of `(public, secret)`.
    ///
    /// # Errors
    ///
    /// - `KeyAlreadySet`: either slot is already filled
    /// - `InvalidKeyGenerated`: the backend produced a public key that does
    ///   not validate
    pub fn keygen(&mut self) -> Result<(Octet, Octet), KeyringError> {
        self.ensure_no_keys()?;

        let (secret, public) = self
            .backend
            .generate_keypair(&mut self.rng)
            .map_err(|_| KeyringError::InvalidKeyGenerated)?;
        if !self.backend.validate_public(&public) {
            return Err(KeyringError::InvalidKeyGenerated);
        }

        let stored_secret = self.octet(&secret)?;
        let stored_public = self.octet(&public)?;
        let returned_public = self.octet(&public)?;
        let returned_secret = self.octet(&secret)?;

        self.secret = Some(stored_secret);
        self.public = Some(stored_public);
        debug!(curve = %self.curve, "key pair generated");

        Ok((returned_public, returned_secret))
    }

    /// Validate `key`, or the stored public key when `key` is `None`.
    pub fn check_public_key(&self, key: Option<&Octet>) -> Result<bool, KeyringError> {
        let bytes = match key {
            Some(key) => key.to_vec(),
            None => self.stored_public()?,
        };
        Ok(self.backend.validate_public(&bytes))
    }

    /// Copy of the stored public key.
    ///
    /// # Errors
    ///
    /// - `NoPublicKey`: no public key is stored
    /// - `InvalidKey`: the stored key no longer validates
    pub fn public_key(&self) -> Result<Octet, KeyringError> {
        let bytes = self.stored_public()?;
        if !self.backend.validate_public(&bytes) {
            return Err(KeyringError::InvalidKey);
        }
        self.octet(&bytes)
    }

    /// Store `key` as the public key.
    ///
    /// # Errors
    ///
    /// - `KeyAlreadySet`: a public key is already stored
    /// - `InvalidKey`: `key` does not validate
    pub fn import_public_key(&mut self, key: &Octet) -> Result<(), KeyringError> {
        if self.public.is_some() {
            return Err(KeyringError::KeyAlreadySet);
        }
        let bytes = key.to_vec();
        if !self.backend.validate_public(&bytes) {
            return Err(KeyringError::InvalidKey);
        }

        self.public = Some(self.octet(&bytes)?);
        debug!(curve = %self.curve, "public key imported");
        Ok(())
    }

    /// Copy of the stored secret key.
    pub fn secret_key(&self) -> Result<Octet, KeyringError> {
        let bytes = self.stored_secret()?;
        self.octet(&bytes)
    }

    /// Store `key` as the secret key and derive its public key.
    ///
    /// Both slots are filled together. Returns a copy of the derived public
    /// key.
    ///
    /// # Errors
    ///
    /// - `KeyAlreadySet`: either slot is already filled
    /// - `InvalidKey`: the curve rejects `key` as a secret
    /// - `InvalidKeyGenerated`: the derived public key does not validate
    pub fn import_secret_key(&mut self, key: &Octet) -> Result<Octet, KeyringError> {
        self.ensure_no_keys()?;

        let secret = key.to_vec();
        let public =
            self.backend.derive_public(&secret).map_err(|_| KeyringError::InvalidKey)?;
        if !self.backend.validate_public(&public) {
            return Err(KeyringError::InvalidKeyGenerated);
        }

        let stored_secret = self.octet(&secret)?;
        let stored_public = self.octet(&public)?;
        let returned = self.octet(&public)?;

        self.secret = Some(stored_secret);
        self.public = Some(stored_public);
        debug!(curve = %self.curve, "secret key imported");

        Ok(returned)
    }

    /// Diffie-Hellman shared secret with `peer`, `keysize` bytes long.
    ///
    /// Any two keyrings on the same curve agree: `a.session(b) ==
    /// b.session(a)`.
    ///
    /// # Errors
    ///
    /// - `NoPublicKey`: `peer` is a keyring without a public key
    /// - `NoSecretKey`: this keyring has no secret key
    /// - `InvalidPeerKey`: the peer's public key does not validate
    pub fn session(&self, peer: Peer<'_>) -> Result<Octet, KeyringError> {
        let peer_key = match peer {
            Peer::Keyring(other) => other.stored_public()?,
            Peer::Key(key) => key.to_vec(),
        };
        let secret = self.stored_secret()?;

        let shared = self
            .backend
            .diffie_hellman(&secret, &peer_key)
            .map_err(|_| KeyringError::InvalidPeerKey)?;
        self.octet(&shared)
    }

    /// AES-CBC encryption with a zero IV and PKCS#7 padding.
    ///
    /// `key` must be 16, 24 or 32 bytes.
    pub fn encrypt(&self, key: &Octet, plaintext: &Octet) -> Result<Octet, KeyringError> {
        let key = key.to_vec();
        let plaintext = plaintext.to_vec();
        let ciphertext =
            self.backend.cbc_encrypt(&key, &plaintext).map_err(|e| KeyringError::encryption(&e))?;
        self.octet(&ciphertext)
    }

    /// Inverse of [`Keyring::encrypt`].
    pub fn decrypt(&self, key: &Octet, ciphertext: &Octet) -> Result<Octet, KeyringError> {
        let key = key.to_vec();
        let ciphertext = ciphertext.to_vec();
        let plaintext =
            self.backend.cbc_decrypt(&key, &ciphertext).map_err(|e| KeyringError::decryption(&e))?;
        self.octet(&plaintext)
    }

    /// Authenticated encryption with the curve's AEAD.
    ///
    /// Returns `(ciphertext, tag)`.
    pub fn aead_encrypt(
        &self,
        key: &Octet,
        plaintext: &Octet,
        iv: &Octet,
        header: &Octet,
    ) -> Result<(Octet, Octet), KeyringError> {
        let (key, plaintext, iv, header) =
            (key.to_vec(), plaintext.to_vec(), iv.to_vec(), header.to_vec());

        let (ciphertext, tag) = self
            .backend
            .aead_encrypt(&key, &plaintext, &iv, &header)
            .map_err(|e| KeyringError::encryption(&e))?;
        Ok((self.octet(&ciphertext)?, self.octet(&tag)?))
    }

    /// Authenticated decryption with the curve's AEAD.
    ///
    /// The tag is recomputed and compared with `tag` in constant time.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: bad key or IV length, or the tags differ
    pub fn aead_decrypt(
        &self,
        key: &Octet,
        ciphertext: &Octet,
        iv: &Octet,
        header: &Octet,
        tag: &Octet,
    ) -> Result<Octet, KeyringError> {
        let (key, ciphertext, iv, header) =
            (key.to_vec(), ciphertext.to_vec(), iv.to_vec(), header.to_vec());

        let (plaintext, expected) = self
            .backend
            .aead_decrypt(&key, &ciphertext, &iv, &header)
            .map_err(|e| KeyringError::decryption(&e))?;

        let expected = self.octet(&expected)?;
        if !expected.ct_eq(tag) {
            return Err(KeyringError::DecryptionFailed {
                reason: "authentication failed".to_string(),
            });
        }
        self.octet(&plaintext)
    }

    /// Digest of `data` with the curve's hash.
    pub fn hash(&self, data: &Octet) -> Result<Octet, KeyringError> {
        let digest = self.backend.hash(&data.to_vec());
        self.octet(&digest)
    }

    /// HMAC of `data` under `key`, truncated to `len` bytes.
    ///
    /// `len` defaults to the hash output size.
    ///
    /// # Errors
    ///
    /// - `HmacFailed`: `len` is below 4 or above the hash output size
    pub fn hmac(
        &self,
        key: &Octet,
        data: &Octet,
        len: Option<usize>,
    ) -> Result<Octet, KeyringError> {
        let max = self.params().hash_output_size();
        let len = len.unwrap_or(max);
        if !(MIN_HMAC_LEN..=max).contains(&len) {
            return Err(KeyringError::HmacFailed { requested: len, max });
        }

        let tag = self.params().hash.hmac(&key.to_vec(), &data.to_vec());
        self.octet(&tag[..len])
    }

    /// KDF2 (IEEE 1363a) of `key` with optional derivation `params`.
    ///
    /// `out_len` defaults to the length of `key`.
    pub fn kdf2(
        &self,
        params: Option<&Octet>,
        key: &Octet,
        out_len: Option<usize>,
    ) -> Result<Octet, KeyringError> {
        let params = params.map(Octet::to_vec).unwrap_or_default();
        let secret = key.to_vec();
        let hash = self.params().hash;

        let mut derived = Octet::new(&self.arena, out_len.unwrap_or(key.len()))?;
        derived.fill_with(|out| hash.kdf2(&secret, &params, out));
        Ok(derived)
    }

    /// PBKDF2 of `key` with `salt`.
    ///
    /// `iterations` defaults to [`DEFAULT_PBKDF2_ITERATIONS`], `out_len` to the
    /// length of `key`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: zero iterations
    pub fn pbkdf2(
        &self,
        key: &Octet,
        salt: &Octet,
        iterations: Option<u32>,
        out_len: Option<usize>,
    ) -> Result<Octet, KeyringError> {
        let iterations = iterations.unwrap_or(DEFAULT_PBKDF2_ITERATIONS);
        if iterations == 0 {
            return Err(KeyringError::InvalidArgument {
                reason: "pbkdf2 needs at least one iteration".to_string(),
            });
        }
        let (password, salt) = (key.to_vec(), salt.to_vec());
        let hash = self.params().hash;

        let mut derived = Octet::new(&self.arena, out_len.unwrap_or(key.len()))?;
        derived.fill_with(|out| hash.pbkdf2(&password, &salt, iterations, out));
        Ok(derived)
    }

    /// `len` bytes from the keyring's generator, `keysize` by default.
    pub fn random(&mut self, len: Option<usize>) -> Result<Octet, KeyringError> {
        let len = len.unwrap_or(self.params().keysize);
        let mut bytes = Octet::new(&self.arena, len)?;
        bytes.fill_with(|out| self.rng.fill_bytes(out));
        Ok(bytes)
    }

    /// Signature over `message` with the stored secret key.
    pub fn sign(&self, message: &Octet) -> Result<Octet, KeyringError> {
        let secret = self.stored_secret()?;
        let signature =
            self.backend.sign(&secret, &message.to_vec()).map_err(|_| KeyringError::InvalidKey)?;
        self.octet(&signature)
    }

    /// Check `signature` over `message` against `key`, or the stored public
    /// key when `key` is `None`.
    pub fn verify(
        &self,
        message: &Octet,
        signature: &Octet,
        key: Option<&Octet>,
    ) -> Result<bool, KeyringError> {
        let public = match key {
            Some(key) => key.to_vec(),
            None => self.stored_public()?,
        };
        Ok(self.backend.verify(&public, &message.to_vec(), &signature.to_vec()))
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("curve", &self.curve)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
