//! Edwards25519 backend
//!
//! The secret key is a 32-byte Ed25519 seed. The public key carries the point
//! in both encodings: the compressed Edwards point (the Ed25519 verifying key)
//! followed by its Montgomery u-coordinate (the X25519 public key). Signatures
//! use the Edwards half, key agreement the Montgomery half, and both derive
//! from the same clamped scalar `SHA-512(seed)[..32]`.

use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    montgomery::MontgomeryPoint,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::{CurveBackend, CurveParams};
use crate::{cipher::AeadAlgorithm, digest::HashAlgorithm, error::BackendError};

const KEY_SIZE: usize = 32;

const PARAMS: CurveParams = CurveParams {
    name: "ed25519",
    aliases: &["ec25519", "25519", "curve25519"],
    keysize: KEY_SIZE,
    fieldsize: 2 * KEY_SIZE,
    hash: HashAlgorithm::Sha512,
    aead: AeadAlgorithm::ChaCha20Poly1305,
};

/// Ed25519 signatures and X25519 key agreement over one key pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

fn seed(secret: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>, BackendError> {
    let mut seed = Zeroizing::new([0u8; KEY_SIZE]);
    if secret.len() != KEY_SIZE {
        return Err(BackendError::InvalidSecretKey);
    }
    seed.copy_from_slice(secret);
    Ok(seed)
}

/// Unclamped scalar bytes expanded from a seed, as Ed25519 does.
fn scalar_bytes(seed: &[u8; KEY_SIZE]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut digest = Sha512::digest(seed);
    let mut scalar = Zeroizing::new([0u8; KEY_SIZE]);
    scalar.copy_from_slice(&digest[..KEY_SIZE]);
    digest.as_mut_slice().zeroize();
    scalar
}

/// Decodes and checks both halves of a public key.
///
/// Returns the Montgomery form when the Edwards point is canonical, of prime
/// order and matches the Montgomery half.
fn parse_public(public: &[u8]) -> Option<MontgomeryPoint> {
    if public.len() != PARAMS.fieldsize {
        return None;
    }
    let (edwards, montgomery) = public.split_at(KEY_SIZE);

    let mut compressed = CompressedEdwardsY([0u8; KEY_SIZE]);
    compressed.0.copy_from_slice(edwards);
    let point = compressed.decompress()?;

    if point.is_small_order() || !point.is_torsion_free() {
        return None;
    }
    if point.compress() != compressed {
        return None;
    }

    let expected = point.to_montgomery();
    bool::from(expected.as_bytes()[..].ct_eq(montgomery)).then_some(expected)
}

impl CurveBackend for Ed25519 {
    fn params(&self) -> &CurveParams {
        &PARAMS
    }

    fn derive_public(&self, secret: &[u8]) -> Result<Vec<u8>, BackendError> {
        let seed = seed(secret)?;
        let point = EdwardsPoint::mul_base_clamped(*scalar_bytes(&seed));

        let mut public = Vec::with_capacity(PARAMS.fieldsize);
        public.extend_from_slice(point.compress().as_bytes());
        public.extend_from_slice(point.to_montgomery().as_bytes());
        Ok(public)
    }

    fn validate_public(&self, public: &[u8]) -> bool {
        parse_public(public).is_some()
    }

    fn diffie_hellman(
        &self,
        secret: &[u8],
        peer: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, BackendError> {
        let seed = seed(secret)?;
        let peer = parse_public(peer).ok_or(BackendError::InvalidPublicKey)?;

        let shared = peer.mul_clamped(*scalar_bytes(&seed));
        if bool::from(shared.as_bytes()[..].ct_eq(&[0u8; KEY_SIZE][..])) {
            return Err(BackendError::DegenerateSharedSecret);
        }
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }

    fn sign(&self, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, BackendError> {
        let seed = seed(secret)?;
        let key = SigningKey::from_bytes(&seed);
        Ok(key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool {
        if parse_public(public).is_none() {
            return false;
        }
        let mut edwards = [0u8; KEY_SIZE];
        edwards.copy_from_slice(&public[..KEY_SIZE]);

        let Ok(key) = VerifyingKey::from_bytes(&edwards) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
