//! secp256k1 backend
//!
//! Secret keys are 32-byte big-endian scalars in `[1, n)`. Public keys are
//! uncompressed SEC1 points (`0x04 || x || y`). Key agreement returns the
//! affine x-coordinate of the shared point; signatures are deterministic
//! ECDSA over SHA-256 (RFC 6979), encoded as `r || s`.

use k256::{
    PublicKey, SecretKey,
    ecdh::diffie_hellman,
    ecdsa::{
        Signature, SigningKey, VerifyingKey,
        signature::{Signer, Verifier},
    },
    elliptic_curve::sec1::ToEncodedPoint,
};
use zeroize::Zeroizing;

use super::{CurveBackend, CurveParams};
use crate::{cipher::AeadAlgorithm, digest::HashAlgorithm, error::BackendError};

const KEY_SIZE: usize = 32;

/// SEC1 tag of an uncompressed point.
const UNCOMPRESSED_TAG: u8 = 0x04;

const PARAMS: CurveParams = CurveParams {
    name: "secp256k1",
    aliases: &["k256"],
    keysize: KEY_SIZE,
    fieldsize: 1 + 2 * KEY_SIZE,
    hash: HashAlgorithm::Sha256,
    aead: AeadAlgorithm::AesGcm,
};

/// ECDH and ECDSA over secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1;

fn secret_key(secret: &[u8]) -> Result<SecretKey, BackendError> {
    if secret.len() != KEY_SIZE {
        return Err(BackendError::InvalidSecretKey);
    }
    SecretKey::from_slice(secret).map_err(|_| BackendError::InvalidSecretKey)
}

fn parse_public(public: &[u8]) -> Option<PublicKey> {
    if public.len() != PARAMS.fieldsize || public[0] != UNCOMPRESSED_TAG {
        return None;
    }
    PublicKey::from_sec1_bytes(public).ok()
}

impl CurveBackend for Secp256k1 {
    fn params(&self) -> &CurveParams {
        &PARAMS
    }

    fn derive_public(&self, secret: &[u8]) -> Result<Vec<u8>, BackendError> {
        let key = secret_key(secret)?;
        Ok(key.public_key().to_encoded_point(false).as_bytes().to_vec())
    }

    fn validate_public(&self, public: &[u8]) -> bool {
        parse_public(public).is_some()
    }

    fn diffie_hellman(
        &self,
        secret: &[u8],
        peer: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, BackendError> {
        let key = secret_key(secret)?;
        let peer = parse_public(peer).ok_or(BackendError::InvalidPublicKey)?;

        let shared = diffie_hellman(key.to_nonzero_scalar(), peer.as_affine());
        Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
    }

    fn sign(&self, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, BackendError> {
        let key = SigningKey::from(&secret_key(secret)?);
        let signature: Signature = key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, public: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Some(public) = parse_public(public) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        VerifyingKey::from(&public).verify(message, &signature).is_ok()
    }
}
