//! Symmetric encryption: AES-CBC and the two AEAD constructions
//!
//! CBC uses an all-zero IV and PKCS#7 padding, so identical plaintexts under
//! the same key encrypt identically. It exists for compatibility with scripts
//! that expect it; new code should use the AEAD path.
//!
//! The AEAD functions return the tag detached from the ciphertext. Decryption
//! does not verify: it returns the plaintext together with the tag recomputed
//! over the ciphertext, and the caller compares tags in constant time.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use chacha20poly1305::{
    ChaCha20Poly1305,
    aead::{AeadCore, AeadInPlace, KeyInit, Nonce, generic_array::typenum::Unsigned},
};
use zeroize::Zeroizing;

use crate::error::BackendError;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Nonce size shared by both AEAD constructions.
pub const AEAD_NONCE_SIZE: usize = 12;

/// Authentication tag size shared by both AEAD constructions.
pub const AEAD_TAG_SIZE: usize = 16;

const ZERO_IV: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// AES-CBC encrypt with a zero IV and PKCS#7 padding.
///
/// The key selects AES-128, AES-192 or AES-256 by length. The output is always
/// a whole number of blocks and at least one block longer than a block-aligned
/// input.
pub fn cbc_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
    let invalid = |_| BackendError::InvalidKeyLength { actual: key.len() };
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        actual => return Err(BackendError::InvalidKeyLength { actual }),
    };
    Ok(ciphertext)
}

/// AES-CBC decrypt with a zero IV, stripping PKCS#7 padding.
pub fn cbc_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, BackendError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(BackendError::InvalidCiphertextLength { actual: ciphertext.len() });
    }

    let invalid = |_| BackendError::InvalidKeyLength { actual: key.len() };
    let plaintext = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, &ZERO_IV)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        actual => return Err(BackendError::InvalidKeyLength { actual }),
    };
    plaintext.map(Zeroizing::new).map_err(|_| BackendError::InvalidPadding)
}

/// Authenticated encryption construction bound to a curve backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    /// ChaCha20-Poly1305 (RFC 8439), 32-byte key
    ChaCha20Poly1305,
    /// AES-GCM, 16- or 32-byte key
    AesGcm,
}

impl AeadAlgorithm {
    /// Encrypt `plaintext`, returning the ciphertext and the detached tag.
    pub fn encrypt(
        self,
        key: &[u8],
        nonce: &[u8],
        header: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), BackendError> {
        match self {
            Self::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new_from_slice(key)
                    .map_err(|_| BackendError::InvalidKeyLength { actual: key.len() })?;
                seal(&cipher, nonce, header, plaintext)
            },
            Self::AesGcm => match key.len() {
                16 => seal(&aes_gcm_key::<Aes128Gcm>(key)?, nonce, header, plaintext),
                32 => seal(&aes_gcm_key::<Aes256Gcm>(key)?, nonce, header, plaintext),
                actual => Err(BackendError::InvalidKeyLength { actual }),
            },
        }
    }

    /// Decrypt `ciphertext` without verifying it.
    ///
    /// Returns the plaintext and the tag a genuine ciphertext would carry.
    pub fn decrypt(
        self,
        key: &[u8],
        nonce: &[u8],
        header: &[u8],
        ciphertext: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), BackendError> {
        match self {
            Self::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new_from_slice(key)
                    .map_err(|_| BackendError::InvalidKeyLength { actual: key.len() })?;
                open(&cipher, nonce, header, ciphertext)
            },
            Self::AesGcm => match key.len() {
                16 => open(&aes_gcm_key::<Aes128Gcm>(key)?, nonce, header, ciphertext),
                32 => open(&aes_gcm_key::<Aes256Gcm>(key)?, nonce, header, ciphertext),
                actual => Err(BackendError::InvalidKeyLength { actual }),
            },
        }
    }
}

fn aes_gcm_key<A: aes_gcm::KeyInit>(key: &[u8]) -> Result<A, BackendError> {
    A::new_from_slice(key).map_err(|_| BackendError::InvalidKeyLength { actual: key.len() })
}

fn nonce_for<A: AeadCore>(nonce: &[u8]) -> Result<&Nonce<A>, BackendError> {
    let expected = A::NonceSize::USIZE;
    if nonce.len() != expected {
        return Err(BackendError::InvalidIvLength { expected, actual: nonce.len() });
    }
    Ok(Nonce::<A>::from_slice(nonce))
}

fn seal<A: AeadInPlace>(
    cipher: &A,
    nonce: &[u8],
    header: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), BackendError> {
    let nonce = nonce_for::<A>(nonce)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(nonce, header, &mut buffer)
        .map_err(|_| BackendError::Cipher)?;
    Ok((buffer, tag.to_vec()))
}

fn open<A: AeadInPlace>(
    cipher: &A,
    nonce: &[u8],
    header: &[u8],
    ciphertext: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), BackendError> {
    let nonce = nonce_for::<A>(nonce)?;

    // The keystream is its own inverse: one pass over the ciphertext yields
    // the plaintext, a second pass over the plaintext yields the genuine tag.
    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    cipher
        .encrypt_in_place_detached(nonce, header, plaintext.as_mut_slice())
        .map_err(|_| BackendError::Cipher)?;

    let mut scratch = Zeroizing::new(plaintext.to_vec());
    let tag = cipher
        .encrypt_in_place_detached(nonce, header, scratch.as_mut_slice())
        .map_err(|_| BackendError::Cipher)?;

    Ok((plaintext, tag.to_vec()))
}
