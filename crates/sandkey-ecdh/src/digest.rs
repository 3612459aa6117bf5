//! Hashing, HMAC and key derivation over the curve's hash function
//!
//! All functions are pure. Digests and tags come back as small owned vectors;
//! the derivations write into storage the caller already allocated, so their
//! output length is bounded by whatever the caller could reserve.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

/// Hash function bound to a curve backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256 (32-byte digest)
    Sha256,
    /// SHA-512 (64-byte digest)
    Sha512,
}

impl HashAlgorithm {
    /// Digest size in bytes.
    pub fn output_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Digest of `data`.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Full-length HMAC tag of `data` under `key`.
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Zeroizing<Vec<u8>> {
        let mut mac = Prf::new(self, key);
        mac.update(data);
        mac.finalize()
    }

    /// KDF2 from IEEE 1363a, filling `out`.
    ///
    /// Concatenates `H(secret || counter || params)` for a 32-bit big-endian
    /// counter starting at 1, truncated to `out.len()` bytes. Blocks are hashed
    /// straight into `out`, so the output never exists anywhere else.
    pub fn kdf2(self, secret: &[u8], params: &[u8], out: &mut [u8]) {
        for (chunk, counter) in out.chunks_mut(self.output_size()).zip(1..=u32::MAX) {
            let block = Zeroizing::new(match self {
                Self::Sha256 => Sha256::new()
                    .chain_update(secret)
                    .chain_update(counter.to_be_bytes())
                    .chain_update(params)
                    .finalize()
                    .to_vec(),
                Self::Sha512 => Sha512::new()
                    .chain_update(secret)
                    .chain_update(counter.to_be_bytes())
                    .chain_update(params)
                    .finalize()
                    .to_vec(),
            });
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }

    /// PBKDF2 (RFC 8018) with HMAC over this hash, filling `out`.
    ///
    /// `iterations` must be at least 1.
    pub fn pbkdf2(self, password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
        debug_assert!(iterations >= 1, "PBKDF2 needs at least one iteration");
        match self {
            Self::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, out),
            Self::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, out),
        }
    }
}

/// Keyed HMAC state for either hash.
enum Prf {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl Prf {
    fn new(algorithm: HashAlgorithm, key: &[u8]) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => {
                let Ok(mac) = Hmac::<Sha256>::new_from_slice(key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                Self::Sha256(mac)
            },
            HashAlgorithm::Sha512 => {
                let Ok(mac) = Hmac::<Sha512>::new_from_slice(key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                Self::Sha512(mac)
            },
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(mac) => mac.update(data),
            Self::Sha512(mac) => mac.update(data),
        }
    }

    fn finalize(self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(match self {
            Self::Sha256(mac) => mac.finalize().into_bytes().to_vec(),
            Self::Sha512(mac) => mac.finalize().into_bytes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kdf2(hash: HashAlgorithm, secret: &[u8], params: &[u8], len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        hash.kdf2(secret, params, &mut out);
        out
    }

    fn pbkdf2(
        hash: HashAlgorithm,
        password: &[u8],
        salt: &[u8],
        rounds: u32,
        len: usize,
    ) -> Vec<u8> {
        let mut out = vec![0u8; len];
        hash.pbkdf2(password, salt, rounds, &mut out);
        out
    }

    #[test]
    fn output_sizes_match_digests() {
        assert_eq!(HashAlgorithm::Sha256.hash(b"").len(), HashAlgorithm::Sha256.output_size());
        assert_eq!(HashAlgorithm::Sha512.hash(b"").len(), HashAlgorithm::Sha512.output_size());
    }

    #[test]
    fn hmac_sha256_rfc4231_case_2() {
        let tag = HashAlgorithm::Sha256.hmac(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            tag.as_slice(),
            [
                0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
                0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
                0x64, 0xec, 0x38, 0x43,
            ]
        );
    }

    #[test]
    fn kdf2_is_deterministic_and_prefix_stable() {
        let short = kdf2(HashAlgorithm::Sha256, b"shared", b"params", 16);
        let long = kdf2(HashAlgorithm::Sha256, b"shared", b"params", 80);

        assert_eq!(short.len(), 16);
        assert_eq!(long.len(), 80);
        assert_eq!(&long[..16], short.as_slice());
        assert_eq!(long, kdf2(HashAlgorithm::Sha256, b"shared", b"params", 80));
    }

    #[test]
    fn kdf2_first_block_is_hash_of_counter_one() {
        let mut input = b"z".to_vec();
        input.extend_from_slice(&1u32.to_be_bytes());
        input.extend_from_slice(b"p");

        let out = kdf2(HashAlgorithm::Sha512, b"z", b"p", 64);
        assert_eq!(out.as_slice(), HashAlgorithm::Sha512.hash(&input));
    }

    #[test]
    fn kdf2_params_change_output() {
        let a = kdf2(HashAlgorithm::Sha256, b"shared", b"a", 32);
        let b = kdf2(HashAlgorithm::Sha256, b"shared", b"b", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn pbkdf2_sha256_one_iteration() {
        let out = pbkdf2(HashAlgorithm::Sha256, b"password", b"salt", 1, 32);
        assert_eq!(
            out.as_slice(),
            [
                0x12, 0x0f, 0xb6, 0xcf, 0xfc, 0xf8, 0xb3, 0x2c, 0x43, 0xe7, 0x22, 0x52, 0x56, 0xc4,
                0xf8, 0x37, 0xa8, 0x65, 0x48, 0xc9, 0x2c, 0xcc, 0x35, 0x48, 0x08, 0x05, 0x98, 0x7c,
                0xb7, 0x0b, 0xe1, 0x7b,
            ]
        );
    }

    #[test]
    fn pbkdf2_iterations_change_output() {
        let one = pbkdf2(HashAlgorithm::Sha512, b"password", b"salt", 1, 64);
        let two = pbkdf2(HashAlgorithm::Sha512, b"password", b"salt", 2, 64);
        assert_ne!(one, two);
    }

    #[test]
    fn zero_length_outputs_are_empty() {
        assert!(kdf2(HashAlgorithm::Sha256, b"k", b"", 0).is_empty());
        assert!(pbkdf2(HashAlgorithm::Sha256, b"k", b"s", 1, 0).is_empty());
    }
}
