//! Per-keyring CSPRNG seeding
//!
//! Every keyring owns a ChaCha20 generator seeded once at creation from OS
//! entropy, with the current Unix time folded into the last four bytes of the
//! seed. There is no reseed operation.
//!
//! Entropy and clock are read through [`EntropySource`] so tests can pin the
//! seed; production uses [`SystemEntropy`].

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::EntropyError;

/// Seed length of the keyring generator.
pub const SEED_SIZE: usize = 32;

/// Bytes at the end of the seed overwritten by the timestamp.
const TIMESTAMP_SIZE: usize = 4;

/// Source of seed material and wall-clock time.
pub trait EntropySource {
    /// Fills `buffer` with unpredictable bytes.
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;

    /// Seconds since the Unix epoch.
    fn unix_time(&self) -> u64;
}

/// OS entropy (getrandom) and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        getrandom::fill(buffer).map_err(|err| EntropyError { reason: err.to_string() })
    }

    #[allow(clippy::disallowed_methods)]
    fn unix_time(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Seed built from `source`: entropy with the big-endian timestamp at the end.
///
/// If the source fails the seed degrades to the timestamp alone; the failure
/// is logged rather than surfaced.
pub fn seed_from(source: &dyn EntropySource) -> Zeroizing<[u8; SEED_SIZE]> {
    let mut seed = Zeroizing::new([0u8; SEED_SIZE]);

    if let Err(err) = source.fill(seed.as_mut_slice()) {
        warn!(%err, "entropy source failed, seeding keyring generator from time only");
        seed.fill(0);
    }

    let time = source.unix_time() as u32;
    seed[SEED_SIZE - TIMESTAMP_SIZE..].copy_from_slice(&time.to_be_bytes());
    seed
}

/// Fresh keyring generator seeded from `source`.
pub fn seeded_rng(source: &dyn EntropySource) -> ChaCha20Rng {
    ChaCha20Rng::from_seed(*seed_from(source))
}
