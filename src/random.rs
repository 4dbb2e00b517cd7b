//! Secure random number generation.
//!
//! Provides cryptographically secure random bytes using the operating
//! system's entropy source. Cell identifiers and padding content must be
//! unpredictable to an observer, so they come from here rather than from
//! the statistical sampling RNG.

use rand::RngCore;
use rand_core::OsRng;

/// Cryptographically secure random number generator.
///
/// Wraps the OS-provided entropy source (e.g., /dev/urandom on Unix,
/// BCryptGenRandom on Windows).
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }

    /// Generate a random u16.
    pub fn u16() -> u16 {
        (OsRng.next_u32() & 0xffff) as u16
    }

    /// Generate a random u64.
    pub fn u64() -> u64 {
        OsRng.next_u64()
    }
}

/// Generate random padding of the specified length.
///
/// The padding is filled with random bytes to make traffic analysis harder.
pub fn random_padding(len: usize) -> Vec<u8> {
    let mut padding = vec![0u8; len];
    SecureRandom::fill(&mut padding);
    padding
}

/// Generate a random delay in microseconds within a range.
///
/// Useful for timing obfuscation.
pub fn random_delay_us(min_us: u64, max_us: u64) -> u64 {
    if min_us >= max_us {
        return min_us;
    }
    let range = max_us - min_us;
    min_us + (SecureRandom::u64() % range)
}
