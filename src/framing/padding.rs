//! Content-shaped padding generation.
//!
//! Padding is cosmetic content shaping, not a security mechanism: for
//! web-browsing cover it is made to look like encoded text or structured
//! header noise rather than uniformly random bytes, which some DPI
//! heuristics flag.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use rand::Rng;

use crate::profile::TrafficClass;
use crate::random::{random_padding, SecureRandom};

/// Interval at which structured padding inserts a zero byte.
const ZERO_BYTE_PERIOD: usize = 10;

/// Generate `len` bytes of padding shaped for the given traffic class.
///
/// Web-browsing padding alternates between a base64-looking encoding of
/// random bytes and random bytes punctuated by a periodic zero byte; all
/// other classes get uniformly random bytes.
pub fn shaped_padding(len: usize, class: TrafficClass) -> Bytes {
    if len == 0 {
        return Bytes::new();
    }

    if class == TrafficClass::WebBrowsing {
        if rand::thread_rng().gen_bool(0.5) {
            return base64_like(len);
        }
        return zero_punctuated(len);
    }

    Bytes::from(random_padding(len))
}

/// Random bytes run through base64 so the padding scans as encoded text.
///
/// The encoded output may come up short of `len` when `len` is not a
/// multiple of four; the tail is topped up with random bytes.
fn base64_like(len: usize) -> Bytes {
    let raw = random_padding(len / 4 * 3);
    let encoded = BASE64.encode(&raw).into_bytes();

    let mut padding = vec![0u8; len];
    if encoded.len() >= len {
        padding.copy_from_slice(&encoded[..len]);
    } else {
        padding[..encoded.len()].copy_from_slice(&encoded);
        SecureRandom::fill(&mut padding[encoded.len()..]);
    }
    Bytes::from(padding)
}

/// Random bytes with a zero byte every [`ZERO_BYTE_PERIOD`] positions,
/// mimicking length-delimited header noise.
fn zero_punctuated(len: usize) -> Bytes {
    let mut padding = random_padding(len);
    for index in (0..padding.len()).step_by(ZERO_BYTE_PERIOD) {
        padding[index] = 0x00;
    }
    Bytes::from(padding)
}
