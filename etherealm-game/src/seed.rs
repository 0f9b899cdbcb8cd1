//! Deterministic seeds for per-account, per-day rolls.
//!
//! Daily quest picks must be identical on every reload of the same day, so
//! they come from a stream keyed by the account and the day rather than from
//! ambient entropy.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

use crate::daily::GameDay;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Stable seed for an account namespace (address or `guest`).
#[must_use]
pub fn account_seed(account: &str) -> u64 {
    let mut buf = Vec::with_capacity(account.len() + 6);
    buf.extend_from_slice(b"ETHRL-");
    buf.extend_from_slice(account.to_ascii_lowercase().as_bytes());
    fnv1a64(&buf)
}

/// Domain-separated sub-seed via HMAC-SHA256 keyed by `user_seed`.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        // HMAC accepts keys of any length.
        return fnv1a64(domain_tag) ^ user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// RNG for one `domain` roll on `day`.
#[must_use]
pub fn daily_rng(user_seed: u64, domain: &str, day: GameDay) -> ChaCha8Rng {
    let mut tag = Vec::with_capacity(domain.len() + 5);
    tag.extend_from_slice(domain.as_bytes());
    tag.push(b':');
    tag.extend_from_slice(&day.0.to_le_bytes());
    ChaCha8Rng::seed_from_u64(derive_stream_seed(user_seed, &tag))
}
