//! Blake2b digests used for commit ids and submission ids.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

type Blake2b256 = Blake2b<U32>;

static NONCE: AtomicU64 = AtomicU64::new(0);

/// Hash multiple byte slices in sequence. Each part is length-prefixed so
/// `["ab", "c"]` and `["a", "bc"]` hash differently.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hex-encoded deterministic digest of `parts` under a domain tag.
pub fn digest_hex(domain: &str, parts: &[&[u8]]) -> String {
    let mut all: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
    all.push(domain.as_bytes());
    all.extend_from_slice(parts);
    hex::encode(blake2b_256_multi(&all))
}

/// Hex-encoded digest that is unique within this process: mixes the
/// wall-clock nanoseconds and a monotonically increasing nonce into `parts`.
pub fn unique_digest_hex(domain: &str, parts: &[&[u8]]) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .to_le_bytes();
    let nonce = NONCE.fetch_add(1, Ordering::Relaxed).to_le_bytes();
    let mut all: Vec<&[u8]> = Vec::with_capacity(parts.len() + 2);
    all.extend_from_slice(parts);
    all.push(&nanos);
    all.push(&nonce);
    digest_hex(domain, &all)
}
