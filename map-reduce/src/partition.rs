//! Routing of intermediate keys to reduce buckets.

use fnv::FnvHasher;
use std::hash::Hasher;

/// 64-bit FNV-1a over the key's bytes, masked to 31 bits.
///
/// This is `fnv::FnvHasher`, not the 32-bit FNV-1a variant, so bucket numbers
/// differ from implementations that use `fnv32a`. Every worker here uses the
/// same function, which is all routing needs.
///
/// Only the raw bytes are hashed (no length prefix as `Hash for str` would
/// add), so the result is the same on every worker regardless of platform.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Bucket in `[0, n_reduce)` for `key`.
pub fn bucket(key: &str, n_reduce: usize) -> usize {
    assert!(n_reduce > 0, "n_reduce must be non-zero");
    ihash(key) as usize % n_reduce
}
