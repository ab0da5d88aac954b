//! MurmurHash3, x64 128-bit variant, with one-shot and streaming APIs.
//!
//! This is a fast non-cryptographic hash.  It offers no resistance to
//! deliberately constructed collisions.
//!
//! ```
//! use murmur3_digest::{sum128, Digest128};
//!
//! let streamed = Digest128::new().write(b"hello, ").write(b"world").sum128();
//! assert_eq!(streamed, sum128(b"hello, world"));
//! ```

pub mod digest;
pub mod mixer;
pub mod stats;

pub use digest::{BuildMurmur3, Digest128};
pub use mixer::DIGEST_SIZE_BYTES;

/// Hashes `data` with seed zero.
pub fn sum128(data: &[u8]) -> (u64, u64) {
    sum128_with_seed(data, 0)
}

/// Hashes `data` with the given seed, returning `(h1, h2)`.
pub fn sum128_with_seed(data: &[u8], seed: u32) -> (u64, u64) {
    Digest128::with_seed(seed).write(data).sum128()
}
