use std::hash::{BuildHasher, Hasher};

use crate::mixer::{finalize, fold_tail, mix_block, DIGEST_SIZE_BYTES};

const BLOCK_SIZE: usize = 16;

/// An incremental MurmurHash3 x64-128 digest.
///
/// Bytes can be written in chunks of any size, and the hash of everything
/// written so far can be read at any point without disturbing the digest.
/// The whole state lives inline, so copying a digest forks the hash: both
/// copies continue independently from the shared prefix.
#[derive(Clone, Copy, Debug)]
pub struct Digest128 {
    seed: u32,

    // Unfinalized running hash.
    h1: u64,
    h2: u64,

    // Pending bytes that don't yet form a full block.  Only the first
    // `tail_len` bytes are meaningful, and `tail_len` is always below
    // `BLOCK_SIZE` between writes.
    tail: [u8; BLOCK_SIZE],
    tail_len: usize,

    total_len: u64,
}

impl Digest128 {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed: seed,
            h1: seed as u64,
            h2: seed as u64,
            tail: [0; BLOCK_SIZE],
            tail_len: 0,
            total_len: 0,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// The number of bytes written so far.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// The number of bytes `to_bytes` produces.
    pub fn size(&self) -> usize {
        DIGEST_SIZE_BYTES
    }

    /// Returns the digest with `data` appended, leaving `self` usable as
    /// the unextended prefix.
    #[must_use]
    pub fn write(mut self, data: &[u8]) -> Self {
        self.update(data);
        self
    }

    /// Appends `data` to the hashed stream in place.
    pub fn update(&mut self, mut data: &[u8]) {
        self.total_len = self.total_len.wrapping_add(data.len() as u64);

        if self.tail_len > 0 {
            let free = BLOCK_SIZE - self.tail_len;
            if data.len() <= free {
                let end = self.tail_len + data.len();
                self.tail[self.tail_len..end].copy_from_slice(data);
                self.tail_len = end;
                if self.tail_len == BLOCK_SIZE {
                    self.mix_tail();
                }
                return;
            }

            // Top up the pending bytes to a full block.
            let (head, rest) = data.split_at(free);
            self.tail[self.tail_len..].copy_from_slice(head);
            self.tail_len = BLOCK_SIZE;
            self.mix_tail();
            data = rest;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for chunk in &mut blocks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            (self.h1, self.h2) = mix_block(self.h1, self.h2, &block);
        }

        let rest = blocks.remainder();
        self.tail[..rest.len()].copy_from_slice(rest);
        self.tail_len = rest.len();
    }

    /// The 128-bit hash of all bytes written so far, as `(h1, h2)`.
    pub fn sum128(&self) -> (u64, u64) {
        let (h1, h2) = fold_tail(self.h1, self.h2, &self.tail[..self.tail_len]);
        finalize(h1, h2, self.total_len)
    }

    /// The hash serialized as `h1` then `h2`, each big-endian.
    ///
    /// Note that this is the opposite byte order from the one used to read
    /// input words.  Both orders match the widely deployed reference
    /// implementations and must stay as they are.
    pub fn to_bytes(&self) -> [u8; DIGEST_SIZE_BYTES] {
        let (h1, h2) = self.sum128();
        let mut out = [0u8; DIGEST_SIZE_BYTES];
        out[0..8].copy_from_slice(&h1.to_be_bytes());
        out[8..16].copy_from_slice(&h2.to_be_bytes());
        out
    }

    /// Returns `prefix` with the serialized hash appended.
    pub fn sum(&self, prefix: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(prefix.len() + DIGEST_SIZE_BYTES);
        out.extend_from_slice(prefix);
        out.extend_from_slice(&self.to_bytes());
        out
    }

    fn mix_tail(&mut self) {
        assert!(
            self.tail_len == BLOCK_SIZE,
            "expected a full block in the tail buffer, found {} bytes",
            self.tail_len
        );
        (self.h1, self.h2) = mix_block(self.h1, self.h2, &self.tail);
        self.tail_len = 0;
    }
}

impl Default for Digest128 {
    fn default() -> Self {
        Self::new()
    }
}

// Bytes past `tail_len` are leftovers from earlier blocks and don't count.
impl PartialEq for Digest128 {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.h1 == other.h1
            && self.h2 == other.h2
            && self.total_len == other.total_len
            && self.tail[..self.tail_len] == other.tail[..other.tail_len]
    }
}

impl Eq for Digest128 {}

impl Hasher for Digest128 {
    /// The low half (`h1`) of the 128-bit hash.
    fn finish(&self) -> u64 {
        self.sum128().0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}

/// Builds seeded `Digest128` hashers, e.g. for `HashMap::with_hasher`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildMurmur3 {
    pub seed: u32,
}

impl BuildHasher for BuildMurmur3 {
    type Hasher = Digest128;

    fn build_hasher(&self) -> Digest128 {
        Digest128::with_seed(self.seed)
    }
}
