//! The MurmurHash3 x64-128 block mixer and finalizer.

pub const IN_SIZE_BYTES: usize = 128 / 8;
pub const OUT_SIZE_BYTES: usize = 128 / 8;
pub const DIGEST_SIZE_BYTES: usize = 128 / 8;

pub const C1: u64 = 0x87c37b91114253d5;
pub const C2: u64 = 0x4cf5ad432745937f;

/// Pre-mixes the low word of a block before it's xored into `h1`.
#[inline(always)]
pub fn mix_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

/// Pre-mixes the high word of a block before it's xored into `h2`.
#[inline(always)]
pub fn mix_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

/// Mixes one 16-byte block into the accumulators.
///
/// The block is read as two little-endian words regardless of host byte
/// order, so the result is the same on every platform.
#[inline]
pub fn mix_block(mut h1: u64, mut h2: u64, block: &[u8; 16]) -> (u64, u64) {
    let (lo, hi) = block.split_at(8);
    let k1 = u64::from_le_bytes(to_word(lo));
    let k2 = u64::from_le_bytes(to_word(hi));

    h1 ^= mix_k1(k1);
    h1 = h1.rotate_left(27);
    h1 = h1.wrapping_add(h2);
    h1 = h1.wrapping_mul(5).wrapping_add(0x52dce729);

    h2 ^= mix_k2(k2);
    h2 = h2.rotate_left(31);
    h2 = h2.wrapping_add(h1);
    h2 = h2.wrapping_mul(5).wrapping_add(0x38495ab5);

    (h1, h2)
}

/// Folds the 0 to 15 leftover bytes of a message into the accumulators.
///
/// Bytes 0..8 build `k1` and bytes 8..15 build `k2`, each placed at bit
/// `8 * (offset % 8)`.  A word is only folded in when at least one of its
/// bytes is present.
pub fn fold_tail(mut h1: u64, mut h2: u64, tail: &[u8]) -> (u64, u64) {
    assert!(
        tail.len() < 16,
        "tail must hold fewer than 16 bytes, got {}",
        tail.len()
    );

    if tail.len() > 8 {
        let mut k2 = 0u64;
        for (i, &byte) in tail[8..].iter().enumerate() {
            k2 ^= (byte as u64) << (8 * i);
        }
        h2 ^= mix_k2(k2);
    }

    if !tail.is_empty() {
        let mut k1 = 0u64;
        for (i, &byte) in tail.iter().take(8).enumerate() {
            k1 ^= (byte as u64) << (8 * i);
        }
        h1 ^= mix_k1(k1);
    }

    (h1, h2)
}

/// The 64-bit avalanche finalizer.
#[inline]
pub fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}

/// Mixes the total message length into the accumulators and avalanches
/// them into the final 128-bit hash.
pub fn finalize(mut h1: u64, mut h2: u64, total_len: u64) -> (u64, u64) {
    h1 ^= total_len;
    h2 ^= total_len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1, h2)
}

/// The Murmur3 block accumulator, starting from the zero state.
///
/// Only the block mixer runs here, no finalization, so this shows how much
/// diffusion a single block gets before anything else is absorbed.
pub fn mix_input(in_bytes: &[u8], out_bytes: &mut [u8]) {
    assert!(in_bytes.len() == IN_SIZE_BYTES);
    assert!(out_bytes.len() == OUT_SIZE_BYTES);

    let mut block = [0u8; 16];
    block.copy_from_slice(in_bytes);
    let (h1, h2) = mix_block(0, 0, &block);

    // Copy the mixed state to the output.
    out_bytes[0..8].copy_from_slice(&u64::to_le_bytes(h1));
    out_bytes[8..16].copy_from_slice(&u64::to_le_bytes(h2));
}

fn to_word(bytes: &[u8]) -> [u8; 8] {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    word
}
