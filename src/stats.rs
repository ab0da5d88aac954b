//! Avalanche measurements for the hash and its block mixer.

use std::fmt;

use nanorand::{Rng, WyRand};

use crate::digest::Digest128;

pub struct Stats {
    pub input_bit_len: usize,
    pub output_bit_len: usize,

    // The number of samples accumulated.  Or put another way, the number of
    // rounds used to generate the chart.
    pub sample_count: usize,

    // `input_bit_len * output_bit_len` long.  Each element is a count of the
    // number of bit flips for a given in/out bit pairing.
    pub avalanche_chart: Vec<u32>,
}

impl Stats {
    pub fn new(input_bit_len: usize, output_bit_len: usize) -> Self {
        Self {
            input_bit_len: input_bit_len,
            output_bit_len: output_bit_len,
            sample_count: 0,
            avalanche_chart: vec![0; input_bit_len * output_bit_len],
        }
    }

    pub fn accumulate(&mut self, in_bit: usize, out_bit: usize, flipped: bool) {
        self.avalanche_chart[in_bit * self.output_bit_len + out_bit] += flipped as u32;
    }

    pub fn get(&self, in_bit: usize, out_bit: usize) -> u32 {
        self.avalanche_chart[in_bit * self.output_bit_len + out_bit]
    }

    pub fn get_row(&self, in_bit: usize) -> &[u32] {
        let start = in_bit * self.output_bit_len;
        let end = start + self.output_bit_len;
        &self.avalanche_chart[start..end]
    }

    /// How many output bits' worth of diffusion flipping `in_bit` achieves.
    pub fn row_diffusion(&self, in_bit: usize) -> f64 {
        let norm = 1.0 / self.sample_count as f64;
        self.get_row(in_bit)
            .iter()
            .map(|&flips| 1.0 - p_to_bias(flips as f64 * norm))
            .sum()
    }

    pub fn row_entropy(&self, in_bit: usize) -> f64 {
        let norm = 1.0 / self.sample_count as f64;
        self.get_row(in_bit)
            .iter()
            .map(|&flips| p_to_entropy(flips as f64 * norm))
            .sum()
    }

    pub fn average_bias(&self) -> f64 {
        let norm = 1.0 / self.sample_count as f64;

        let bias_sum: f64 = self
            .avalanche_chart
            .iter()
            .map(|&flips| p_to_bias(flips as f64 * norm))
            .sum();
        bias_sum / self.avalanche_chart.len() as f64
    }

    pub fn min_bias(&self) -> f64 {
        self.biases().fold(f64::INFINITY, f64::min)
    }

    pub fn max_bias(&self) -> f64 {
        self.biases().fold(0.0, f64::max)
    }

    pub fn min_input_bit_diffusion(&self) -> f64 {
        (0..self.input_bit_len)
            .map(|i| self.row_diffusion(i))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn avg_input_bit_diffusion(&self) -> f64 {
        let sum: f64 = (0..self.input_bit_len).map(|i| self.row_diffusion(i)).sum();
        sum / self.input_bit_len as f64
    }

    pub fn max_input_bit_diffusion(&self) -> f64 {
        (0..self.input_bit_len)
            .map(|i| self.row_diffusion(i))
            .fold(0.0, f64::max)
    }

    pub fn min_input_bit_entropy(&self) -> f64 {
        (0..self.input_bit_len)
            .map(|i| self.row_entropy(i))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn avg_input_bit_entropy(&self) -> f64 {
        let sum: f64 = (0..self.input_bit_len).map(|i| self.row_entropy(i)).sum();
        sum / self.input_bit_len as f64
    }

    pub fn max_input_bit_entropy(&self) -> f64 {
        (0..self.input_bit_len)
            .map(|i| self.row_entropy(i))
            .fold(0.0, f64::max)
    }

    fn biases(&self) -> impl Iterator<Item = f64> + '_ {
        let norm = 1.0 / self.sample_count as f64;
        self.avalanche_chart
            .iter()
            .map(move |&flips| p_to_bias(flips as f64 * norm))
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "    Bias:
        Min: {:0.2}
        Avg: {:0.2}
        Max: {:0.2}
    Input Bit Diffusion (output size = {} bits):
        Min: {:0.1} bits
        Avg: {:0.1} bits
        Max: {:0.1} bits
    Input Bit Diffusion Entropy (output size = {} bits):
        Min: {:0.1} bits
        Avg: {:0.1} bits
        Max: {:0.1} bits",
            self.min_bias(),
            self.average_bias(),
            self.max_bias(),
            self.output_bit_len,
            self.min_input_bit_diffusion(),
            self.avg_input_bit_diffusion(),
            self.max_input_bit_diffusion(),
            self.output_bit_len,
            self.min_input_bit_entropy(),
            self.avg_input_bit_entropy(),
            self.max_input_bit_entropy(),
        )
    }
}

/// Computes an avalanche chart for a given mix function, using a provided
/// input generator.
///
/// - `generate_input`: function that takes a seed and generates an input.
///   The result should be deterministic based on the seed.  The seed starts
///   from zero and increments each round.
/// - `mix`: function that takes input and mixes it to produce an output.  Any
///   data already in the output parameter must be ignored and overwritten.
/// - `input_size`: size of `mix`'s input, in bytes.
/// - `output_size`: size of `mix`'s output, in bytes.
/// - `rounds`: how many test rounds to perform to produce the estimated chart.
pub fn compute_stats<F1, F2>(
    generate_input: F1,
    mix: F2,
    input_size: usize,
    output_size: usize,
    rounds: usize,
) -> Stats
where
    F1: Fn(usize, &mut [u8]),
    F2: Fn(&[u8], &mut [u8]),
{
    let mut chart = Stats::new(input_size * 8, output_size * 8);

    let mut input = vec![0u8; input_size];
    let mut output = vec![0u8; output_size];
    let mut input_tweaked = vec![0u8; input_size];
    let mut output_tweaked = vec![0u8; output_size];

    for round in 0..rounds {
        log::trace!("avalanche round {}/{}", round, rounds);

        generate_input(round, &mut input[..]);

        mix(&input[..], &mut output[..]);
        for in_bit_idx in 0..(input_size * 8) {
            input_tweaked.copy_from_slice(&input[..]);
            input_tweaked[in_bit_idx / 8] ^= 1 << (in_bit_idx % 8);
            mix(&input_tweaked[..], &mut output_tweaked[..]);

            for out_bit_idx in 0..(output_size * 8) {
                let i = out_bit_idx / 8;
                let mask = 1 << (out_bit_idx % 8);
                let flipped = (output[i] & mask) != (output_tweaked[i] & mask);

                chart.accumulate(in_bit_idx, out_bit_idx, flipped);
            }
        }

        chart.sample_count += 1;
    }

    log::debug!(
        "avalanche over {} rounds of {}-byte inputs: average bias {:0.4}",
        rounds,
        input_size,
        chart.average_bias()
    );

    chart
}

/// Mix function that runs the whole input through a seeded `Digest128` and
/// outputs the serialized 128-bit hash.
pub fn hash_mix_fn(seed: u32) -> impl Fn(&[u8], &mut [u8]) {
    move |in_bytes, out_bytes| {
        out_bytes.copy_from_slice(&Digest128::with_seed(seed).write(in_bytes).to_bytes());
    }
}

pub fn p_to_bias(p: f64) -> f64 {
    (p * 2.0 - 1.0).abs()
}

pub fn p_to_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        0.0
    } else {
        let q = 1.0 - p;
        -(p * p.log2()) - (q * q.log2())
    }
}

//-------------------------------------------------------------

/// Generates a random byte stream.
pub fn generate_random(seed: usize, bytes: &mut [u8]) {
    let mut rng = WyRand::new_seed(mix64(seed as u64));
    rng.fill_bytes(bytes);
}

/// Generates a byte stream with all zero bits except one.
pub fn generate_single_1_bit(index: usize, bytes: &mut [u8]) {
    let bit_idx = index % (bytes.len() * 8);
    bytes.fill(0);
    bytes[bit_idx / 8] = 1 << (bit_idx % 8);
}

/// Generates a byte stream with the lowest bits simply counting up as an
/// incrementing integer.
pub fn generate_counting(index: usize, bytes: &mut [u8]) {
    let count = u64::to_le_bytes(index as u64);
    let n = bytes.len().min(count.len());
    bytes[..n].copy_from_slice(&count[..n]);
    bytes[n..].fill(0);
}

/// 64-bit bijective bit mixer, used to decorrelate sequential rng seeds.
fn mix64(mut n: u64) -> u64 {
    // Break zero sensitivity.
    n ^= 0x7be355f7c2e736d2;

    // http://zimbry.blogspot.ch/2011/09/better-bit-mixing-improving-on.html
    // (variant "Mix13")
    n ^= n >> 30;
    n = n.wrapping_mul(0xbf58476d1ce4e5b9);
    n ^= n >> 27;
    n = n.wrapping_mul(0x94d049bb133111eb);
    n ^= n >> 31;

    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer;

    #[test]
    fn bias_and_entropy_endpoints() {
        assert_eq!(p_to_bias(0.5), 0.0);
        assert_eq!(p_to_bias(0.0), 1.0);
        assert_eq!(p_to_bias(1.0), 1.0);
        assert_eq!(p_to_entropy(0.0), 0.0);
        assert_eq!(p_to_entropy(1.0), 0.0);
        assert!((p_to_entropy(0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_bit_generator_walks_every_bit() {
        let mut bytes = [0xffu8; 2];
        generate_single_1_bit(0, &mut bytes);
        assert_eq!(bytes, [1, 0]);
        generate_single_1_bit(9, &mut bytes);
        assert_eq!(bytes, [0, 2]);
        generate_single_1_bit(16, &mut bytes);
        assert_eq!(bytes, [1, 0]);
    }

    #[test]
    fn counting_generator_handles_short_buffers() {
        let mut bytes = [0xffu8; 12];
        generate_counting(0x0102, &mut bytes);
        assert_eq!(bytes, [2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let mut short = [0u8; 3];
        generate_counting(0x030201, &mut short);
        assert_eq!(short, [1, 2, 3]);
    }

    #[test]
    fn random_generator_is_deterministic() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        generate_random(5, &mut a);
        generate_random(5, &mut b);
        assert_eq!(a, b);

        generate_random(6, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn full_hash_avalanches_well() {
        let stats = compute_stats(generate_random, hash_mix_fn(0), 16, 16, 256);
        assert_eq!(stats.sample_count, 256);
        assert!(stats.average_bias() < 0.1, "{}", stats);
        assert!(stats.max_bias() < 0.5, "{}", stats);
        assert!(stats.min_input_bit_diffusion() > 100.0, "{}", stats);
    }

    #[test]
    fn lone_block_mixer_leaves_h1_blind_to_k2() {
        let stats = compute_stats(
            generate_random,
            mixer::mix_input,
            mixer::IN_SIZE_BYTES,
            mixer::OUT_SIZE_BYTES,
            64,
        );

        // Bits of the second input word never reach the first output word.
        for in_bit in 64..128 {
            assert!(stats.get_row(in_bit)[..64].iter().all(|&flips| flips == 0));
        }
        assert!(stats.get(0, 0) > 0);
        assert_eq!(stats.max_bias(), 1.0);
    }

    #[test]
    fn report_mentions_every_section() {
        let stats = compute_stats(generate_counting, hash_mix_fn(1), 4, 16, 8);
        let report = stats.to_string();
        assert!(report.contains("Bias:"));
        assert!(report.contains("Input Bit Diffusion (output size = 128 bits)"));
        assert!(report.contains("Input Bit Diffusion Entropy"));
    }
}
