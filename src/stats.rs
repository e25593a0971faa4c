//! Avalanche and bit-independence measurements for the hash, one tier and one
//! input length at a time.

use std::{fmt, fs::File, path::Path};

use nanorand::{Rng, WyRand};

use crate::{dispatch::hash_with_tier, Tier};

const OUTPUT_BITS: usize = usize::BITS as usize;

pub struct Stats {
    pub tier: Tier,
    pub input_bit_len: usize,
    pub output_bit_len: usize,

    // The number of samples accumulated.  Or put another way, the number of
    // rounds used to generate the chart.
    pub sample_count: usize,

    // `input_bit_len * output_bit_len` long.  Each element is a count of the
    // number of bit flips for a given in/out bit pairing.
    pub avalanche_chart: Vec<u32>,

    // For every input bit, the BIC quadrants for each ordered pair of
    // distinct output bits: [both, neither, only first, only second].
    pub bic_chart: Vec<[u32; 4]>,
}

impl Stats {
    pub fn new(tier: Tier, input_units: usize, do_avalanche: bool, do_bic: bool) -> Self {
        let input_bit_len = input_units * 16;
        Self {
            tier,
            input_bit_len,
            output_bit_len: OUTPUT_BITS,
            sample_count: 0,
            avalanche_chart: if do_avalanche {
                vec![0; input_bit_len * OUTPUT_BITS]
            } else {
                Vec::new()
            },
            bic_chart: if do_bic {
                vec![[0; 4]; input_bit_len * OUTPUT_BITS * (OUTPUT_BITS - 1)]
            } else {
                Vec::new()
            },
        }
    }

    fn bic_stride(&self) -> usize {
        self.output_bit_len * (self.output_bit_len - 1)
    }

    /// Records one input-bit flip given the xor of the two outputs.
    fn accumulate(&mut self, in_bit: usize, diff: usize) {
        if !self.avalanche_chart.is_empty() {
            let row = &mut self.avalanche_chart
                [in_bit * self.output_bit_len..(in_bit + 1) * self.output_bit_len];
            for (out_bit, count) in row.iter_mut().enumerate() {
                *count += ((diff >> out_bit) & 1) as u32;
            }
        }

        if !self.bic_chart.is_empty() {
            let stride = self.bic_stride();
            let n = self.output_bit_len;
            for i in 0..n {
                let flipped_a = (diff >> i) & 1 != 0;
                for j in 0..(n - 1) {
                    let flipped_b = (diff >> ((i + j + 1) % n)) & 1 != 0;
                    let quadrant = match (flipped_a, flipped_b) {
                        (true, true) => 0,
                        (false, false) => 1,
                        (true, false) => 2,
                        (false, true) => 3,
                    };
                    self.bic_chart[in_bit * stride + i * (n - 1) + j][quadrant] += 1;
                }
            }
        }
    }

    pub fn get_row(&self, in_bit: usize) -> &[u32] {
        let start = in_bit * self.output_bit_len;
        &self.avalanche_chart[start..start + self.output_bit_len]
    }

    fn norm(&self) -> f64 {
        1.0 / self.sample_count as f64
    }

    pub fn row_diffusion(&self, in_bit: usize) -> f64 {
        let norm = self.norm();
        self.get_row(in_bit)
            .iter()
            .map(|&flips| 1.0 - p_to_bias(flips as f64 * norm))
            .sum()
    }

    pub fn row_entropy(&self, in_bit: usize) -> f64 {
        let norm = self.norm();
        self.get_row(in_bit)
            .iter()
            .map(|&flips| p_to_entropy(flips as f64 * norm))
            .sum()
    }

    /// Input bits that never changed a single output bit.  Bits of a sub-word
    /// tail always land here.
    pub fn dead_input_bits(&self) -> usize {
        (0..self.input_bit_len)
            .filter(|&bit| self.get_row(bit).iter().all(|&flips| flips == 0))
            .count()
    }

    pub fn bias_range(&self) -> Range {
        let norm = self.norm();
        Range::of(
            self.avalanche_chart
                .iter()
                .map(|&flips| p_to_bias(flips as f64 * norm)),
        )
    }

    pub fn diffusion_range(&self) -> Range {
        Range::of((0..self.input_bit_len).map(|bit| self.row_diffusion(bit)))
    }

    pub fn entropy_range(&self) -> Range {
        Range::of((0..self.input_bit_len).map(|bit| self.row_entropy(bit)))
    }

    /// Per input bit, the four BIC quadrant counts averaged over every output
    /// bit pair after sorting each pair's quadrants ascending.
    pub fn row_bic_sorted_quadrants(&self, in_bit: usize) -> [f64; 4] {
        let stride = self.bic_stride();
        let start = in_bit * stride;

        let mut sum = [0u64; 4];
        for mut quadrants in self.bic_chart[start..start + stride].iter().copied() {
            quadrants.sort_unstable();
            for (total, q) in sum.iter_mut().zip(quadrants) {
                *total += q as u64;
            }
        }

        let denom = (stride * self.sample_count) as f64;
        sum.map(|total| total as f64 / denom)
    }

    /// Returns (worst, average) sorted quadrants over all input bits.  "Worst"
    /// is the row whose smallest quadrant is smallest.
    pub fn bic_summary(&self) -> ([f64; 4], [f64; 4]) {
        let mut worst = [f64::INFINITY; 4];
        let mut avg = [0.0; 4];
        for bit in 0..self.input_bit_len {
            let row = self.row_bic_sorted_quadrants(bit);
            if row[0] < worst[0] {
                worst = row;
            }
            for (a, r) in avg.iter_mut().zip(row) {
                *a += r / self.input_bit_len as f64;
            }
        }
        (worst, avg)
    }

    pub fn write_avalanche_png<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let samples = self.sample_count.max(1) as u64;
        let pixels: Vec<u8> = self
            .avalanche_chart
            .iter()
            .flat_map(|&flips| {
                let v = (flips as u64 * 255 / samples).min(255) as u8;
                [v, v, v, 255]
            })
            .collect();

        png_encode_mini::write_rgba_from_u8(
            &mut File::create(path.as_ref())?,
            &pixels,
            self.output_bit_len as u32,
            self.input_bit_len as u32,
        )?;

        Ok(())
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "    Tier: {}, input: {} bits, samples: {}",
            self.tier, self.input_bit_len, self.sample_count
        )?;

        if !self.avalanche_chart.is_empty() {
            let bias = self.bias_range();
            let diffusion = self.diffusion_range();
            let entropy = self.entropy_range();
            writeln!(
                f,
                "    Bias:
        Min: {:0.2}
        Avg: {:0.2}
        Max: {:0.2}
    Input Bit Diffusion (output = {} bits):
        Min: {:0.1} bits
        Avg: {:0.1} bits
        Max: {:0.1} bits
    Input Bit Diffusion Entropy:
        Min: {:0.1} bits
        Avg: {:0.1} bits
        Max: {:0.1} bits
    Dead input bits: {}",
                bias.min,
                bias.avg,
                bias.max,
                self.output_bit_len,
                diffusion.min,
                diffusion.avg,
                diffusion.max,
                entropy.min,
                entropy.avg,
                entropy.max,
                self.dead_input_bits(),
            )?;
        }

        if !self.bic_chart.is_empty() {
            let (worst, avg) = self.bic_summary();
            writeln!(
                f,
                "    BIC quadrants (sorted):
        Wrst: [{:0.4}, {:0.4}, {:0.4}, {:0.4}]
         Avg: [{:0.4}, {:0.4}, {:0.4}, {:0.4}]",
                worst[0], worst[1], worst[2], worst[3], avg[0], avg[1], avg[2], avg[3],
            )?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let mut range = Range {
            min: f64::INFINITY,
            avg: 0.0,
            max: f64::NEG_INFINITY,
        };
        let mut n = 0usize;
        for v in values {
            range.min = range.min.min(v);
            range.max = range.max.max(v);
            range.avg += v;
            n += 1;
        }
        if n == 0 {
            return Range {
                min: 0.0,
                avg: 0.0,
                max: 0.0,
            };
        }
        range.avg /= n as f64;
        range
    }
}

/// Measures how `hash_with_tier(_, tier)` responds to single-bit input flips.
///
/// - `generate_input`: fills an input of `input_units` code units from a
///   round index.  Must be deterministic; the index starts at zero and
///   increments each round.
/// - `progress`: called with the round index before each round.
pub fn compute_stats<G, P>(
    generate_input: G,
    tier: Tier,
    input_units: usize,
    rounds: usize,
    do_avalanche: bool,
    do_bic: bool,
    mut progress: P,
) -> Stats
where
    G: Fn(usize, &mut [u16]),
    P: FnMut(usize),
{
    let mut stats = Stats::new(tier, input_units, do_avalanche, do_bic);
    let mut input = vec![0u16; input_units];
    let mut tweaked = vec![0u16; input_units];

    for round in 0..rounds {
        progress(round);
        generate_input(round, &mut input);
        let output = hash_with_tier(&input, tier);

        for in_bit in 0..stats.input_bit_len {
            tweaked.copy_from_slice(&input);
            tweaked[in_bit / 16] ^= 1 << (in_bit % 16);
            stats.accumulate(in_bit, output ^ hash_with_tier(&tweaked, tier));
        }

        stats.sample_count += 1;
    }

    stats
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

/// Random code units.
pub fn generate_random(seed: usize, units: &mut [u16]) {
    let mut rng = WyRand::new_seed(mix64(seed as u64));
    units.fill_with(|| rng.generate::<u16>());
}

/// All zero bits except one, walking through every bit position.
pub fn generate_single_1_bit(index: usize, units: &mut [u16]) {
    units.fill(0);
    if units.is_empty() {
        return;
    }
    let bit = index % (units.len() * 16);
    units[bit / 16] = 1 << (bit % 16);
}

/// Roughly `n` random bits set to one.
pub fn generate_n_random_bits(seed: usize, units: &mut [u16], n: usize) {
    let mut rng = WyRand::new_seed(mix64(seed as u64 ^ mix64(n as u64)));
    units.fill(0);
    if units.is_empty() {
        return;
    }
    for _ in 0..n {
        let bit = rng.generate_range(0..(units.len() * 16));
        units[bit / 16] |= 1 << (bit % 16);
    }
}

/// The round index as a little-endian integer in the lowest units.
pub fn generate_counting(index: usize, units: &mut [u16]) {
    units.fill(0);
    let mut n = index as u64;
    for unit in units.iter_mut().take(4) {
        *unit = n as u16;
        n >>= 16;
    }
}

const PATH_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_-./";

/// Random ASCII drawn from characters common in identifiers and paths.
pub fn generate_ascii_path(seed: usize, units: &mut [u16]) {
    let mut rng = WyRand::new_seed(mix64(seed as u64 ^ 0x2f2f2f2f));
    units.fill_with(|| PATH_ALPHABET[rng.generate_range(0..PATH_ALPHABET.len())] as u16);
}

/// 64-bit bijective bit mixer.
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
    use crate::mixers::WORD_UNITS;

    #[test]
    fn sub_word_tail_bits_are_dead() {
        let units = 2 * WORD_UNITS + 1;
        let stats = compute_stats(generate_random, Tier::Scalar, units, 8, true, false, |_| {});
        assert_eq!(stats.sample_count, 8);
        assert_eq!(stats.dead_input_bits(), 16);
        // Every word-aligned input bit reaches at least one output bit.
        for bit in 0..(units - 1) * 16 {
            assert!(stats.get_row(bit).iter().any(|&flips| flips > 0), "bit {bit}");
        }
    }

    #[test]
    fn bic_quadrants_sum_to_samples() {
        let stats =
            compute_stats(generate_counting, Tier::Scalar, WORD_UNITS, 3, false, true, |_| {});
        assert!(stats.avalanche_chart.is_empty());
        for quadrants in &stats.bic_chart {
            assert_eq!(quadrants.iter().sum::<u32>(), 3);
        }
    }

    #[test]
    fn progress_sees_every_round() {
        let mut seen = Vec::new();
        compute_stats(generate_ascii_path, Tier::Scalar, 4, 5, true, false, |r| seen.push(r));
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn bias_and_entropy_extremes() {
        assert_eq!(p_to_bias(0.5), 0.0);
        assert_eq!(p_to_bias(0.0), 1.0);
        assert_eq!(p_to_bias(1.0), 1.0);
        assert_eq!(p_to_entropy(0.5), 1.0);
        assert_eq!(p_to_entropy(0.0), 0.0);
    }

    #[test]
    fn generators_fill_requested_shape() {
        let mut units = [0xffffu16; 6];
        generate_single_1_bit(17, &mut units);
        assert_eq!(units, [0, 2, 0, 0, 0, 0]);

        generate_counting(0x0003_0004, &mut units);
        assert_eq!(units, [4, 3, 0, 0, 0, 0]);

        generate_n_random_bits(9, &mut units, 3);
        let ones: u32 = units.iter().map(|u| u.count_ones()).sum();
        assert!((1..=3).contains(&ones));

        generate_ascii_path(1, &mut units);
        assert!(units.iter().all(|&u| PATH_ALPHABET.contains(&(u as u8))));
    }

    #[test]
    fn report_mentions_dead_bits() {
        let stats = compute_stats(generate_random, Tier::Scalar, 1, 2, true, false, |_| {});
        let report = stats.to_string();
        assert!(report.contains("Dead input bits"));
        assert!(report.contains("Tier: scalar"));
    }
}
