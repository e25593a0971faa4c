//! The three mixing implementations and the arithmetic they share.
//!
//! Every mixer absorbs a prefix of its input into a [`LanePair`] and reports
//! how many code units it left unconsumed.  The dispatcher always finishes by
//! running [`scalar::absorb`] over that remainder, so the scalar law is the
//! last stage on every path.

pub mod scalar;
#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
pub mod wide128;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod wide256;

/// Code units per machine word.
pub const WORD_UNITS: usize = std::mem::size_of::<usize>() / std::mem::size_of::<u16>();

/// djb2's 5381, packed into both halves of the machine word.
pub const SCALAR_SEED: usize = (5381 << (usize::BITS / 2)) | 5381;

/// Odd multiplier used to fold the two lanes into the result.
pub const COMBINE_FACTOR: usize = 1566083941;

/// FNV-1a 64-bit offset basis, broadcast into every vector lane.
pub const FNV_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.  The widened 32x32 multiply only sees its low half.
pub const FNV_PRIME: u64 = 0x100000001b3;

const ROTATION: u32 = 5;

/// One stage of the hash: absorbs as much of `input` as its register width
/// allows and hands back the lanes plus the unconsumed tail length.
pub trait Mixer {
    fn process(&self, input: &[u16]) -> Step;
}

/// The two independently updated accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanePair {
    pub lane1: usize,
    pub lane2: usize,
}

impl LanePair {
    pub const SEED: LanePair = LanePair {
        lane1: SCALAR_SEED,
        lane2: SCALAR_SEED,
    };

    /// Folds both lanes into the final hash.
    #[inline(always)]
    pub const fn combine(self) -> usize {
        self.lane1.wrapping_add(self.lane2.wrapping_mul(COMBINE_FACTOR))
    }
}

/// Result of a [`Mixer`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub lanes: LanePair,
    /// Code units at the end of the input that this stage did not consume.
    pub remaining: usize,
}

/// The scalar update law: rotate, add, then xor.
#[inline(always)]
pub const fn mix_word(lane: usize, word: usize) -> usize {
    lane.rotate_left(ROTATION).wrapping_add(lane) ^ word
}

/// Assembles one machine word from exactly `WORD_UNITS` code units, unit 0 in
/// the low bits.
#[inline(always)]
pub fn read_word(units: &[u16]) -> usize {
    debug_assert_eq!(units.len(), WORD_UNITS);
    units
        .iter()
        .rev()
        .fold(0usize, |word, &unit| (word << 16) | unit as usize)
}

/// Narrows 64-bit vector lanes to machine words.  On 32-bit targets the two
/// halves of each lane are multiplied together so the product fits the
/// accumulator.
#[cfg(target_pointer_width = "64")]
#[inline(always)]
pub fn narrow_lanes<const N: usize>(lanes: [u64; N]) -> [usize; N] {
    lanes.map(|lane| lane as usize)
}

#[cfg(not(target_pointer_width = "64"))]
#[inline(always)]
pub fn narrow_lanes<const N: usize>(lanes: [u64; N]) -> [usize; N] {
    lanes.map(|lane| (lane as u32).wrapping_mul((lane >> 32) as u32) as usize)
}
