//! 256-bit vector mixer (AVX2).
//!
//! Same accumulate law as [`super::wide128`], four 64-bit lanes per
//! accumulator.  Flattening xors the accumulators, then folds lanes 0/1 into
//! lane1 and lanes 2/3 into lane2 with the scalar rotate/add/xor law.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::{mix_word, narrow_lanes, LanePair, Mixer, Step, FNV_BASIS, FNV_PRIME};

/// Code units per 256-bit register.
pub const REGISTER_UNITS: usize = 256 / 16;

/// Capability token for the 256-bit path.
#[derive(Debug, Clone, Copy)]
pub struct Wide256 {
    _private: (),
}

impl Wide256 {
    /// Returns the mixer if the processor supports it.
    pub fn new() -> Option<Self> {
        (crate::tier::probe() >= crate::Tier::Wide256).then_some(Self { _private: () })
    }

    /// # Safety
    ///
    /// The caller must have established that the `Wide256` tier is available.
    #[inline(always)]
    pub unsafe fn new_unchecked() -> Self {
        Self { _private: () }
    }
}

impl Mixer for Wide256 {
    #[inline]
    fn process(&self, input: &[u16]) -> Step {
        // SAFETY: a `Wide256` only exists when the probe reported AVX2.
        let (folded, remaining) = unsafe { absorb(input) };
        let m = narrow_lanes(folded);
        Step {
            lanes: LanePair {
                lane1: mix_word(m[0], m[1]),
                lane2: mix_word(m[2], m[3]),
            },
            remaining,
        }
    }
}

/// Returns `acc1 ^ acc2` as 64-bit lanes and the unconsumed unit count.
#[target_feature(enable = "avx2")]
unsafe fn absorb(input: &[u16]) -> ([u64; 4], usize) {
    let prime = _mm256_set1_epi64x(FNV_PRIME as i64);
    let mut acc1 = _mm256_set1_epi64x(FNV_BASIS as i64);
    let mut acc2 = acc1;

    let mut rest = input;
    while rest.len() >= 4 * REGISTER_UNITS {
        let ptr = rest.as_ptr().cast::<__m256i>();
        acc1 = mix(acc1, _mm256_loadu_si256(ptr), prime);
        acc2 = mix(acc2, _mm256_loadu_si256(ptr.add(1)), prime);
        acc1 = mix(acc1, _mm256_loadu_si256(ptr.add(2)), prime);
        acc2 = mix(acc2, _mm256_loadu_si256(ptr.add(3)), prime);
        rest = &rest[4 * REGISTER_UNITS..];
    }
    while rest.len() >= REGISTER_UNITS {
        acc1 = mix(acc1, _mm256_loadu_si256(rest.as_ptr().cast()), prime);
        rest = &rest[REGISTER_UNITS..];
    }

    let mut folded = [0u64; 4];
    _mm256_storeu_si256(folded.as_mut_ptr().cast(), _mm256_xor_si256(acc1, acc2));
    (folded, rest.len())
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn mix(acc: __m256i, chunk: __m256i, prime: __m256i) -> __m256i {
    _mm256_mul_epu32(_mm256_xor_si256(acc, chunk), prime)
}
