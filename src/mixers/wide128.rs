//! 128-bit vector mixer: SSE2 on x86, NEON on aarch64.
//!
//! Two vector accumulators, each two 64-bit lanes seeded with the FNV-1a
//! basis, absorb `(acc ^ chunk) * prime` using the widening 32x32 multiply.
//! Once less than a register of input remains, the accumulators are xored
//! together and each 64-bit lane becomes one scalar lane.

use super::{narrow_lanes, LanePair, Mixer, Step};

/// Code units per 128-bit register.
pub const REGISTER_UNITS: usize = 128 / 16;

/// Capability token for the 128-bit path.  Can only be built once the probe
/// has seen the required feature.
#[derive(Debug, Clone, Copy)]
pub struct Wide128 {
    _private: (),
}

impl Wide128 {
    /// Returns the mixer if the processor supports it.
    pub fn new() -> Option<Self> {
        (crate::tier::probe() >= crate::Tier::Wide128).then_some(Self { _private: () })
    }

    /// # Safety
    ///
    /// The caller must have established that the `Wide128` tier is available.
    #[inline(always)]
    pub unsafe fn new_unchecked() -> Self {
        Self { _private: () }
    }
}

impl Mixer for Wide128 {
    #[inline]
    fn process(&self, input: &[u16]) -> Step {
        // SAFETY: a `Wide128` only exists when the probe reported the tier.
        let (folded, remaining) = unsafe { arch::absorb(input) };
        let [lane1, lane2] = narrow_lanes(folded);
        Step {
            lanes: LanePair { lane1, lane2 },
            remaining,
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod arch {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    use super::REGISTER_UNITS;
    use crate::mixers::{FNV_BASIS, FNV_PRIME};

    /// Returns `acc1 ^ acc2` as 64-bit lanes and the unconsumed unit count.
    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn absorb(input: &[u16]) -> ([u64; 2], usize) {
        let prime = _mm_set1_epi64x(FNV_PRIME as i64);
        let mut acc1 = _mm_set1_epi64x(FNV_BASIS as i64);
        let mut acc2 = acc1;

        let mut rest = input;
        while rest.len() >= 4 * REGISTER_UNITS {
            let ptr = rest.as_ptr().cast::<__m128i>();
            acc1 = mix(acc1, _mm_loadu_si128(ptr), prime);
            acc2 = mix(acc2, _mm_loadu_si128(ptr.add(1)), prime);
            acc1 = mix(acc1, _mm_loadu_si128(ptr.add(2)), prime);
            acc2 = mix(acc2, _mm_loadu_si128(ptr.add(3)), prime);
            rest = &rest[4 * REGISTER_UNITS..];
        }
        while rest.len() >= REGISTER_UNITS {
            acc1 = mix(acc1, _mm_loadu_si128(rest.as_ptr().cast()), prime);
            rest = &rest[REGISTER_UNITS..];
        }

        let mut folded = [0u64; 2];
        _mm_storeu_si128(folded.as_mut_ptr().cast(), _mm_xor_si128(acc1, acc2));
        (folded, rest.len())
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn mix(acc: __m128i, chunk: __m128i, prime: __m128i) -> __m128i {
        _mm_mul_epu32(_mm_xor_si128(acc, chunk), prime)
    }
}

#[cfg(target_arch = "aarch64")]
mod arch {
    use core::arch::aarch64::*;

    use super::REGISTER_UNITS;
    use crate::mixers::{FNV_BASIS, FNV_PRIME};

    /// Returns `acc1 ^ acc2` as 64-bit lanes and the unconsumed unit count.
    #[target_feature(enable = "neon")]
    pub(super) unsafe fn absorb(input: &[u16]) -> ([u64; 2], usize) {
        let prime = vdup_n_u32(FNV_PRIME as u32);
        let mut acc1 = vdupq_n_u64(FNV_BASIS);
        let mut acc2 = acc1;

        let mut rest = input;
        while rest.len() >= 4 * REGISTER_UNITS {
            let ptr = rest.as_ptr();
            acc1 = mix(acc1, load(ptr), prime);
            acc2 = mix(acc2, load(ptr.add(REGISTER_UNITS)), prime);
            acc1 = mix(acc1, load(ptr.add(2 * REGISTER_UNITS)), prime);
            acc2 = mix(acc2, load(ptr.add(3 * REGISTER_UNITS)), prime);
            rest = &rest[4 * REGISTER_UNITS..];
        }
        while rest.len() >= REGISTER_UNITS {
            acc1 = mix(acc1, load(rest.as_ptr()), prime);
            rest = &rest[REGISTER_UNITS..];
        }

        let mut folded = [0u64; 2];
        vst1q_u64(folded.as_mut_ptr(), veorq_u64(acc1, acc2));
        (folded, rest.len())
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load(ptr: *const u16) -> uint64x2_t {
        vreinterpretq_u64_u16(vld1q_u16(ptr))
    }

    // Same widening multiply as `_mm_mul_epu32`: low 32 bits of each lane.
    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn mix(acc: uint64x2_t, chunk: uint64x2_t, prime: uint32x2_t) -> uint64x2_t {
        vmull_u32(vmovn_u64(veorq_u64(acc, chunk)), prime)
    }
}
