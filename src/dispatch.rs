use crate::{
    mixers::{scalar, Mixer, Step, WORD_UNITS},
    tier::{probe, Tier},
};

/// Minimum input length, in code units, for the 128-bit path.
pub const WIDE128_THRESHOLD: usize = 4 * Tier::Wide128.register_units();

/// Minimum input length, in code units, for the 256-bit path.
pub const WIDE256_THRESHOLD: usize = 4 * Tier::Wide256.register_units();

/// Hashes a run of 16-bit code units with the widest tier this processor
/// supports.
///
/// Unseeded and not stable across processors: two machines can return
/// different values for the same input.  Don't persist the result and don't
/// feed it attacker-controlled keys.
///
/// Only whole machine words are mixed in; the last `len % WORD_UNITS` units
/// never affect the result.
#[inline]
pub fn hash(input: &[u16]) -> usize {
    hash_with_tier(input, Tier::Wide256)
}

/// Like [`hash`], but never picks a tier wider than `tier`.  A tier the
/// processor lacks is narrowed to what it has.
pub fn hash_with_tier(input: &[u16], tier: Tier) -> usize {
    let tier = tier.min(probe());

    #[allow(unreachable_patterns)]
    let step = match select(input.len(), tier) {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        // SAFETY: `tier` is capped by the probe.
        Tier::Wide256 => unsafe { crate::mixers::wide256::Wide256::new_unchecked() }.process(input),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
        // SAFETY: `tier` is capped by the probe.
        Tier::Wide128 => unsafe { crate::mixers::wide128::Wide128::new_unchecked() }.process(input),
        _ => scalar::Scalar.process(input),
    };

    finish(input, step)
}

/// Widens `s` to UTF-16 and hashes it.
pub fn hash_str(s: &str) -> usize {
    let units: Vec<u16> = s.encode_utf16().collect();
    hash(&units)
}

/// Picks the mixer for an input of `len` code units on a processor capped at
/// `tier`.
pub fn select(len: usize, tier: Tier) -> Tier {
    if len < WORD_UNITS {
        Tier::Scalar
    } else if tier == Tier::Wide256 && len >= WIDE256_THRESHOLD {
        Tier::Wide256
    } else if tier >= Tier::Wide128 && len >= WIDE128_THRESHOLD {
        Tier::Wide128
    } else {
        Tier::Scalar
    }
}

// Every path ends in the scalar stages over whatever the mixer left behind.
#[inline(always)]
fn finish(input: &[u16], step: Step) -> usize {
    let tail = &input[input.len() - step.remaining..];
    scalar::absorb(step.lanes, tail).combine()
}
