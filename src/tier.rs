use std::sync::atomic::{AtomicU8, Ordering};

/// A processor capability level the dispatcher chooses between.
///
/// Ordered from narrowest to widest, so `a.min(b)` picks the tier both sides
/// can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Machine-word arithmetic only.
    Scalar,
    /// 128-bit vector registers (SSE2, NEON).
    Wide128,
    /// 256-bit vector registers (AVX2).
    Wide256,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Scalar, Tier::Wide128, Tier::Wide256];

    /// Number of 16-bit code units held by one register of this tier.  For
    /// `Scalar` that's one machine word.
    pub const fn register_units(self) -> usize {
        match self {
            Tier::Scalar => crate::mixers::WORD_UNITS,
            Tier::Wide128 => 128 / 16,
            Tier::Wide256 => 256 / 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tier::Scalar => "scalar",
            Tier::Wide128 => "wide128",
            Tier::Wide256 => "wide256",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Tier::Scalar => TIER_SCALAR,
            Tier::Wide128 => TIER_WIDE128,
            Tier::Wide256 => TIER_WIDE256,
        }
    }

    const fn from_u8(v: u8) -> Option<Tier> {
        match v {
            TIER_SCALAR => Some(Tier::Scalar),
            TIER_WIDE128 => Some(Tier::Wide128),
            TIER_WIDE256 => Some(Tier::Wide256),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// 0 = not probed yet.
static PROBED: AtomicU8 = AtomicU8::new(TIER_UNPROBED);

const TIER_UNPROBED: u8 = 0;
const TIER_SCALAR: u8 = 1;
const TIER_WIDE128: u8 = 2;
const TIER_WIDE256: u8 = 3;

/// Returns the widest tier the current processor supports.
///
/// Detection runs once per process.  Two threads racing on the first call may
/// both detect, but they store the same value.
#[inline]
pub fn probe() -> Tier {
    if let Some(tier) = Tier::from_u8(PROBED.load(Ordering::Relaxed)) {
        return tier;
    }

    let tier = detect();
    PROBED.store(tier.to_u8(), Ordering::Relaxed);
    tracing::debug!(%tier, "probed hash tier");
    tier
}

fn detect() -> Tier {
    if cfg!(feature = "force-scalar") {
        return Tier::Scalar;
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx2") {
            return Tier::Wide256;
        }
        if is_x86_feature_detected!("sse2") {
            return Tier::Wide128;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return Tier::Wide128;
        }
    }

    #[allow(unreachable_code)]
    Tier::Scalar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_is_memoized() {
        let first = probe();
        assert_eq!(Tier::from_u8(PROBED.load(Ordering::Relaxed)), Some(first));
        for _ in 0..16 {
            assert_eq!(probe(), first);
        }
    }

    #[test]
    fn probe_agrees_with_detect() {
        assert_eq!(probe(), detect());
    }

    #[cfg(feature = "force-scalar")]
    #[test]
    fn force_scalar_pins_probe() {
        assert_eq!(probe(), Tier::Scalar);
    }

    #[test]
    fn tiers_are_ordered_by_width() {
        assert!(Tier::Scalar < Tier::Wide128);
        assert!(Tier::Wide128 < Tier::Wide256);
        assert_eq!(Tier::Wide256.min(Tier::Wide128), Tier::Wide128);

        let mut last = 0;
        for tier in Tier::ALL {
            assert!(tier.register_units() > last);
            last = tier.register_units();
        }
    }
}
