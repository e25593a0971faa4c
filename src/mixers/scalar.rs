use super::{mix_word, read_word, LanePair, Mixer, Step, WORD_UNITS};

/// The machine-word mixer.  Reference semantics for the hash, and the only
/// path on processors without vector support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl Mixer for Scalar {
    #[inline]
    fn process(&self, input: &[u16]) -> Step {
        let lanes = absorb(LanePair::SEED, input);
        Step {
            lanes,
            remaining: input.len() % WORD_UNITS,
        }
    }
}

/// Folds every whole machine word of `input` into `lanes`, largest unrolled
/// group first.  A tail shorter than one word is ignored.
#[inline]
pub fn absorb(mut lanes: LanePair, input: &[u16]) -> LanePair {
    let mut rest = input;
    while rest.len() >= 8 * WORD_UNITS {
        lanes = absorb_group::<8>(lanes, &rest[..8 * WORD_UNITS]);
        rest = &rest[8 * WORD_UNITS..];
    }
    while rest.len() >= 4 * WORD_UNITS {
        lanes = absorb_group::<4>(lanes, &rest[..4 * WORD_UNITS]);
        rest = &rest[4 * WORD_UNITS..];
    }
    while rest.len() >= 2 * WORD_UNITS {
        lanes = absorb_group::<2>(lanes, &rest[..2 * WORD_UNITS]);
        rest = &rest[2 * WORD_UNITS..];
    }
    if rest.len() >= WORD_UNITS {
        lanes.lane1 = mix_word(lanes.lane1, read_word(&rest[..WORD_UNITS]));
    }
    lanes
}

/// `WORDS` words, alternating lane1, lane2, lane1, ...
#[inline(always)]
fn absorb_group<const WORDS: usize>(mut lanes: LanePair, group: &[u16]) -> LanePair {
    debug_assert_eq!(group.len(), WORDS * WORD_UNITS);
    for pair in group.chunks_exact(2 * WORD_UNITS) {
        let (even, odd) = pair.split_at(WORD_UNITS);
        lanes.lane1 = mix_word(lanes.lane1, read_word(even));
        lanes.lane2 = mix_word(lanes.lane2, read_word(odd));
    }
    lanes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widen(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn empty_input_leaves_seed_untouched() {
        let step = Scalar.process(&[]);
        assert_eq!(step.lanes, LanePair::SEED);
        assert_eq!(step.remaining, 0);
    }

    #[test]
    fn single_word_goes_to_lane1_only() {
        let units: Vec<u16> = (0..WORD_UNITS as u16).map(|i| 0x61 + i).collect();
        let step = Scalar.process(&units);
        assert_eq!(step.lanes.lane1, mix_word(LanePair::SEED.lane1, read_word(&units)));
        assert_eq!(step.lanes.lane2, LanePair::SEED.lane2);
    }

    #[test]
    fn sub_word_tail_is_excluded() {
        let base = widen("src/lib.rs/mixers/scalar.rs!");
        let aligned = &base[..base.len() - base.len() % WORD_UNITS];
        let expected = Scalar.process(aligned).lanes;
        for extra in 1..WORD_UNITS {
            let mut input = aligned.to_vec();
            input.extend(std::iter::repeat(0xbeefu16).take(extra));
            let step = Scalar.process(&input);
            assert_eq!(step.lanes, expected);
            assert_eq!(step.remaining, extra);
        }
    }

    #[test]
    fn groups_alternate_lanes_word_by_word() {
        // 15 words exercise the 8, 4, 2 and 1 word stages once each.
        let units: Vec<u16> = (0..15 * WORD_UNITS as u16).map(|i| i.wrapping_mul(40503)).collect();
        let mut expected = LanePair::SEED;
        let words: Vec<usize> = units.chunks_exact(WORD_UNITS).map(read_word).collect();
        for (i, &word) in words[..14].iter().enumerate() {
            if i % 2 == 0 {
                expected.lane1 = mix_word(expected.lane1, word);
            } else {
                expected.lane2 = mix_word(expected.lane2, word);
            }
        }
        expected.lane1 = mix_word(expected.lane1, words[14]);

        assert_eq!(absorb(LanePair::SEED, &units), expected);
    }

    #[test]
    fn absorb_continues_from_given_lanes() {
        let start = LanePair { lane1: 1, lane2: 2 };
        let units = [7u16; 3];
        // Fewer than one word: nothing changes.
        if WORD_UNITS > 3 {
            assert_eq!(absorb(start, &units), start);
        }
        let word = vec![0x2fu16; WORD_UNITS];
        assert_eq!(
            absorb(start, &word),
            LanePair {
                lane1: mix_word(1, read_word(&word)),
                lane2: 2,
            }
        );
    }
}
