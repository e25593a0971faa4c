use std::hash::{BuildHasher, Hasher};

use crate::{dispatch::hash, mixers::WORD_UNITS};

/// [`Hasher`] adapter over [`hash`], for maps keyed by short identifiers and
/// paths.
///
/// The algorithm isn't incremental, so written bytes are buffered as
/// little-endian code units and hashed in one go by `finish`.  A trailing odd
/// byte becomes the low half of a final unit, and the units are zero-padded to
/// a whole number of machine words so short keys like `u32` still mix in.
///
/// Same caveats as [`hash`]: no flooding resistance, and values differ across
/// processors.
#[derive(Debug, Clone, Default)]
pub struct UnstableHasher {
    units: Vec<u16>,
    pending: Option<u8>,
}

impl UnstableHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends code units directly, skipping the byte pairing.
    pub fn write_units(&mut self, units: &[u16]) {
        if let Some(low) = self.pending.take() {
            self.units.push(low as u16);
        }
        self.units.extend_from_slice(units);
    }
}

impl Hasher for UnstableHasher {
    fn write(&mut self, mut bytes: &[u8]) {
        if let Some(low) = self.pending.take() {
            match bytes.split_first() {
                Some((&high, rest)) => {
                    self.units.push(u16::from_le_bytes([low, high]));
                    bytes = rest;
                }
                None => {
                    self.pending = Some(low);
                    return;
                }
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        self.units
            .extend(pairs.by_ref().map(|pair| u16::from_le_bytes([pair[0], pair[1]])));
        self.pending = pairs.remainder().first().copied();
    }

    fn finish(&self) -> u64 {
        let mut units = self.units.clone();
        units.extend(self.pending.map(u16::from));
        units.resize(units.len().next_multiple_of(WORD_UNITS), 0);
        hash(&units) as u64
    }
}

/// Builds [`UnstableHasher`]s.  Stateless: every hasher starts empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnstableBuildHasher;

impl BuildHasher for UnstableBuildHasher {
    type Hasher = UnstableHasher;

    fn build_hasher(&self) -> UnstableHasher {
        UnstableHasher::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn padded(units: &[u16]) -> Vec<u16> {
        let mut units = units.to_vec();
        units.resize(units.len().next_multiple_of(WORD_UNITS), 0);
        units
    }

    fn finish_bytes(chunks: &[&[u8]]) -> u64 {
        let mut hasher = UnstableHasher::new();
        for chunk in chunks {
            hasher.write(chunk);
        }
        hasher.finish()
    }

    #[test]
    fn bytes_pair_into_little_endian_units() {
        let units: Vec<u16> = "assets/textures/grass.dds".encode_utf16().collect();
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(finish_bytes(&[bytes.as_slice()]), hash(&padded(&units)) as u64);
    }

    #[test]
    fn split_writes_match_single_write() {
        let bytes = &b"shaders/post/bloom_downsample.hlsl"[..];
        let whole = finish_bytes(&[bytes]);
        for split in 0..bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(finish_bytes(&[a, b]), whole, "split at {split}");
        }
        assert_eq!(finish_bytes(&[&bytes[..3], &bytes[3..3], &bytes[3..]]), whole);
    }

    #[test]
    fn odd_trailing_byte_is_a_zero_extended_unit() {
        let mut hasher = UnstableHasher::new();
        hasher.write(&[0x61, 0x00, 0x62]);
        assert_eq!(hasher.finish(), hash(&padded(&[0x61, 0x62])) as u64);
    }

    #[test]
    fn write_units_flushes_pending_byte() {
        let mut hasher = UnstableHasher::new();
        hasher.write(&[0x7a]);
        hasher.write_units(&[0x2f, 0x2e]);
        assert_eq!(hasher.finish(), hash(&padded(&[0x7a, 0x2f, 0x2e])) as u64);
    }

    #[test]
    fn aligned_input_is_not_padded() {
        let units = [0x2fu16; 4 * WORD_UNITS];
        let mut hasher = UnstableHasher::new();
        hasher.write_units(&units);
        assert_eq!(hasher.finish(), hash(&units) as u64);
    }

    #[test]
    fn short_keys_hash_distinctly() {
        let build = UnstableBuildHasher;

        let ints: HashSet<u64> = (0u32..10_000).map(|k| build.hash_one(k)).collect();
        assert_eq!(ints.len(), 10_000);

        let bytes: HashSet<u64> = (0u8..=255).map(|k| build.hash_one(k)).collect();
        assert_eq!(bytes.len(), 256);

        let keys = ["", "a", "bb", "ccc", "/tmp", "/usr"];
        let strs: HashSet<u64> = keys.iter().map(|k| build.hash_one(k)).collect();
        assert_eq!(strs.len(), keys.len());
    }

    #[test]
    fn works_as_map_hasher() {
        let mut map: HashMap<&str, usize, UnstableBuildHasher> = HashMap::default();
        let paths = ["/etc/hosts", "/etc/passwd", "/var/log/syslog", "/tmp"];
        for (i, &path) in paths.iter().enumerate() {
            map.insert(path, i);
        }
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(map.get(path), Some(&i));
        }
        assert_eq!(map.get("/etc/shadow"), None);
    }
}
