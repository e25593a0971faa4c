//! A fast, unseeded, hardware-dependent hash over 16-bit code units.
//!
//! Meant for in-memory tables keyed by short identifiers or file-system paths.
//! It gives up two things for speed:
//!
//! - It is unseeded, so it has no resistance to hash flooding.  Don't use it
//!   on untrusted keys.
//! - It is unstable across hardware.  The dispatcher picks a scalar, 128-bit
//!   or 256-bit implementation from the input length and the processor's
//!   vector support, and those tiers deliberately use different mixing laws.
//!   Never persist a hash or compare hashes between machines.
//!
//! ```
//! let units: Vec<u16> = "assets/models/crate.obj".encode_utf16().collect();
//! let h = unstable_hash::hash(&units);
//! assert_eq!(h, unstable_hash::hash_str("assets/models/crate.obj"));
//! ```

pub mod dispatch;
pub mod hasher;
pub mod mixers;
pub mod stats;
pub mod tier;

pub use dispatch::{hash, hash_str, hash_with_tier};
pub use hasher::{UnstableBuildHasher, UnstableHasher};
pub use tier::{probe, Tier};
