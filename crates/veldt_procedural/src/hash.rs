//! # Tile Hashing
//!
//! Stateless keyed hashes for per-tile decisions. Each decision draws from
//! its own purpose lane, so adding a new decision never shifts the values
//! an existing one sees.
//!
//! Inputs are fed as little-endian bytes, so a world hashes the same on
//! every host.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::chunk::ChunkCoord;
use crate::noise::WorldSeed;

/// Independent hash lanes, one per generation decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Purpose {
    /// Whether a node spawns on a tile.
    SpawnRoll = 1,
    /// Which node type spawns.
    TypePick = 2,
    /// Node scale factor.
    Scale = 3,
    /// Cosmetic tile variant.
    Variant = 4,
}

/// Hashes `(seed, coord, cell_index)` in the lane of `purpose`.
#[inline]
#[must_use]
pub fn tile_hash(seed: WorldSeed, coord: ChunkCoord, cell_index: u16, purpose: Purpose) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(seed.value(), purpose as u64);
    hasher.write(&coord.x.to_le_bytes());
    hasher.write(&coord.y.to_le_bytes());
    hasher.write(&cell_index.to_le_bytes());
    hasher.finish()
}

/// Maps a hash onto `[0, bound)`. `bound` must be non-zero.
#[inline]
#[must_use]
pub const fn bounded(hash: u64, bound: u64) -> u64 {
    // Multiply-shift keeps the high bits, which SipHash mixes best.
    ((hash as u128 * bound as u128) >> 64) as u64
}
