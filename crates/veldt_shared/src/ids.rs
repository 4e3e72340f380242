//! # Identifiers
//!
//! Every id is a newtype so that a world id can never be passed where a
//! node id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CELLS_PER_CHUNK, NODE_ID_AXIS_BITS, NODE_ID_AXIS_LIMIT};

/// Errors raised while parsing identifiers at the service edge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    /// The identifier was not a decimal number.
    #[error("malformed identifier: {0:?}")]
    Malformed(String),
    /// The identifier was zero or negative.
    #[error("identifier must be positive, got {0}")]
    NonPositive(i64),
}

/// Identifies a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(u64);

impl WorldId {
    /// Creates a world id. Zero is reserved and rejected.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for WorldId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw: i64 = trimmed
            .parse()
            .map_err(|_| IdParseError::Malformed(s.to_string()))?;
        if raw <= 0 {
            return Err(IdParseError::NonPositive(raw));
        }
        Ok(Self(raw as u64))
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a player character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a resource-node type in the catalog.
pub type NodeTypeId = u32;

/// Identifies a resource-node instance within a world.
///
/// The id reversibly encodes the owning chunk and the cell index:
///
/// ```text
/// raw = 1 + (x26 << 36 | y26 << 10 | cell)
/// ```
///
/// where `x26`/`y26` are the low 26 bits of the chunk coordinates. The
/// `+ 1` keeps every id strictly positive on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    const AXIS_MASK: u64 = (1 << NODE_ID_AXIS_BITS) - 1;
    const CELL_BITS: u32 = 10;
    const X_SHIFT: u32 = Self::CELL_BITS + NODE_ID_AXIS_BITS;

    /// Encodes a node id from its chunk coordinate and cell index.
    ///
    /// Returns `None` when the chunk lies outside the encodable range or
    /// the cell index is not inside a chunk.
    #[must_use]
    pub fn encode(chunk_x: i32, chunk_y: i32, cell_index: u16) -> Option<Self> {
        let in_range = |v: i32| (-NODE_ID_AXIS_LIMIT..NODE_ID_AXIS_LIMIT).contains(&v);
        if !in_range(chunk_x) || !in_range(chunk_y) || usize::from(cell_index) >= CELLS_PER_CHUNK {
            return None;
        }

        let x = (chunk_x as u64) & Self::AXIS_MASK;
        let y = (chunk_y as u64) & Self::AXIS_MASK;
        let packed = (x << Self::X_SHIFT) | (y << Self::CELL_BITS) | u64::from(cell_index);
        Some(Self(packed + 1))
    }

    /// Decodes the owning chunk coordinate and the cell index.
    #[must_use]
    pub fn decode(self) -> Option<(i32, i32, u16)> {
        let packed = self.0.checked_sub(1)?;
        if packed >> (Self::X_SHIFT + NODE_ID_AXIS_BITS) != 0 {
            return None;
        }

        let cell = (packed & ((1 << Self::CELL_BITS) - 1)) as u16;
        let y = sign_extend((packed >> Self::CELL_BITS) & Self::AXIS_MASK);
        let x = sign_extend((packed >> Self::X_SHIFT) & Self::AXIS_MASK);
        Some((x, y, cell))
    }

    /// Validates a raw wire id.
    ///
    /// # Errors
    ///
    /// Returns [`IdParseError::NonPositive`] for zero or negative ids.
    pub fn from_raw(raw: i64) -> Result<Self, IdParseError> {
        if raw <= 0 {
            Err(IdParseError::NonPositive(raw))
        } else {
            Ok(Self(raw as u64))
        }
    }

    /// Returns the id as it travels on the wire.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sign-extends a 26-bit two's complement value.
#[inline]
fn sign_extend(value: u64) -> i32 {
    let shift = 64 - NODE_ID_AXIS_BITS;
    (((value << shift) as i64) >> shift) as i32
}
