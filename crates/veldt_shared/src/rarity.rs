//! # Rarity Tiers
//!
//! Rarity drives how often a node type is picked when several types are
//! allowed on the same tile.

use serde::{Deserialize, Serialize};

/// Rarity tier for resource-node types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Everywhere.
    Common = 0,
    /// Slightly less frequent.
    Uncommon = 1,
    /// Worth a detour.
    Rare = 2,
    /// A handful per region.
    Epic = 3,
    /// A handful per world region of many chunks.
    Legendary = 4,
    /// Practically unique.
    Mythic = 5,
}

impl Rarity {
    /// Relative spawn weight in basis points (higher = more common).
    #[inline]
    #[must_use]
    pub const fn spawn_weight(self) -> u32 {
        match self {
            Self::Common => 7000,
            Self::Uncommon => 2000,
            Self::Rare => 700,
            Self::Epic => 250,
            Self::Legendary => 40,
            Self::Mythic => 10,
        }
    }

    /// Converts from u8 to Rarity. Values past the last tier saturate to `Mythic`.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Common,
            1 => Self::Uncommon,
            2 => Self::Rare,
            3 => Self::Epic,
            4 => Self::Legendary,
            _ => Self::Mythic,
        }
    }
}
