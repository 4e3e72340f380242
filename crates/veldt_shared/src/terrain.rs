//! # Terrain Types
//!
//! The five terrain classes produced by the classifier. Each carries the
//! movement properties the validator needs.

use serde::{Deserialize, Serialize};

/// Terrain class of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TerrainType {
    /// Open water.
    Water = 0,
    /// Beaches and dunes.
    Sand = 1,
    /// Grassland.
    Grass = 2,
    /// Bare earth.
    Dirt = 3,
    /// Rock and highland.
    Stone = 4,
}

impl TerrainType {
    /// All terrain types, ordered by ascending elevation band.
    pub const ALL: [Self; 5] = [Self::Water, Self::Sand, Self::Grass, Self::Dirt, Self::Stone];

    /// Converts a stored tag back into a terrain type.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Water),
            1 => Some(Self::Sand),
            2 => Some(Self::Grass),
            3 => Some(Self::Dirt),
            4 => Some(Self::Stone),
            _ => None,
        }
    }

    /// Speed multiplier applied to movement across this terrain, in `(0, 1]`.
    #[inline]
    #[must_use]
    pub const fn movement_speed_multiplier(self) -> f32 {
        match self {
            Self::Water => 0.5,
            Self::Sand => 0.8,
            Self::Grass => 1.0,
            Self::Dirt => 0.9,
            Self::Stone => 0.85,
        }
    }

    /// Returns true for water tiles.
    #[inline]
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Returns true if characters may stand on this terrain.
    ///
    /// Every current terrain is passable; water only slows movement down.
    #[inline]
    #[must_use]
    pub const fn is_passable(self) -> bool {
        true
    }

    /// Lowercase name, as used in catalog files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Sand => "sand",
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Stone => "stone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipliers_in_range() {
        for terrain in TerrainType::ALL {
            let m = terrain.movement_speed_multiplier();
            assert!(m > 0.0 && m <= 1.0, "{terrain:?} multiplier {m}");
        }
        assert!((TerrainType::Water.movement_speed_multiplier() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tag_roundtrip() {
        for terrain in TerrainType::ALL {
            assert_eq!(TerrainType::from_u8(terrain as u8), Some(terrain));
        }
        assert_eq!(TerrainType::from_u8(9), None);
    }

    #[test]
    fn test_only_water_is_water() {
        let water: Vec<_> = TerrainType::ALL.into_iter().filter(|t| t.is_water()).collect();
        assert_eq!(water, vec![TerrainType::Water]);
        assert!(TerrainType::ALL.iter().all(|t| t.is_passable()));
    }
}
