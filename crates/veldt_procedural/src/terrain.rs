//! # Terrain Classification
//!
//! Maps a noise value to one of the five terrain types by comparing it
//! against ascending thresholds:
//!
//! ```text
//! -1.0 ── water ── sand ── grass ── dirt ──────── 1.0
//!   Water   │ Sand  │ Grass  │ Dirt  │   Stone
//! ```

use serde::{Deserialize, Serialize};
use veldt_shared::TerrainType;

/// Upper bounds (exclusive) of each terrain band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainThresholds {
    /// Values below this are water.
    pub water: f64,
    /// Values below this (and not water) are sand.
    pub sand: f64,
    /// Values below this are grass.
    pub grass: f64,
    /// Values below this are dirt; anything above is stone.
    pub dirt: f64,
}

impl Default for TerrainThresholds {
    fn default() -> Self {
        Self {
            water: -0.25,
            sand: -0.15,
            grass: 0.30,
            dirt: 0.55,
        }
    }
}

impl TerrainThresholds {
    /// Returns true if the bands are strictly ascending and finite.
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        let bands = [self.water, self.sand, self.grass, self.dirt];
        bands.iter().all(|v| v.is_finite()) && bands.windows(2).all(|w| w[0] < w[1])
    }
}

/// Classifies noise values into terrain types.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainClassifier {
    thresholds: TerrainThresholds,
}

impl TerrainClassifier {
    /// Creates a classifier. Thresholds are expected to be ascending; see
    /// [`TerrainThresholds::is_ascending`].
    #[must_use]
    pub const fn new(thresholds: TerrainThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in effect.
    #[must_use]
    pub const fn thresholds(&self) -> TerrainThresholds {
        self.thresholds
    }

    /// Classifies a noise value.
    #[inline]
    #[must_use]
    pub fn classify(&self, value: f64) -> TerrainType {
        let t = &self.thresholds;
        if value < t.water {
            TerrainType::Water
        } else if value < t.sand {
            TerrainType::Sand
        } else if value < t.grass {
            TerrainType::Grass
        } else if value < t.dirt {
            TerrainType::Dirt
        } else {
            TerrainType::Stone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let c = TerrainClassifier::default();
        assert_eq!(c.classify(-1.0), TerrainType::Water);
        assert_eq!(c.classify(-0.25), TerrainType::Sand);
        assert_eq!(c.classify(-0.2), TerrainType::Sand);
        assert_eq!(c.classify(0.0), TerrainType::Grass);
        assert_eq!(c.classify(0.4), TerrainType::Dirt);
        assert_eq!(c.classify(0.55), TerrainType::Stone);
        assert_eq!(c.classify(1.0), TerrainType::Stone);
    }

    #[test]
    fn test_ascending_check() {
        assert!(TerrainThresholds::default().is_ascending());
        let broken = TerrainThresholds {
            grass: -0.5,
            ..TerrainThresholds::default()
        };
        assert!(!broken.is_ascending());
        let nan = TerrainThresholds {
            dirt: f64::NAN,
            ..TerrainThresholds::default()
        };
        assert!(!nan.is_ascending());
    }
}
