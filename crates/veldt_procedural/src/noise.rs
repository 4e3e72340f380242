//! # Noise Field
//!
//! Seeded 2D simplex noise, layered into a fractal field that is sampled
//! at integer world-tile coordinates.
//!
//! ## Determinism Guarantee
//!
//! The permutation table is shuffled by a ChaCha8 stream seeded from the
//! `WorldSeed`, and sampling only does IEEE arithmetic on the inputs. Given
//! the same seed, every platform produces the same value for the same tile,
//! regardless of which chunks were generated before.
//!
//! Coordinates far outside any practical range still sample: float-to-int
//! conversions saturate and table lookups wrap.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Reinterprets a signed wire seed.
    #[inline]
    #[must_use]
    pub const fn from_i64(seed: i64) -> Self {
        Self(seed as u64)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the seed as it travels on the wire.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Derives an independent sub-seed for one purpose.
    ///
    /// SplitMix64 finaliser over `seed ^ purpose`.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut z = (self.0 ^ purpose).wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self(z ^ (z >> 31))
    }
}

/// Gradient directions for 2D simplex corners.
const GRADIENTS: [[f64; 2]; 8] = [
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [-1.0, -1.0],
];

/// Single-octave 2D simplex noise over a shuffled 256-entry lattice.
#[derive(Clone)]
pub struct SimplexNoise {
    /// 256 shuffled entries, doubled so that `perm[a + perm[b]]` never
    /// needs a second wrap.
    perm: [u8; 512],
}

impl SimplexNoise {
    /// Skew factor, `(sqrt(3) - 1) / 2`.
    const SKEW: f64 = 0.366_025_403_784_438_6;
    /// Unskew factor, `(3 - sqrt(3)) / 6`.
    const UNSKEW: f64 = 0.211_324_865_405_187_1;
    /// Brings the corner sum into `[-1, 1]`.
    const SCALE: f64 = 70.0;

    /// Builds a lattice from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        let mut lattice: Vec<u8> = (0..=255).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        lattice.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (slot, value) in perm.iter_mut().zip(lattice.iter().cycle()) {
            *slot = *value;
        }
        Self { perm }
    }

    #[inline]
    fn hash(&self, i: i64, j: i64) -> usize {
        let a = (i & 255) as usize;
        let b = (j & 255) as usize;
        usize::from(self.perm[a + usize::from(self.perm[b])])
    }

    #[inline]
    fn corner(&self, dx: f64, dy: f64, hash: usize) -> f64 {
        let falloff = 0.5 - dx * dx - dy * dy;
        if falloff <= 0.0 {
            return 0.0;
        }
        let [gx, gy] = GRADIENTS[hash & 7];
        let f2 = falloff * falloff;
        f2 * f2 * (gx * dx + gy * dy)
    }

    /// Samples the noise at a continuous coordinate. Result is in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let s = (x + y) * Self::SKEW;
        let cell_x = (x + s).floor();
        let cell_y = (y + s).floor();

        let t = (cell_x + cell_y) * Self::UNSKEW;
        let dx0 = x - (cell_x - t);
        let dy0 = y - (cell_y - t);

        // Upper or lower triangle of the skewed cell.
        let (step_x, step_y) = if dx0 > dy0 { (1_i64, 0_i64) } else { (0, 1) };

        let dx1 = dx0 - step_x as f64 + Self::UNSKEW;
        let dy1 = dy0 - step_y as f64 + Self::UNSKEW;
        let dx2 = dx0 - 1.0 + 2.0 * Self::UNSKEW;
        let dy2 = dy0 - 1.0 + 2.0 * Self::UNSKEW;

        // Saturating casts keep enormous inputs finite and in range.
        let i = cell_x as i64;
        let j = cell_y as i64;

        let total = self.corner(dx0, dy0, self.hash(i, j))
            + self.corner(dx1, dy1, self.hash(i.wrapping_add(step_x), j.wrapping_add(step_y)))
            + self.corner(dx2, dy2, self.hash(i.wrapping_add(1), j.wrapping_add(1)));

        (Self::SCALE * total).clamp(-1.0, 1.0)
    }
}

/// Shape of the fractal field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Number of layered octaves.
    pub octaves: u32,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Width of a base-octave feature, in tiles.
    pub feature_size: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
            feature_size: 128.0,
        }
    }
}

impl NoiseSettings {
    /// Most octaves a field will layer.
    pub const MAX_OCTAVES: u32 = 16;

    /// Returns true if every field is usable: 1 to [`Self::MAX_OCTAVES`]
    /// octaves and finite, positive multipliers and feature size.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        (1..=Self::MAX_OCTAVES).contains(&self.octaves)
            && positive(self.persistence)
            && positive(self.lacunarity)
            && positive(self.feature_size)
    }
}

/// Fractal noise field over world tiles.
///
/// `Send + Sync`; one field per world seed, shared by every generator
/// thread.
#[derive(Clone)]
pub struct NoiseField {
    simplex: SimplexNoise,
    settings: NoiseSettings,
}

impl NoiseField {
    /// Derivation purpose of the elevation lattice.
    const ELEVATION: u64 = 0x454C_4556;

    /// Creates a field with the default settings.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self::with_settings(seed, NoiseSettings::default())
    }

    /// Creates a field with explicit settings.
    ///
    /// Any field that [`NoiseSettings::is_valid`] would reject falls back
    /// to its default, so sampling never yields NaN.
    #[must_use]
    pub fn with_settings(seed: WorldSeed, settings: NoiseSettings) -> Self {
        let defaults = NoiseSettings::default();
        let usable = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        let settings = NoiseSettings {
            octaves: if (1..=NoiseSettings::MAX_OCTAVES).contains(&settings.octaves) {
                settings.octaves
            } else {
                defaults.octaves
            },
            persistence: usable(settings.persistence, defaults.persistence),
            lacunarity: usable(settings.lacunarity, defaults.lacunarity),
            feature_size: usable(settings.feature_size, defaults.feature_size),
        };
        Self {
            simplex: SimplexNoise::new(seed.derive(Self::ELEVATION)),
            settings,
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> NoiseSettings {
        self.settings
    }

    /// Samples the field at a world tile. Result is in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, world_x: i64, world_y: i64) -> f64 {
        let base = 1.0 / self.settings.feature_size;
        let x = world_x as f64 * base;
        let y = world_y as f64 * base;

        let mut total = 0.0;
        let mut energy = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..self.settings.octaves {
            total += self.simplex.sample(x * frequency, y * frequency) * amplitude;
            energy += amplitude * amplitude;
            amplitude *= self.settings.persistence;
            frequency *= self.settings.lacunarity;
        }

        // Normalising by the RMS amplitude keeps the spread of a single
        // octave, so the terrain bands stay meaningful for any octave count.
        if energy > 0.0 {
            (total / energy.sqrt()).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let a = NoiseField::new(WorldSeed::new(12345));
        let b = NoiseField::new(WorldSeed::new(12345));
        for i in -200..200_i64 {
            assert_eq!(a.sample(i * 7, i * -3), b.sample(i * 7, i * -3));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = NoiseField::new(WorldSeed::new(1));
        let b = NoiseField::new(WorldSeed::new(2));
        let differing = (0..100_i64)
            .filter(|&i| a.sample(i * 13, i * 5) != b.sample(i * 13, i * 5))
            .count();
        assert!(differing > 50, "only {differing} of 100 samples differ");
    }

    #[test]
    fn test_unusable_settings_fall_back() {
        let settings = NoiseSettings {
            octaves: 0,
            persistence: f64::NAN,
            lacunarity: f64::INFINITY,
            feature_size: -4.0,
        };
        assert!(!settings.is_valid());
        assert!(NoiseSettings::default().is_valid());

        let field = NoiseField::with_settings(WorldSeed::new(7), settings);
        assert!(field.settings().is_valid());
        assert_eq!(field.settings(), NoiseSettings::default());
        for i in 0..100_i64 {
            assert!(field.sample(i * 11, -i * 5).is_finite());
        }
    }

    #[test]
    fn test_range() {
        let field = NoiseField::new(WorldSeed::new(42));
        for i in 0..10_000_i64 {
            let v = field.sample(i * 3 - 15_000, i * 7 - 35_000);
            assert!((-1.0..=1.0).contains(&v), "value {v} out of range");
        }
    }

    #[test]
    fn test_huge_coordinates_do_not_panic() {
        let field = NoiseField::new(WorldSeed::new(42));
        for (x, y) in [
            (i64::MAX, i64::MAX),
            (i64::MIN, i64::MIN),
            (i64::MAX, i64::MIN),
            (1 << 40, -(1 << 40)),
        ] {
            let v = field.sample(x, y);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_neighbouring_tiles_are_similar() {
        let field = NoiseField::new(WorldSeed::new(7));
        let mut max_step: f64 = 0.0;
        for i in 0..500_i64 {
            let step = (field.sample(i, 40) - field.sample(i + 1, 40)).abs();
            max_step = max_step.max(step);
        }
        assert!(max_step < 0.25, "field is too rough: step {max_step}");
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        assert_eq!(base.derive(1), base.derive(1));
        assert_ne!(base.derive(1), base.derive(2));
        assert_ne!(base.derive(1), base);
    }

    #[test]
    fn test_wire_seed_roundtrip() {
        let seed = WorldSeed::from_i64(-5);
        assert_eq!(seed.as_i64(), -5);
        assert_eq!(seed.value(), u64::MAX - 4);
    }

    #[test]
    fn test_zero_octaves_fall_back() {
        let settings = NoiseSettings {
            octaves: 0,
            ..NoiseSettings::default()
        };
        let field = NoiseField::with_settings(WorldSeed::new(3), settings);
        assert_eq!(field.settings().octaves, NoiseSettings::default().octaves);
    }
}
