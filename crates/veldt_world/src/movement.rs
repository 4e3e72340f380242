//! # Movement Validation
//!
//! Server-side check of a requested character move.
//!
//! The client says "move me to tile (x, y)". We verify, in this order:
//! 1. Has enough time passed since the last accepted move?
//! 2. Is the destination inside the world bounds?
//! 3. Is the destination terrain passable?
//!
//! The first failing check decides the verdict. A rejected move is a
//! normal outcome, not an error; committing an accepted move is left to
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use veldt_shared::{TerrainType, CHUNK_SIZE_I64, NODE_ID_AXIS_LIMIT};

use crate::character::CharacterPosition;
use crate::context::OpContext;
use crate::error::WorldResult;
use crate::model::World;
use crate::store::ChunkStore;

/// Inclusive tile bounds of the playable world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Smallest tile X.
    pub min_x: i64,
    /// Largest tile X.
    pub max_x: i64,
    /// Smallest tile Y.
    pub min_y: i64,
    /// Largest tile Y.
    pub max_y: i64,
}

impl WorldBounds {
    /// Bounds of a square centred on the origin.
    #[must_use]
    pub const fn square(half_extent: i64) -> Self {
        Self {
            min_x: -half_extent,
            max_x: half_extent,
            min_y: -half_extent,
            max_y: half_extent,
        }
    }

    /// Returns true if the tile lies inside the bounds.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Returns true if both ranges are non-empty.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Returns true if every chunk inside the bounds can carry resource
    /// nodes.
    #[must_use]
    pub const fn fits_node_ids(&self) -> bool {
        let limit = NODE_ID_AXIS_LIMIT as i64 * CHUNK_SIZE_I64;
        self.min_x >= -limit && self.max_x < limit && self.min_y >= -limit && self.max_y < limit
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::square(1_048_576)
    }
}

/// Movement tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Minimum time between two accepted moves of one character.
    pub min_move_interval_ms: u64,
    /// Playable area.
    pub bounds: WorldBounds,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            min_move_interval_ms: 100,
            bounds: WorldBounds::default(),
        }
    }
}

/// Why a move was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    /// The previous move was too recent.
    CooldownActive,
    /// The destination is outside the world bounds.
    OutOfBounds,
    /// The destination terrain cannot be entered.
    BlockedByTerrain,
}

impl MoveRejection {
    /// Message reported to the client.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CooldownActive => "movement cooldown active",
            Self::OutOfBounds => "movement out of bounds",
            Self::BlockedByTerrain => "movement blocked by terrain",
        }
    }
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a move check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum MoveVerdict {
    /// The move may be committed.
    Accepted {
        /// Terrain at the destination.
        terrain: TerrainType,
        /// Speed multiplier of that terrain.
        speed_multiplier: f32,
    },
    /// The move must not be committed.
    Rejected(MoveRejection),
}

impl MoveVerdict {
    /// Returns true for an accepted move.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Validates moves against cooldown, bounds and terrain.
pub struct MovementValidator {
    store: Arc<ChunkStore>,
    config: MovementConfig,
}

impl MovementValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(store: Arc<ChunkStore>, config: MovementConfig) -> Self {
        Self { store, config }
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> MovementConfig {
        self.config
    }

    /// Checks a move of `character` to tile `(x, y)`.
    ///
    /// # Errors
    ///
    /// Only if the destination chunk cannot be loaded or generated, or
    /// `ctx` expires while doing so. Refused moves are
    /// `Ok(MoveVerdict::Rejected(_))`.
    pub fn validate_move(
        &self,
        ctx: &OpContext,
        world: &World,
        character: &CharacterPosition,
        x: i64,
        y: i64,
    ) -> WorldResult<MoveVerdict> {
        if let Some(last) = character.last_move_at {
            let elapsed = self.store.now().saturating_since(last);
            if elapsed < Duration::from_millis(self.config.min_move_interval_ms) {
                return Ok(MoveVerdict::Rejected(MoveRejection::CooldownActive));
            }
        }

        if !self.config.bounds.contains(x, y) {
            return Ok(MoveVerdict::Rejected(MoveRejection::OutOfBounds));
        }

        let chunk = self.store.chunk_at_tile(ctx, world, x, y)?;
        let terrain = chunk
            .cell_at_tile(x, y)
            .map_or(TerrainType::Water, |cell| cell.terrain_type());
        if !terrain.is_passable() {
            return Ok(MoveVerdict::Rejected(MoveRejection::BlockedByTerrain));
        }

        Ok(MoveVerdict::Accepted {
            terrain,
            speed_multiplier: terrain.movement_speed_multiplier(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::store::StoreConfig;
    use veldt_procedural::{GeneratorConfig, WorldSeed};
    use veldt_shared::{CharacterId, ManualClock, ResourceCatalog, Timestamp, WorldId};

    fn validator(clock: Arc<ManualClock>) -> (MovementValidator, World) {
        let store = Arc::new(ChunkStore::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(ResourceCatalog::builtin()),
            GeneratorConfig::default(),
            StoreConfig::default(),
            clock,
        ));
        let config = MovementConfig {
            min_move_interval_ms: 100,
            bounds: WorldBounds::square(1_000),
        };
        let world = World {
            id: WorldId::new(1).unwrap(),
            name: "test".to_string(),
            seed: WorldSeed::new(12345),
            created_at: Timestamp::ZERO,
        };
        (MovementValidator::new(store, config), world)
    }

    fn position(last_move_at: Option<Timestamp>) -> CharacterPosition {
        CharacterPosition {
            character: CharacterId(1),
            world: WorldId::new(1).unwrap(),
            x: 0,
            y: 0,
            last_move_at,
        }
    }

    #[test]
    fn test_cooldown_checked_before_bounds() {
        let clock = Arc::new(ManualClock::new(Timestamp(1_050)));
        let (v, world) = validator(clock);
        let ctx = OpContext::background();
        let verdict = v
            .validate_move(&ctx, &world, &position(Some(Timestamp(1_000))), 5_000, 0)
            .unwrap();
        assert_eq!(verdict, MoveVerdict::Rejected(MoveRejection::CooldownActive));
    }

    #[test]
    fn test_out_of_bounds() {
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let (v, world) = validator(clock);
        let verdict = v
            .validate_move(&OpContext::background(), &world, &position(None), 1_001, 0)
            .unwrap();
        assert_eq!(verdict, MoveVerdict::Rejected(MoveRejection::OutOfBounds));
        assert_eq!(MoveRejection::OutOfBounds.message(), "movement out of bounds");
    }

    #[test]
    fn test_accepted_reports_terrain() {
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let (v, world) = validator(Arc::clone(&clock));
        let ctx = OpContext::background();
        let verdict = v
            .validate_move(&ctx, &world, &position(Some(Timestamp(900))), 12, -7)
            .unwrap();
        match verdict {
            MoveVerdict::Accepted {
                terrain,
                speed_multiplier,
            } => {
                let chunk = v.store.chunk_at_tile(&ctx, &world, 12, -7).unwrap();
                assert_eq!(chunk.cell_at_tile(12, -7).unwrap().terrain_type(), terrain);
                assert!((speed_multiplier - terrain.movement_speed_multiplier()).abs() < f32::EPSILON);
            }
            MoveVerdict::Rejected(r) => panic!("unexpected rejection: {r}"),
        }
    }

    #[test]
    fn test_default_bounds_fit_node_ids() {
        assert!(WorldBounds::default().is_ordered());
        assert!(WorldBounds::default().fits_node_ids());
        assert!(!WorldBounds::square(i64::MAX / 2).fits_node_ids());
    }
}
