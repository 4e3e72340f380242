//! World lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use veldt_procedural::WorldSeed;
use veldt_shared::{Clock, WorldId};

use crate::error::{WorldError, WorldResult};
use crate::model::World;

/// Resolves world ids to worlds.
pub trait WorldDirectory: Send + Sync {
    /// The world used when a request names none.
    ///
    /// # Errors
    ///
    /// `WorldError::WorldNotFound` if no default world is configured, or
    /// `WorldError::Storage` if the directory cannot be read.
    fn default_world(&self) -> WorldResult<World>;

    /// Looks up a world.
    ///
    /// # Errors
    ///
    /// `WorldError::WorldNotFound` if the id is unknown.
    fn world(&self, id: WorldId) -> WorldResult<World>;
}

/// In-memory worlds.
///
/// The default world (id 1) is created on first use from the configured
/// name and seed, and never re-seeded afterwards.
pub struct MemoryWorldDirectory {
    default_name: String,
    default_seed: WorldSeed,
    clock: Arc<dyn Clock>,
    worlds: RwLock<HashMap<WorldId, World>>,
}

impl MemoryWorldDirectory {
    /// Id of the default world.
    pub const DEFAULT_WORLD_ID: u64 = 1;

    /// Creates a directory whose default world uses `name` and `seed`.
    #[must_use]
    pub fn new(name: impl Into<String>, seed: WorldSeed, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_name: name.into(),
            default_seed: seed,
            clock,
            worlds: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a world with the next free id.
    ///
    /// # Errors
    ///
    /// `WorldError::Internal` if the id space is exhausted.
    pub fn create_world(&self, name: impl Into<String>, seed: WorldSeed) -> WorldResult<World> {
        let mut worlds = self.worlds.write();
        let id = worlds
            .keys()
            .map(|id| id.get())
            .max()
            .unwrap_or(Self::DEFAULT_WORLD_ID)
            .checked_add(1)
            .and_then(WorldId::new)
            .ok_or_else(|| WorldError::Internal("world id space exhausted".to_string()))?;
        let world = World {
            id,
            name: name.into(),
            seed,
            created_at: self.clock.now(),
        };
        worlds.insert(id, world.clone());
        tracing::info!("Created world {} ({}) with seed {}", id, world.name, seed.as_i64());
        Ok(world)
    }
}

impl WorldDirectory for MemoryWorldDirectory {
    fn default_world(&self) -> WorldResult<World> {
        let Some(id) = WorldId::new(Self::DEFAULT_WORLD_ID) else {
            return Err(WorldError::WorldNotFound(Self::DEFAULT_WORLD_ID.to_string()));
        };
        if let Some(world) = self.worlds.read().get(&id) {
            return Ok(world.clone());
        }
        let mut worlds = self.worlds.write();
        let world = worlds.entry(id).or_insert_with(|| World {
            id,
            name: self.default_name.clone(),
            seed: self.default_seed,
            created_at: self.clock.now(),
        });
        Ok(world.clone())
    }

    fn world(&self, id: WorldId) -> WorldResult<World> {
        if id.get() == Self::DEFAULT_WORLD_ID {
            return self.default_world();
        }
        self.worlds
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| WorldError::WorldNotFound(id.to_string()))
    }
}
