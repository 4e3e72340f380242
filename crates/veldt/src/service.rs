//! # World Service
//!
//! The six operations exposed to whatever transport fronts the world:
//!
//! | operation | returns |
//! |-----------|---------|
//! | `get_chunk` | one chunk |
//! | `get_chunks` | every chunk in a rectangle |
//! | `get_chunks_in_radius` | every chunk within a Euclidean radius |
//! | `harvest_resource` | items granted and the primary item's new stack |
//! | `move_character` | the moved character, or a rejection message |
//! | `resource_node_types` | the static node catalog |
//!
//! World ids arrive as decimal strings; `None` or an empty string selects
//! the default world. Harvest and move act as the character resolved from
//! the request's credentials.

use std::sync::Arc;

use serde::Serialize;
use veldt_economy::{InventoryLedger, ItemGrant, ItemStack};
use veldt_procedural::ChunkCoord;
use veldt_shared::{
    CharacterId, Clock, IdParseError, NodeId, ResourceNodeType, TerrainType, Timestamp, WorldId,
};
use veldt_world::{
    CharacterDirectory, CharacterPosition, Chunk, ChunkStore, MoveRejection, MoveVerdict,
    MovementConfig, MovementValidator, OpContext, ResourceNodeLifecycle, World, WorldDirectory,
    WorldError,
};

use crate::config::{ConfigError, VeldtConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{IdentityResolver, RequestContext};

/// Result of a harvest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HarvestResponse {
    /// Items granted, primary first.
    pub results: Vec<ItemGrant>,
    /// The character's stack of the primary item after the credit.
    pub updated_item: Option<ItemStack>,
    /// When the node becomes harvestable again.
    pub respawn_ready_at: Timestamp,
}

/// Result of a move request. A rejected move is a successful call with
/// `success == false`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MoveResponse {
    /// The character after the move, if accepted.
    pub character: Option<CharacterPosition>,
    /// Whether the move was accepted.
    pub success: bool,
    /// Rejection reason, empty on success.
    pub error_message: String,
    /// Terrain entered, if accepted.
    pub terrain: Option<TerrainType>,
}

/// Systems the service talks to but does not own.
#[derive(Clone)]
pub struct Collaborators {
    /// World lookup.
    pub worlds: Arc<dyn WorldDirectory>,
    /// Character positions.
    pub characters: Arc<dyn CharacterDirectory>,
    /// Caller identity.
    pub identity: Arc<dyn IdentityResolver>,
    /// Inventory credits.
    pub ledger: Arc<dyn InventoryLedger>,
}

/// Facade over the chunk store, node lifecycle and movement validator.
pub struct WorldService {
    worlds: Arc<dyn WorldDirectory>,
    characters: Arc<dyn CharacterDirectory>,
    identity: Arc<dyn IdentityResolver>,
    store: Arc<ChunkStore>,
    lifecycle: ResourceNodeLifecycle,
    movement: MovementValidator,
}

impl WorldService {
    /// Wires a service around an existing store.
    #[must_use]
    pub fn new(store: Arc<ChunkStore>, movement: MovementConfig, collaborators: Collaborators) -> Self {
        Self {
            worlds: collaborators.worlds,
            characters: collaborators.characters,
            identity: collaborators.identity,
            lifecycle: ResourceNodeLifecycle::new(Arc::clone(&store), collaborators.ledger),
            movement: MovementValidator::new(Arc::clone(&store), movement),
            store,
        }
    }

    /// Builds the store from configuration and wires a service around it.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the catalog or the repository cannot be opened.
    pub fn from_config(
        config: &VeldtConfig,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = Arc::new(ChunkStore::new(
            config.open_repository()?,
            Arc::new(config.load_catalog()?),
            config.generator_config(),
            config.store,
            clock,
        ));
        tracing::info!(
            "World service ready: {:?} storage, {} node types",
            config.storage.backend,
            store.catalog().len()
        );
        Ok(Self::new(store, config.movement, collaborators))
    }

    /// Chunk store behind the service.
    #[must_use]
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Returns one chunk, generating it on first request.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed world id, `NotFound` for an
    /// unknown world, otherwise as the store reports.
    pub fn get_chunk(&self, ctx: &OpContext, world_id: Option<&str>, x: i32, y: i32) -> ServiceResult<Arc<Chunk>> {
        let world = self.resolve_world(world_id)?;
        Ok(self.store.get_or_create(ctx, &world, ChunkCoord::new(x, y))?)
    }

    /// Returns every chunk in the closed rectangle.
    ///
    /// # Errors
    ///
    /// As [`Self::get_chunk`], plus `InvalidArgument` for an empty or
    /// oversized rectangle.
    pub fn get_chunks(
        &self,
        ctx: &OpContext,
        world_id: Option<&str>,
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
    ) -> ServiceResult<Vec<Arc<Chunk>>> {
        let world = self.resolve_world(world_id)?;
        Ok(self.store.get_range(ctx, &world, min_x, max_x, min_y, max_y)?)
    }

    /// Returns every chunk within `radius` chunks of the centre.
    ///
    /// # Errors
    ///
    /// As [`Self::get_chunk`], plus `InvalidArgument` for a negative or
    /// oversized radius.
    pub fn get_chunks_in_radius(
        &self,
        ctx: &OpContext,
        world_id: Option<&str>,
        center_x: i32,
        center_y: i32,
        radius: i32,
    ) -> ServiceResult<Vec<Arc<Chunk>>> {
        let world = self.resolve_world(world_id)?;
        Ok(self.store.get_radius(ctx, &world, center_x, center_y, radius)?)
    }

    /// Harvests a node for the calling character, in the character's
    /// world (the default world if the character has no position).
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` if the caller cannot be identified
    /// - `InvalidArgument` for a non-positive node id
    /// - `NotFound` for an unknown node
    /// - `Unavailable` if the node is depleted or was harvested concurrently
    /// - `Internal` if storage or the inventory ledger fail
    pub fn harvest_resource(
        &self,
        ctx: &OpContext,
        request: &RequestContext,
        node_id: i64,
    ) -> ServiceResult<HarvestResponse> {
        let character = self.identity.resolve_character(request)?;
        let node_id = NodeId::from_raw(node_id).map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        let world = self.character_world(character)?;

        let report = self.lifecycle.harvest(ctx, &world, node_id, character)?;
        let updated_item = report
            .grants
            .first()
            .and_then(|primary| report.stacks.iter().find(|s| s.item == primary.item))
            .cloned();

        Ok(HarvestResponse {
            results: report.grants,
            updated_item,
            respawn_ready_at: report.respawn_ready_at,
        })
    }

    /// Moves the calling character to tile `(x, y)` if the move passes
    /// validation.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `NotFound` for a character without a position,
    /// or a store failure while reading the destination. A refused move is
    /// `Ok` with `success == false`.
    pub fn move_character(
        &self,
        ctx: &OpContext,
        request: &RequestContext,
        x: i64,
        y: i64,
    ) -> ServiceResult<MoveResponse> {
        let character = self.identity.resolve_character(request)?;
        let position = self.characters.load(character)?;
        let world = self.worlds.world(position.world)?;

        let verdict = self.movement.validate_move(ctx, &world, &position, x, y)?;
        let terrain = match verdict {
            MoveVerdict::Accepted { terrain, .. } => terrain,
            MoveVerdict::Rejected(reason) => return Ok(Self::rejected_move(character, x, y, reason)),
        };

        ctx.check()?;
        // Commits only if no other move landed since `position` was read;
        // a move that lost that race is inside the winner's cooldown.
        match self
            .characters
            .commit_move(character, position.last_move_at, x, y, self.store.now())?
        {
            Some(moved) => {
                tracing::debug!("Character {} moved to ({}, {}) on {}", character, x, y, terrain.name());
                Ok(MoveResponse {
                    character: Some(moved),
                    success: true,
                    error_message: String::new(),
                    terrain: Some(terrain),
                })
            }
            None => Ok(Self::rejected_move(character, x, y, MoveRejection::CooldownActive)),
        }
    }

    fn rejected_move(character: CharacterId, x: i64, y: i64, reason: MoveRejection) -> MoveResponse {
        tracing::debug!("Character {} move to ({}, {}) rejected: {}", character, x, y, reason);
        MoveResponse {
            character: None,
            success: false,
            error_message: reason.message().to_string(),
            terrain: None,
        }
    }

    /// The static resource node catalog.
    #[must_use]
    pub fn resource_node_types(&self) -> &[ResourceNodeType] {
        self.store.catalog().types()
    }

    fn resolve_world(&self, world_id: Option<&str>) -> ServiceResult<World> {
        match world_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => Ok(self.worlds.default_world()?),
            Some(raw) => {
                let id: WorldId = raw
                    .parse()
                    .map_err(|e: IdParseError| ServiceError::InvalidArgument(e.to_string()))?;
                Ok(self.worlds.world(id)?)
            }
        }
    }

    fn character_world(&self, character: CharacterId) -> ServiceResult<World> {
        match self.characters.load(character) {
            Ok(position) => Ok(self.worlds.world(position.world)?),
            Err(WorldError::CharacterNotFound(_)) => Ok(self.worlds.default_world()?),
            Err(e) => Err(e.into()),
        }
    }
}
