//! # Chunk Store
//!
//! Get-or-create access to the chunks of every world.
//!
//! ## Exclusivity
//!
//! A chunk is generated at most once per `(world, coordinate)`:
//!
//! 1. **In process**: concurrent requests for one missing chunk are
//!    coalesced. The first caller becomes the leader of a *flight*, the
//!    others wait on the flight's condvar and receive the leader's result.
//! 2. **Across processes**: the leader persists with insert-if-absent. If
//!    another server got there first, the local copy is discarded and the
//!    stored chunk is re-read.
//!
//! No lock is held across repository I/O. The flight table is locked only
//! to join or leave a flight, and a flight's slot only guards an in-memory
//! result.
//!
//! ## Node State
//!
//! Stored chunks never change. Node lifecycle state lives beside them in
//! the repository and is merged into every chunk handed out, using the
//! store clock, so a node whose respawn time has passed reads as available
//! without anything having been written.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use veldt_procedural::{ChunkCoord, ChunkGenerator, GeneratorConfig, WorldSeed};
use veldt_shared::{Clock, NodeId, ResourceCatalog, Timestamp, WorldId};

use crate::context::OpContext;
use crate::error::{WorldError, WorldResult};
use crate::model::{Chunk, ResourceNode, World};
use crate::repository::{ChunkRepository, InsertOutcome};
use crate::stats::StoreStats;

/// How often a waiting follower re-checks its own deadline.
const FOLLOWER_POLL: Duration = Duration::from_millis(50);

/// Store limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest number of chunks one range or radius request may cover.
    pub max_chunks_per_request: usize,
    /// Fetch the chunks of a range or radius request in parallel.
    pub parallel_fanout: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_chunks_per_request: 1024,
            parallel_fanout: true,
        }
    }
}

type FlightKey = (WorldId, ChunkCoord);

/// One in-progress generation that other callers can wait on.
struct Flight {
    result: Mutex<Option<WorldResult<Arc<Chunk>>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }
}

/// Held by a flight leader. Publishes the result to followers and leaves
/// the flight table, even if generation unwinds.
struct FlightGuard<'a> {
    flights: &'a Mutex<HashMap<FlightKey, Arc<Flight>>>,
    key: FlightKey,
    flight: Arc<Flight>,
    published: bool,
}

impl FlightGuard<'_> {
    fn publish(&mut self, result: WorldResult<Arc<Chunk>>) {
        *self.flight.result.lock() = Some(result);
        self.flights.lock().remove(&self.key);
        self.flight.done.notify_all();
        self.published = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.publish(Err(WorldError::Internal(format!(
                "generation of chunk ({}, {}) in world {} panicked",
                self.key.1.x, self.key.1.y, self.key.0
            ))));
        }
    }
}

/// Get-or-create chunk access with single flight, range and radius
/// queries.
pub struct ChunkStore {
    repo: Arc<dyn ChunkRepository>,
    catalog: Arc<ResourceCatalog>,
    generator_config: GeneratorConfig,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    generators: RwLock<HashMap<WorldSeed, Arc<ChunkGenerator>>>,
    flights: Mutex<HashMap<FlightKey, Arc<Flight>>>,
    stats: StoreStats,
}

impl ChunkStore {
    /// Creates a store.
    ///
    /// # Arguments
    ///
    /// * `repo` - Chunk and node-state storage
    /// * `catalog` - Resource node types placed by generation
    /// * `generator_config` - Terrain, noise and spawner tuning
    /// * `config` - Request limits
    /// * `clock` - Time source for `generated_at` and respawn checks
    #[must_use]
    pub fn new(
        repo: Arc<dyn ChunkRepository>,
        catalog: Arc<ResourceCatalog>,
        generator_config: GeneratorConfig,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            catalog,
            generator_config,
            config,
            clock,
            generators: RwLock::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            stats: StoreStats::default(),
        }
    }

    /// Backing repository.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn ChunkRepository> {
        &self.repo
    }

    /// Catalog used for generation.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ResourceCatalog> {
        &self.catalog
    }

    /// Request limits.
    #[must_use]
    pub const fn config(&self) -> StoreConfig {
        self.config
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Current time on the store clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Returns the chunk at `coord`, generating and persisting it if it
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// - `WorldError::Cancelled` / `DeadlineExceeded` if `ctx` expires
    ///   before the chunk is committed; nothing is persisted in that case
    /// - `WorldError::Storage` if the repository fails
    pub fn get_or_create(&self, ctx: &OpContext, world: &World, coord: ChunkCoord) -> WorldResult<Arc<Chunk>> {
        ctx.check()?;
        let chunk = self.load_or_generate(ctx, world, coord)?;
        self.merge_node_states(world.id, chunk)
    }

    /// Returns every chunk in the closed rectangle, generating missing
    /// ones in parallel. Each coordinate appears exactly once, row by row.
    ///
    /// # Errors
    ///
    /// - `WorldError::InvalidArgument` if a minimum exceeds its maximum or
    ///   the rectangle covers more than `max_chunks_per_request` chunks
    /// - anything [`ChunkStore::get_or_create`] returns
    pub fn get_range(
        &self,
        ctx: &OpContext,
        world: &World,
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
    ) -> WorldResult<Vec<Arc<Chunk>>> {
        if min_x > max_x || min_y > max_y {
            return Err(WorldError::InvalidArgument(format!(
                "empty chunk range x {min_x}..={max_x}, y {min_y}..={max_y}"
            )));
        }
        let width = i64::from(max_x) - i64::from(min_x) + 1;
        let height = i64::from(max_y) - i64::from(min_y) + 1;
        self.check_request_size(width.saturating_mul(height))?;

        let coords: Vec<ChunkCoord> = (min_y..=max_y)
            .flat_map(|y| (min_x..=max_x).map(move |x| ChunkCoord::new(x, y)))
            .collect();
        self.fetch_all(ctx, world, &coords)
    }

    /// Returns every chunk whose coordinate lies within Euclidean distance
    /// `radius` of the centre (`dx² + dy² ≤ radius²`). Coordinates that
    /// would fall outside the `i32` chunk space are skipped.
    ///
    /// # Errors
    ///
    /// - `WorldError::InvalidArgument` for a negative radius or one covering
    ///   more than `max_chunks_per_request` chunks
    /// - anything [`ChunkStore::get_or_create`] returns
    pub fn get_radius(
        &self,
        ctx: &OpContext,
        world: &World,
        center_x: i32,
        center_y: i32,
        radius: i32,
    ) -> WorldResult<Vec<Arc<Chunk>>> {
        if radius < 0 {
            return Err(WorldError::InvalidArgument(format!("negative radius {radius}")));
        }
        let r = i64::from(radius);
        // The disc holds at least its diameter; rejecting here bounds the
        // scan below.
        self.check_request_size(2 * r + 1)?;

        let r2 = r * r;
        let mut coords = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                let x = i32::try_from(i64::from(center_x) + dx);
                let y = i32::try_from(i64::from(center_y) + dy);
                if let (Ok(x), Ok(y)) = (x, y) {
                    coords.push(ChunkCoord::new(x, y));
                }
            }
        }
        self.check_request_size(coords.len() as i64)?;
        self.fetch_all(ctx, world, &coords)
    }

    /// Returns the chunk containing a world tile.
    ///
    /// # Errors
    ///
    /// `WorldError::InvalidArgument` if the tile lies outside the chunk
    /// coordinate space, otherwise as [`ChunkStore::get_or_create`].
    pub fn chunk_at_tile(&self, ctx: &OpContext, world: &World, tile_x: i64, tile_y: i64) -> WorldResult<Arc<Chunk>> {
        let coord = ChunkCoord::from_tile_pos(tile_x, tile_y).ok_or_else(|| {
            WorldError::InvalidArgument(format!("tile ({tile_x}, {tile_y}) is outside the world"))
        })?;
        self.get_or_create(ctx, world, coord)
    }

    /// Finds a resource node by id, with its current state.
    ///
    /// Never generates: a node in a chunk nobody has requested yet does not
    /// exist.
    ///
    /// # Errors
    ///
    /// `WorldError::NodeNotFound` if the id does not decode, its chunk was
    /// never generated or the cell holds no node; `WorldError::Storage` if
    /// the repository fails.
    pub fn find_node(&self, world: &World, id: NodeId) -> WorldResult<ResourceNode> {
        let mut node = self.locate_node(world, id)?;
        let record = self.repo.node_state(world.id, id)?;
        node.state = record.state.at(self.clock.now());
        Ok(node)
    }

    /// Node as placed at generation, without its lifecycle state.
    pub(crate) fn locate_node(&self, world: &World, id: NodeId) -> WorldResult<ResourceNode> {
        let (chunk_x, chunk_y, _) = id.decode().ok_or(WorldError::NodeNotFound(id))?;
        let chunk = self
            .repo
            .load_chunk(world.id, ChunkCoord::new(chunk_x, chunk_y))?
            .ok_or(WorldError::NodeNotFound(id))?;
        chunk.node(id).copied().ok_or(WorldError::NodeNotFound(id))
    }

    fn check_request_size(&self, count: i64) -> WorldResult<()> {
        let limit = self.config.max_chunks_per_request;
        if count > limit as i64 {
            return Err(WorldError::InvalidArgument(format!(
                "request covers {count} chunks, limit is {limit}"
            )));
        }
        Ok(())
    }

    fn fetch_all(&self, ctx: &OpContext, world: &World, coords: &[ChunkCoord]) -> WorldResult<Vec<Arc<Chunk>>> {
        ctx.check()?;
        if self.config.parallel_fanout {
            coords
                .par_iter()
                .map(|&coord| self.get_or_create(ctx, world, coord))
                .collect()
        } else {
            coords
                .iter()
                .map(|&coord| self.get_or_create(ctx, world, coord))
                .collect()
        }
    }

    fn generator(&self, seed: WorldSeed) -> Arc<ChunkGenerator> {
        if let Some(generator) = self.generators.read().get(&seed) {
            return Arc::clone(generator);
        }
        let mut generators = self.generators.write();
        let generator = generators.entry(seed).or_insert_with(|| {
            Arc::new(ChunkGenerator::new(
                seed,
                &self.generator_config,
                Arc::clone(&self.catalog),
            ))
        });
        Arc::clone(generator)
    }

    fn load_or_generate(&self, ctx: &OpContext, world: &World, coord: ChunkCoord) -> WorldResult<Arc<Chunk>> {
        loop {
            if let Some(chunk) = self.repo.load_chunk(world.id, coord)? {
                self.stats.record_load();
                return Ok(chunk);
            }

            let key = (world.id, coord);
            let (flight, leader) = {
                let mut flights = self.flights.lock();
                match flights.get(&key) {
                    Some(flight) => (Arc::clone(flight), false),
                    None => {
                        let flight = Arc::new(Flight::new());
                        flights.insert(key, Arc::clone(&flight));
                        (flight, true)
                    }
                }
            };

            if leader {
                let mut guard = FlightGuard {
                    flights: &self.flights,
                    key,
                    flight,
                    published: false,
                };
                let result = self.generate_and_insert(ctx, world, coord);
                guard.publish(result.clone());
                return result;
            }

            self.stats.record_coalesced_wait();
            match Self::wait_for_leader(ctx, &flight)? {
                Ok(chunk) => return Ok(chunk),
                // The leader's own deadline says nothing about ours.
                Err(e) if e.is_abort() => {
                    tracing::debug!(
                        "Leader for chunk ({}, {}) aborted, retrying",
                        coord.x,
                        coord.y
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Blocks until the flight completes or `ctx` expires.
    fn wait_for_leader(ctx: &OpContext, flight: &Flight) -> WorldResult<WorldResult<Arc<Chunk>>> {
        let mut slot = flight.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return Ok(result.clone());
            }
            ctx.check()?;
            flight.done.wait_for(&mut slot, FOLLOWER_POLL);
        }
    }

    fn generate_and_insert(&self, ctx: &OpContext, world: &World, coord: ChunkCoord) -> WorldResult<Arc<Chunk>> {
        // A flight that just finished may have stored it.
        if let Some(chunk) = self.repo.load_chunk(world.id, coord)? {
            self.stats.record_load();
            return Ok(chunk);
        }

        let started = Instant::now();
        let generated = self.generator(world.seed).generate(coord);
        let chunk = Chunk::from_generated(world.id, generated, self.clock.now());

        ctx.check()?;
        match self.repo.insert_chunk_if_absent(&chunk)? {
            InsertOutcome::Inserted => {
                self.stats.record_generation(started.elapsed());
                tracing::info!(
                    "Generated chunk ({}, {}) in world {} with {} resource nodes",
                    coord.x,
                    coord.y,
                    world.id,
                    chunk.resource_nodes.len()
                );
                Ok(Arc::new(chunk))
            }
            InsertOutcome::AlreadyExists => {
                self.stats.record_conflict();
                tracing::warn!(
                    "Chunk ({}, {}) in world {} was stored concurrently, using stored copy",
                    coord.x,
                    coord.y,
                    world.id
                );
                self.repo.load_chunk(world.id, coord)?.ok_or_else(|| {
                    WorldError::Internal(format!(
                        "chunk ({}, {}) missing after insert conflict",
                        coord.x, coord.y
                    ))
                })
            }
        }
    }

    fn merge_node_states(&self, world: WorldId, chunk: Arc<Chunk>) -> WorldResult<Arc<Chunk>> {
        if chunk.resource_nodes.is_empty() {
            return Ok(chunk);
        }
        let ids: Vec<NodeId> = chunk.resource_nodes.iter().map(|n| n.id).collect();
        let records = self.repo.node_states(world, &ids)?;
        if records.is_empty() {
            return Ok(chunk);
        }

        let now = self.clock.now();
        let mut merged = Chunk::clone(&chunk);
        for node in &mut merged.resource_nodes {
            if let Some(record) = records.get(&node.id) {
                node.state = record.state.at(now);
            }
        }
        Ok(Arc::new(merged))
    }
}
