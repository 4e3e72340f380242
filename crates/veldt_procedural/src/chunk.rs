//! # Chunk Generation
//!
//! The world is an infinite grid of 32x32-tile chunks. A chunk is a pure
//! function of `(seed, coordinate)`: generating it twice, on any thread or
//! any machine, yields identical cells and identical node placements.
//!
//! ## Cell Layout
//!
//! Cells are stored row-major, `index = local_y * 32 + local_x`. Each cell
//! is 4 bytes and `Pod`, so a whole chunk casts to a 4 KiB byte slice for
//! storage.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use veldt_shared::constants::CHUNK_SIZE_I64;
use veldt_shared::{NodeId, NodeTypeId, ResourceCatalog, TerrainType, CELLS_PER_CHUNK, CHUNK_SIZE};

use crate::hash::{bounded, tile_hash, Purpose};
use crate::noise::{NoiseField, NoiseSettings, WorldSeed};
use crate::spawner::{ResourceNodeSpawner, SpawnerConfig};
use crate::terrain::{TerrainClassifier, TerrainThresholds};

/// Number of cosmetic variants per terrain type.
pub const TERRAIN_VARIANTS: u64 = 4;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not tiles).
    pub x: i32,
    /// Y coordinate (in chunks, not tiles).
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a world tile.
    ///
    /// Uses floor division, so tile `-1` lies in chunk `-1`. Returns `None`
    /// if the chunk coordinate does not fit in `i32`.
    #[inline]
    #[must_use]
    pub fn from_tile_pos(tile_x: i64, tile_y: i64) -> Option<Self> {
        let x = i32::try_from(tile_x.div_euclid(CHUNK_SIZE_I64)).ok()?;
        let y = i32::try_from(tile_y.div_euclid(CHUNK_SIZE_I64)).ok()?;
        Some(Self { x, y })
    }

    /// Cell index of a world tile within its chunk.
    #[inline]
    #[must_use]
    pub const fn cell_index_of(tile_x: i64, tile_y: i64) -> u16 {
        let lx = tile_x.rem_euclid(CHUNK_SIZE_I64);
        let ly = tile_y.rem_euclid(CHUNK_SIZE_I64);
        (ly * CHUNK_SIZE_I64 + lx) as u16
    }

    /// World tile of this chunk's origin (minimum corner).
    #[inline]
    #[must_use]
    pub const fn origin_tile(self) -> (i64, i64) {
        (self.x as i64 * CHUNK_SIZE_I64, self.y as i64 * CHUNK_SIZE_I64)
    }

    /// World tile of a cell in this chunk.
    #[inline]
    #[must_use]
    pub const fn tile_of(self, cell_index: u16) -> (i64, i64) {
        let (ox, oy) = self.origin_tile();
        let (lx, ly) = local_of(cell_index);
        (ox + lx as i64, oy + ly as i64)
    }
}

/// Local `(x, y)` of a cell index.
#[inline]
#[must_use]
pub const fn local_of(cell_index: u16) -> (u16, u16) {
    (cell_index % CHUNK_SIZE as u16, cell_index / CHUNK_SIZE as u16)
}

/// A single terrain tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct TerrainCell {
    /// Terrain tag, see [`TerrainType`].
    pub terrain: u8,
    /// Elevation quantised to 0..=255.
    pub elevation: u8,
    /// Cosmetic variant.
    pub variant: u8,
    /// Bit flags, see `FLAG_*`.
    pub flags: u8,
}

impl TerrainCell {
    /// Set on cells that host a resource node.
    pub const FLAG_HAS_NODE: u8 = 0b0000_0001;

    /// Terrain type of this cell.
    ///
    /// Cells only come from the generator or the validated codec, so an
    /// unknown tag cannot occur; it reads as stone.
    #[inline]
    #[must_use]
    pub const fn terrain_type(self) -> TerrainType {
        match TerrainType::from_u8(self.terrain) {
            Some(t) => t,
            None => TerrainType::Stone,
        }
    }

    /// Returns true if a resource node sits on this cell.
    #[inline]
    #[must_use]
    pub const fn has_node(self) -> bool {
        self.flags & Self::FLAG_HAS_NODE != 0
    }
}

/// A resource node chosen by the spawner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePlacement {
    /// Node identifier, derived from chunk and cell.
    pub id: NodeId,
    /// Catalog type.
    pub type_id: NodeTypeId,
    /// Cell the node sits on.
    pub cell_index: u16,
    /// Size factor in percent, 75..=150.
    pub scale_pct: u8,
}

/// Output of [`ChunkGenerator::generate`].
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedChunk {
    /// Chunk position.
    pub coord: ChunkCoord,
    /// Seed the chunk was generated from.
    pub seed: WorldSeed,
    /// Exactly `CELLS_PER_CHUNK` cells, row-major.
    pub cells: Vec<TerrainCell>,
    /// Nodes placed on the chunk, in cell order.
    pub nodes: Vec<NodePlacement>,
}

impl GeneratedChunk {
    /// Cell at local coordinates, if in range.
    #[inline]
    #[must_use]
    pub fn cell(&self, local_x: usize, local_y: usize) -> Option<TerrainCell> {
        if local_x < CHUNK_SIZE && local_y < CHUNK_SIZE {
            self.cells.get(local_y * CHUNK_SIZE + local_x).copied()
        } else {
            None
        }
    }
}

/// Everything that shapes generation besides the seed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Terrain bands.
    pub thresholds: TerrainThresholds,
    /// Fractal noise shape.
    pub noise: NoiseSettings,
    /// Node placement.
    pub spawner: SpawnerConfig,
}

/// Generates chunks for one world seed.
///
/// Holds only immutable state, so one generator is shared across threads.
pub struct ChunkGenerator {
    seed: WorldSeed,
    field: NoiseField,
    classifier: TerrainClassifier,
    spawner: ResourceNodeSpawner,
}

impl ChunkGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &GeneratorConfig, catalog: Arc<ResourceCatalog>) -> Self {
        Self {
            seed,
            field: NoiseField::with_settings(seed, config.noise),
            classifier: TerrainClassifier::new(config.thresholds),
            spawner: ResourceNodeSpawner::new(catalog, config.spawner),
        }
    }

    /// Creates a generator with default settings and the built-in catalog.
    #[must_use]
    pub fn with_defaults(seed: WorldSeed) -> Self {
        Self::new(
            seed,
            &GeneratorConfig::default(),
            Arc::new(ResourceCatalog::builtin()),
        )
    }

    /// Seed this generator produces chunks for.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Generates the chunk at `coord`.
    ///
    /// Pass 1 fills the terrain grid; pass 2 places resource nodes on the
    /// completed grid.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> GeneratedChunk {
        let mut cells = Vec::with_capacity(CELLS_PER_CHUNK);
        for index in 0..CELLS_PER_CHUNK as u16 {
            let (tx, ty) = coord.tile_of(index);
            let value = self.field.sample(tx, ty);
            let terrain = self.classifier.classify(value);
            let variant = bounded(
                tile_hash(self.seed, coord, index, Purpose::Variant),
                TERRAIN_VARIANTS,
            );
            cells.push(TerrainCell {
                terrain: terrain as u8,
                elevation: ((value + 1.0) * 127.5).round() as u8,
                variant: variant as u8,
                flags: 0,
            });
        }

        let nodes = self.spawner.spawn(self.seed, coord, &cells);
        for node in &nodes {
            cells[usize::from(node.cell_index)].flags |= TerrainCell::FLAG_HAS_NODE;
        }

        GeneratedChunk {
            coord,
            seed: self.seed,
            cells,
            nodes,
        }
    }
}
