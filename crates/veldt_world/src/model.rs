//! # World Data Model
//!
//! Worlds, persisted chunks, resource nodes and their lifecycle state, in
//! the shape they travel on the wire.

use serde::Serialize;
use veldt_procedural::{ChunkCoord, GeneratedChunk, TerrainCell, WorldSeed};
use veldt_shared::{NodeId, NodeTypeId, Timestamp, WorldId};

/// A world: a seed plus metadata. Created once, never re-seeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct World {
    /// World identifier.
    pub id: WorldId,
    /// Display name.
    pub name: String,
    /// Generation seed.
    #[serde(serialize_with = "serialize_seed")]
    pub seed: WorldSeed,
    /// Creation time.
    pub created_at: Timestamp,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_seed<S: serde::Serializer>(seed: &WorldSeed, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(seed.as_i64())
}

/// Lifecycle state of a resource node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeState {
    /// Ready to harvest.
    #[default]
    Available,
    /// Harvested; comes back at `respawn_ready_at`.
    Depleted {
        /// When the node becomes harvestable again.
        respawn_ready_at: Timestamp,
    },
}

impl NodeState {
    /// State as observed at `now`: a depleted node whose respawn time has
    /// passed reads as available.
    #[inline]
    #[must_use]
    pub fn at(self, now: Timestamp) -> Self {
        match self {
            Self::Depleted { respawn_ready_at } if respawn_ready_at <= now => Self::Available,
            other => other,
        }
    }

    /// Returns true if harvestable at `now`.
    #[inline]
    #[must_use]
    pub fn is_available_at(self, now: Timestamp) -> bool {
        matches!(self.at(now), Self::Available)
    }
}

/// Versioned node state as stored by a repository.
///
/// A node that was never harvested has no record and reads as version 0,
/// available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeRecord {
    /// Monotonic version; every transition increments it by one.
    pub version: u64,
    /// Stored state (respawn not yet applied).
    pub state: NodeState,
}

/// A placed resource node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    /// Node identifier.
    #[serde(serialize_with = "serialize_node_id")]
    pub id: NodeId,
    /// Catalog type.
    pub type_id: NodeTypeId,
    /// Cell within the owning chunk.
    pub cell_index: u16,
    /// World tile X.
    pub tile_x: i64,
    /// World tile Y.
    pub tile_y: i64,
    /// Size factor in percent.
    pub scale_pct: u8,
    /// Current lifecycle state.
    #[serde(flatten)]
    pub state: NodeState,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_node_id<S: serde::Serializer>(id: &NodeId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(id.as_i64())
}

/// A 32x32 chunk as persisted and served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Owning world.
    pub world_id: WorldId,
    /// Chunk X.
    pub chunk_x: i32,
    /// Chunk Y.
    pub chunk_y: i32,
    /// Seed the chunk was generated from.
    pub seed: i64,
    /// When the chunk was first generated.
    pub generated_at: Timestamp,
    /// Exactly 1024 cells, row-major.
    pub cells: Vec<TerrainCell>,
    /// Resource nodes, in cell order.
    pub resource_nodes: Vec<ResourceNode>,
}

impl Chunk {
    /// Builds the persisted form of a freshly generated chunk. Every node
    /// starts available.
    #[must_use]
    pub fn from_generated(world_id: WorldId, generated: GeneratedChunk, generated_at: Timestamp) -> Self {
        let coord = generated.coord;
        let resource_nodes = generated
            .nodes
            .iter()
            .map(|p| {
                let (tile_x, tile_y) = coord.tile_of(p.cell_index);
                ResourceNode {
                    id: p.id,
                    type_id: p.type_id,
                    cell_index: p.cell_index,
                    tile_x,
                    tile_y,
                    scale_pct: p.scale_pct,
                    state: NodeState::Available,
                }
            })
            .collect();

        Self {
            world_id,
            chunk_x: coord.x,
            chunk_y: coord.y,
            seed: generated.seed.as_i64(),
            generated_at,
            cells: generated.cells,
            resource_nodes,
        }
    }

    /// Chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_y)
    }

    /// Cell under a world tile, if the tile lies in this chunk.
    #[must_use]
    pub fn cell_at_tile(&self, tile_x: i64, tile_y: i64) -> Option<TerrainCell> {
        if ChunkCoord::from_tile_pos(tile_x, tile_y)? != self.coord() {
            return None;
        }
        let index = ChunkCoord::cell_index_of(tile_x, tile_y);
        self.cells.get(usize::from(index)).copied()
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.resource_nodes.iter().find(|n| n.id == id)
    }
}
