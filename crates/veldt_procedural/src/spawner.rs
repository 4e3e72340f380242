//! # Resource-Node Spawner
//!
//! Places harvestable nodes on a freshly generated terrain grid.
//!
//! Every decision for a tile comes from a keyed hash of
//! `(seed, chunk, cell, purpose)`, never from a running RNG, so the outcome
//! for one tile does not depend on how many draws earlier tiles made.
//! The only sequential state is the list of nodes already placed, which
//! drives the exclusion radius and the per-chunk cap; tiles are visited
//! in cell order, so that state is deterministic too.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use veldt_shared::{NodeId, ResourceCatalog, ResourceNodeType};

use crate::chunk::{local_of, ChunkCoord, NodePlacement, TerrainCell};
use crate::hash::{bounded, tile_hash, Purpose};
use crate::noise::WorldSeed;

/// Smallest node scale, in percent.
pub const MIN_SCALE_PCT: u8 = 75;
/// Largest node scale, in percent.
pub const MAX_SCALE_PCT: u8 = 150;

/// Placement tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Chance per tile to attempt a spawn, in basis points.
    pub density_bp: u32,
    /// Minimum Chebyshev distance, in tiles, kept free around each node.
    pub exclusion_radius: u16,
    /// Hard cap on nodes in one chunk.
    pub max_nodes_per_chunk: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            density_bp: 150,
            exclusion_radius: 1,
            max_nodes_per_chunk: 24,
        }
    }
}

/// Places resource nodes from a catalog.
pub struct ResourceNodeSpawner {
    catalog: Arc<ResourceCatalog>,
    config: SpawnerConfig,
}

impl ResourceNodeSpawner {
    /// Creates a spawner.
    #[must_use]
    pub fn new(catalog: Arc<ResourceCatalog>, config: SpawnerConfig) -> Self {
        Self { catalog, config }
    }

    /// Catalog this spawner draws from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ResourceCatalog> {
        &self.catalog
    }

    /// Chooses node placements for a completed terrain grid.
    ///
    /// Chunks whose coordinate cannot be encoded in a [`NodeId`] get no
    /// nodes.
    #[must_use]
    pub fn spawn(&self, seed: WorldSeed, coord: ChunkCoord, cells: &[TerrainCell]) -> Vec<NodePlacement> {
        let mut placed: Vec<NodePlacement> = Vec::new();
        if NodeId::encode(coord.x, coord.y, 0).is_none() || self.config.max_nodes_per_chunk == 0 {
            return placed;
        }

        for (index, cell) in cells.iter().enumerate() {
            if placed.len() >= self.config.max_nodes_per_chunk {
                break;
            }
            let index = index as u16;

            let roll = bounded(tile_hash(seed, coord, index, Purpose::SpawnRoll), 10_000);
            if roll >= u64::from(self.config.density_bp) {
                continue;
            }

            if self.is_excluded(index, &placed) {
                continue;
            }

            let pick = tile_hash(seed, coord, index, Purpose::TypePick);
            let Some(node_type) = self.pick_type(*cell, pick) else {
                continue;
            };

            let Some(id) = NodeId::encode(coord.x, coord.y, index) else {
                continue;
            };
            let span = u64::from(MAX_SCALE_PCT - MIN_SCALE_PCT) + 1;
            let scale = bounded(tile_hash(seed, coord, index, Purpose::Scale), span);

            placed.push(NodePlacement {
                id,
                type_id: node_type.id,
                cell_index: index,
                scale_pct: MIN_SCALE_PCT + scale as u8,
            });
        }

        placed
    }

    /// Rarity-weighted pick among the types allowed on this cell.
    fn pick_type(&self, cell: TerrainCell, hash: u64) -> Option<&ResourceNodeType> {
        let terrain = cell.terrain_type();
        let total: u64 = self
            .catalog
            .types_for(terrain)
            .map(|t| u64::from(t.rarity.spawn_weight()))
            .sum();
        if total == 0 {
            return None;
        }

        let mut target = bounded(hash, total);
        for candidate in self.catalog.types_for(terrain) {
            let weight = u64::from(candidate.rarity.spawn_weight());
            if target < weight {
                return Some(candidate);
            }
            target -= weight;
        }
        None
    }

    fn is_excluded(&self, index: u16, placed: &[NodePlacement]) -> bool {
        let radius = i32::from(self.config.exclusion_radius);
        if radius == 0 {
            return false;
        }
        let (x, y) = local_of(index);
        placed.iter().any(|p| {
            let (px, py) = local_of(p.cell_index);
            let dx = (i32::from(x) - i32::from(px)).abs();
            let dy = (i32::from(y) - i32::from(py)).abs();
            dx.max(dy) <= radius
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veldt_shared::{TerrainType, CELLS_PER_CHUNK};

    fn grass_grid() -> Vec<TerrainCell> {
        vec![
            TerrainCell {
                terrain: TerrainType::Grass as u8,
                ..TerrainCell::default()
            };
            CELLS_PER_CHUNK
        ]
    }

    fn spawner(config: SpawnerConfig) -> ResourceNodeSpawner {
        ResourceNodeSpawner::new(Arc::new(ResourceCatalog::builtin()), config)
    }

    #[test]
    fn test_cap_is_respected() {
        let s = spawner(SpawnerConfig {
            density_bp: 10_000,
            exclusion_radius: 0,
            max_nodes_per_chunk: 10,
        });
        let nodes = s.spawn(WorldSeed::new(1), ChunkCoord::new(0, 0), &grass_grid());
        assert_eq!(nodes.len(), 10);
    }

    #[test]
    fn test_exclusion_radius_keeps_nodes_apart() {
        let s = spawner(SpawnerConfig {
            density_bp: 10_000,
            exclusion_radius: 1,
            max_nodes_per_chunk: 1024,
        });
        let nodes = s.spawn(WorldSeed::new(2), ChunkCoord::new(3, 3), &grass_grid());
        assert!(!nodes.is_empty());
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let (ax, ay) = local_of(a.cell_index);
                let (bx, by) = local_of(b.cell_index);
                let d = (i32::from(ax) - i32::from(bx))
                    .abs()
                    .max((i32::from(ay) - i32::from(by)).abs());
                assert!(d > 1, "nodes at {} and {} are adjacent", a.cell_index, b.cell_index);
            }
        }
    }

    #[test]
    fn test_types_match_terrain() {
        let catalog = Arc::new(ResourceCatalog::builtin());
        let s = ResourceNodeSpawner::new(
            Arc::clone(&catalog),
            SpawnerConfig {
                density_bp: 5_000,
                ..SpawnerConfig::default()
            },
        );
        let nodes = s.spawn(WorldSeed::new(3), ChunkCoord::new(-1, 0), &grass_grid());
        for node in &nodes {
            let ty = catalog.get(node.type_id).unwrap();
            assert!(ty.allows(TerrainType::Grass), "{} on grass", ty.key);
            assert!((MIN_SCALE_PCT..=MAX_SCALE_PCT).contains(&node.scale_pct));
            assert_eq!(node.id.decode(), Some((-1, 0, node.cell_index)));
        }
    }

    #[test]
    fn test_zero_density_spawns_nothing() {
        let s = spawner(SpawnerConfig {
            density_bp: 0,
            ..SpawnerConfig::default()
        });
        assert!(s.spawn(WorldSeed::new(4), ChunkCoord::new(0, 0), &grass_grid()).is_empty());
    }

    #[test]
    fn test_unencodable_chunk_has_no_nodes() {
        let s = spawner(SpawnerConfig {
            density_bp: 10_000,
            ..SpawnerConfig::default()
        });
        let far = ChunkCoord::new(i32::MAX, 0);
        assert!(s.spawn(WorldSeed::new(5), far, &grass_grid()).is_empty());
    }
}
