//! In-process repository. Exclusivity holds within one process only.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use veldt_procedural::ChunkCoord;
use veldt_shared::{NodeId, WorldId};

use super::{ChunkRepository, InsertOutcome};
use crate::error::StorageResult;
use crate::model::{Chunk, NodeRecord, NodeState};

/// Repository backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    chunks: RwLock<HashMap<(WorldId, ChunkCoord), Arc<Chunk>>>,
    nodes: Mutex<HashMap<(WorldId, NodeId), NodeRecord>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().len()
    }
}

impl ChunkRepository for MemoryRepository {
    fn load_chunk(&self, world: WorldId, coord: ChunkCoord) -> StorageResult<Option<Arc<Chunk>>> {
        Ok(self.chunks.read().get(&(world, coord)).cloned())
    }

    fn insert_chunk_if_absent(&self, chunk: &Chunk) -> StorageResult<InsertOutcome> {
        let key = (chunk.world_id, chunk.coord());
        match self.chunks.write().entry(key) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(chunk.clone()));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn node_state(&self, world: WorldId, node: NodeId) -> StorageResult<NodeRecord> {
        Ok(self.nodes.lock().get(&(world, node)).copied().unwrap_or_default())
    }

    fn compare_and_swap_node(
        &self,
        world: WorldId,
        node: NodeId,
        expected_version: u64,
        state: NodeState,
    ) -> StorageResult<bool> {
        let mut nodes = self.nodes.lock();
        let record = nodes.entry((world, node)).or_default();
        if record.version != expected_version {
            return Ok(false);
        }
        *record = NodeRecord {
            version: expected_version + 1,
            state,
        };
        Ok(true)
    }
}
