//! # Chunk Repositories
//!
//! Durable storage for chunks and node lifecycle state.
//!
//! Two primitives carry every exclusivity guarantee of the world:
//!
//! - **insert-if-absent** for chunks: the first writer for a
//!   `(world, coordinate)` wins; every later writer is told the chunk
//!   already exists and must re-read it.
//! - **compare-and-swap** for node state: a transition is only stored if
//!   the node's version is still the one the caller read.
//!
//! Both must hold across processes for any backend shared by several
//! servers.

mod file;
mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use veldt_procedural::ChunkCoord;
use veldt_shared::{NodeId, WorldId};

use crate::error::StorageResult;
use crate::model::{Chunk, NodeRecord, NodeState};

pub use file::FileRepository;
pub use memory::MemoryRepository;

/// Outcome of [`ChunkRepository::insert_chunk_if_absent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This call stored the chunk.
    Inserted,
    /// A chunk for the key was already stored; nothing was written.
    AlreadyExists,
}

/// Storage backend for chunks and node state.
pub trait ChunkRepository: Send + Sync {
    /// Loads a stored chunk.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend fails or the record is corrupt.
    fn load_chunk(&self, world: WorldId, coord: ChunkCoord) -> StorageResult<Option<Arc<Chunk>>>;

    /// Stores `chunk` unless a chunk already exists for its key.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend fails. Losing the race is not
    /// an error.
    fn insert_chunk_if_absent(&self, chunk: &Chunk) -> StorageResult<InsertOutcome>;

    /// Reads a node's versioned state. Unknown nodes read as version 0,
    /// available.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend fails.
    fn node_state(&self, world: WorldId, node: NodeId) -> StorageResult<NodeRecord>;

    /// Stores `state` as version `expected_version + 1` if the node is
    /// still at `expected_version`. Returns false if it is not.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend fails.
    fn compare_and_swap_node(
        &self,
        world: WorldId,
        node: NodeId,
        expected_version: u64,
        state: NodeState,
    ) -> StorageResult<bool>;

    /// Reads the state of several nodes. Nodes without a record are
    /// omitted.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend fails.
    fn node_states(&self, world: WorldId, nodes: &[NodeId]) -> StorageResult<HashMap<NodeId, NodeRecord>> {
        let mut out = HashMap::new();
        for &node in nodes {
            let record = self.node_state(world, node)?;
            if record.version > 0 {
                out.insert(node, record);
            }
        }
        Ok(out)
    }
}
