//! # World Geometry Constants
//!
//! **CRITICAL:** these values are baked into every stored chunk.
//! Changing them invalidates all persisted worlds.

/// Chunk width/height in tiles.
pub const CHUNK_SIZE: usize = 32;

/// Chunk side length as a signed tile count (for coordinate math).
pub const CHUNK_SIZE_I64: i64 = CHUNK_SIZE as i64;

/// Total terrain cells per chunk.
pub const CELLS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Bits of each chunk axis that fit into a [`NodeId`](crate::NodeId).
pub const NODE_ID_AXIS_BITS: u32 = 26;

/// Largest chunk coordinate (absolute) whose nodes get identifiers.
pub const NODE_ID_AXIS_LIMIT: i32 = 1 << (NODE_ID_AXIS_BITS - 1);

/// Name given to the world created on first start.
pub const DEFAULT_WORLD_NAME: &str = "Veldt";
