//! # VELDT World
//!
//! Persistent chunks, resource-node lifecycle and movement checks.
//!
//! ## Guarantees
//!
//! 1. **One chunk per coordinate**: a chunk is generated and stored at most
//!    once per `(world, coordinate)`, even with several servers sharing a
//!    repository
//! 2. **One harvest per respawn cycle**: concurrent harvests of a node
//!    produce exactly one winner
//! 3. **Nothing partial**: a cancelled or failed operation leaves no
//!    half-written chunk and no half-applied harvest
//!
//! ## Modules
//!
//! - `store`: get-or-create, range and radius access
//! - `repository`: in-memory and file-backed storage
//! - `codec`: binary chunk records
//! - `lifecycle`: harvesting and respawn
//! - `movement`: move validation
//! - `world`, `character`: lookup seams owned by other systems

#![deny(unsafe_code)]

pub mod character;
pub mod codec;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod movement;
pub mod repository;
pub mod stats;
pub mod store;
pub mod world;

pub use character::{CharacterDirectory, CharacterPosition, MemoryCharacterDirectory};
pub use context::{CancelHandle, OpContext};
pub use error::{StorageError, StorageResult, WorldError, WorldResult};
pub use lifecycle::{HarvestReport, ResourceNodeLifecycle};
pub use model::{Chunk, NodeRecord, NodeState, ResourceNode, World};
pub use movement::{MoveRejection, MoveVerdict, MovementConfig, MovementValidator, WorldBounds};
pub use repository::{ChunkRepository, FileRepository, InsertOutcome, MemoryRepository};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::{ChunkStore, StoreConfig};
pub use world::{MemoryWorldDirectory, WorldDirectory};
