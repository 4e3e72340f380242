//! # VELDT Shared
//!
//! Common types used by the generator, the world store and the service.
//!
//! ## Contents
//!
//! - `constants`: chunk geometry shared by every producer and consumer
//! - `ids`: strongly typed identifiers
//! - `time`: millisecond timestamps and injectable clocks
//! - `terrain`: the five terrain types and their movement properties
//! - `rarity`: rarity tiers and their spawn weights
//! - `catalog`: the static resource-node type catalog

#![deny(unsafe_code)]

pub mod catalog;
pub mod constants;
pub mod ids;
pub mod rarity;
pub mod terrain;
pub mod time;

pub use catalog::{
    CatalogError, ResourceCatalog, ResourceNodeType, SecondaryDrop, VisualHints, YieldRange,
};
pub use constants::{
    CELLS_PER_CHUNK, CHUNK_SIZE, CHUNK_SIZE_I64, DEFAULT_WORLD_NAME, NODE_ID_AXIS_LIMIT,
};
pub use ids::{CharacterId, IdParseError, NodeId, NodeTypeId, WorldId};
pub use rarity::Rarity;
pub use terrain::TerrainType;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
