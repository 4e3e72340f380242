//! # VELDT
//!
//! Deterministic, infinite 2D tile world: chunks generated from a seed,
//! stored once, served in ranges and radii, with harvestable resource
//! nodes and validated movement.
//!
//! ## Crates
//!
//! - `veldt_shared`: ids, constants, terrain, catalog, clocks
//! - `veldt_procedural`: noise, terrain classification, chunk generation
//! - `veldt_economy`: harvest yields and the inventory ledger seam
//! - `veldt_world`: storage, chunk store, node lifecycle, movement
//! - `veldt` (this crate): configuration, identity, [`WorldService`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use veldt::{Collaborators, StaticTokenResolver, VeldtConfig, WorldService};
//!
//! let config = VeldtConfig::load("config/veldt.toml")?;
//! let clock = Arc::new(veldt_shared::SystemClock);
//! let service = WorldService::from_config(&config, clock.clone(), Collaborators {
//!     worlds: Arc::new(config.world_directory(clock)),
//!     characters: Arc::new(veldt_world::MemoryCharacterDirectory::new()),
//!     identity: Arc::new(StaticTokenResolver::new()),
//!     ledger: Arc::new(veldt_economy::MemoryLedger::new()),
//! })?;
//! let chunk = service.get_chunk(&veldt_world::OpContext::background(), None, 10, 20)?;
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod identity;
pub mod service;

pub use config::{ConfigError, StorageBackend, VeldtConfig};
pub use error::{ServiceError, ServiceResult};
pub use identity::{IdentityResolver, RequestContext, StaticTokenResolver};
pub use service::{Collaborators, HarvestResponse, MoveResponse, WorldService};
