//! # VELDT Procedural Generation
//!
//! Deterministic world generation for an infinite, reproducible tile world.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed and coordinate always give the same chunk
//! 2. **Chunked**: the world is generated in fixed 32x32 chunks
//! 3. **Order-free**: no chunk depends on another having been generated
//! 4. **Shareable**: generators are immutable and `Send + Sync`
//!
//! ## Core Components
//!
//! - `NoiseField`: seeded fractal simplex noise over world tiles
//! - `TerrainClassifier`: noise value to terrain type
//! - `ChunkGenerator`: terrain grid plus resource nodes for one chunk
//! - `ResourceNodeSpawner`: rarity-weighted node placement
//!
//! ## Example
//!
//! ```rust,ignore
//! use veldt_procedural::{ChunkCoord, ChunkGenerator, WorldSeed};
//!
//! let generator = ChunkGenerator::with_defaults(WorldSeed::new(12345));
//! let chunk = generator.generate(ChunkCoord::new(10, 20));
//! assert_eq!(chunk.cells.len(), 1024);
//! ```

#![deny(unsafe_code)]

pub mod chunk;
pub mod hash;
pub mod noise;
pub mod spawner;
pub mod terrain;

pub use chunk::{
    ChunkCoord, ChunkGenerator, GeneratedChunk, GeneratorConfig, NodePlacement, TerrainCell,
};
pub use noise::{NoiseField, NoiseSettings, SimplexNoise, WorldSeed};
pub use spawner::{ResourceNodeSpawner, SpawnerConfig};
pub use terrain::{TerrainClassifier, TerrainThresholds};
