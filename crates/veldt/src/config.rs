//! # Configuration
//!
//! One TOML file, read once at startup. Every section and every field has a
//! default, so an empty file is a valid configuration.
//!
//! ```toml
//! [world]
//! name = "Veldt"
//! seed = 12345
//!
//! [terrain]
//! water = -0.25
//! sand = -0.15
//! grass = 0.30
//! dirt = 0.55
//!
//! [spawner]
//! density_bp = 150
//! exclusion_radius = 1
//! max_nodes_per_chunk = 24
//!
//! [store]
//! max_chunks_per_request = 1024
//! parallel_fanout = true
//!
//! [movement]
//! min_move_interval_ms = 100
//! bounds = { min_x = -1048576, max_x = 1048576, min_y = -1048576, max_y = 1048576 }
//!
//! [storage]
//! backend = "file"
//! path = "/var/lib/veldt"
//!
//! [catalog]
//! path = "node_types.toml"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veldt_procedural::{GeneratorConfig, NoiseSettings, SpawnerConfig, TerrainThresholds, WorldSeed};
use veldt_shared::{CatalogError, Clock, ResourceCatalog, DEFAULT_WORLD_NAME};
use veldt_world::{
    ChunkRepository, FileRepository, MemoryRepository, MemoryWorldDirectory, MovementConfig,
    StorageError, StoreConfig,
};

/// Seed of the default world when none is configured.
pub const DEFAULT_WORLD_SEED: i64 = 12345;

/// Errors raised while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// OS error text.
        message: String,
    },

    /// The TOML is malformed or has wrong types.
    #[error("config parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The configured catalog is invalid.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The configured storage could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// `[world]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    /// Display name of the default world.
    pub name: String,
    /// Seed of the default world.
    pub seed: i64,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORLD_NAME.to_string(),
            seed: DEFAULT_WORLD_SEED,
        }
    }
}

/// Storage backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; lost on exit.
    #[default]
    Memory,
    /// Directory tree, shareable between processes.
    File,
}

/// `[storage]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend kind.
    pub backend: StorageBackend,
    /// Root directory, required by the file backend.
    pub path: Option<PathBuf>,
}

/// `[catalog]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// TOML catalog replacing the built-in one. Relative paths resolve
    /// against the working directory.
    pub path: Option<PathBuf>,
}

/// Complete service configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VeldtConfig {
    /// Default world.
    pub world: WorldSection,
    /// Terrain bands.
    pub terrain: TerrainThresholds,
    /// Fractal noise shape.
    pub noise: NoiseSettings,
    /// Node placement.
    pub spawner: SpawnerConfig,
    /// Request limits.
    pub store: StoreConfig,
    /// Movement rules.
    pub movement: MovementConfig,
    /// Persistence.
    pub storage: StorageSection,
    /// Resource node catalog.
    pub catalog: CatalogSection,
}

impl VeldtConfig {
    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates config text.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed TOML, `ConfigError::Invalid` if
    /// [`Self::validate`] fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.world.name.trim().is_empty() {
            return invalid("world.name must not be empty");
        }
        if !self.terrain.is_ascending() {
            return invalid("terrain thresholds must be strictly ascending water < sand < grass < dirt");
        }
        if !self.noise.is_valid() {
            return invalid("noise needs 1 to 16 octaves and finite, positive persistence, lacunarity and feature_size");
        }
        if self.spawner.density_bp > 10_000 {
            return invalid("spawner.density_bp must be at most 10000");
        }
        if self.store.max_chunks_per_request == 0 {
            return invalid("store.max_chunks_per_request must be positive");
        }
        if !self.movement.bounds.is_ordered() {
            return invalid("movement.bounds minimums must not exceed maximums");
        }
        if !self.movement.bounds.fits_node_ids() {
            return invalid("movement.bounds exceed the addressable world");
        }
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return invalid("storage.path is required by the file backend");
        }
        Ok(())
    }

    /// Seed of the default world.
    #[must_use]
    pub const fn world_seed(&self) -> WorldSeed {
        WorldSeed::from_i64(self.world.seed)
    }

    /// Generation settings.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            thresholds: self.terrain,
            noise: self.noise,
            spawner: self.spawner,
        }
    }

    /// Loads the configured catalog, or the built-in one.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the catalog file cannot be read,
    /// `ConfigError::Catalog` if it is invalid.
    pub fn load_catalog(&self) -> Result<ResourceCatalog, ConfigError> {
        let Some(path) = &self.catalog.path else {
            return Ok(ResourceCatalog::builtin());
        };
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = ResourceCatalog::from_toml(&text)?;
        tracing::info!("Loaded {} resource node types from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Opens the configured repository.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` if the file backend has no path,
    /// `ConfigError::Storage` if the directory cannot be prepared.
    pub fn open_repository(&self) -> Result<Arc<dyn ChunkRepository>, ConfigError> {
        match (self.storage.backend, &self.storage.path) {
            (StorageBackend::Memory, _) => Ok(Arc::new(MemoryRepository::new())),
            (StorageBackend::File, Some(path)) => Ok(Arc::new(FileRepository::open(path)?)),
            (StorageBackend::File, None) => Err(ConfigError::Invalid(
                "storage.path is required by the file backend".to_string(),
            )),
        }
    }

    /// World directory holding the configured default world.
    #[must_use]
    pub fn world_directory(&self, clock: Arc<dyn Clock>) -> MemoryWorldDirectory {
        MemoryWorldDirectory::new(self.world.name.clone(), self.world_seed(), clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = VeldtConfig::from_toml_str("").unwrap();
        assert_eq!(config, VeldtConfig::default());
        assert_eq!(config.world_seed(), WorldSeed::new(12345));
        assert_eq!(config.store.max_chunks_per_request, 1024);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = VeldtConfig::from_toml_str(include_str!("../../../config/veldt.toml")).unwrap();
        assert_eq!(config, VeldtConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = VeldtConfig::from_toml_str(
            r#"
            [world]
            seed = -7

            [spawner]
            density_bp = 400

            [storage]
            backend = "file"
            path = "/tmp/veldt"
            "#,
        )
        .unwrap();
        assert_eq!(config.world.name, DEFAULT_WORLD_NAME);
        assert_eq!(config.world_seed().as_i64(), -7);
        assert_eq!(config.spawner.density_bp, 400);
        assert_eq!(config.spawner.max_nodes_per_chunk, 24);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            "[terrain]\nwater = 0.5\nsand = 0.1",
            "[spawner]\ndensity_bp = 10001",
            "[store]\nmax_chunks_per_request = 0",
            "[movement]\nbounds = { min_x = 5, max_x = 4, min_y = 0, max_y = 0 }",
            "[movement]\nbounds = { min_x = 0, max_x = 9223372036854775807, min_y = 0, max_y = 0 }",
            "[storage]\nbackend = \"file\"",
            "[world]\nname = \"  \"",
            "[noise]\npersistence = nan",
            "[noise]\nlacunarity = inf",
            "[noise]\nfeature_size = -1.0",
            "[noise]\noctaves = 0",
            "[noise]\noctaves = 40",
        ];
        for text in cases {
            assert!(
                matches!(VeldtConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(matches!(
            VeldtConfig::from_toml_str("[rendering]\nfov = 90"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            VeldtConfig::load("/nonexistent/veldt.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
