//! # Resource-Node Catalog
//!
//! Static reference data describing every kind of harvestable node: where
//! it may spawn, how rare it is, what it yields and how long it takes to
//! come back.
//!
//! The catalog is loaded once at startup, either the built-in table or a
//! TOML file of the form:
//!
//! ```toml
//! [[node_type]]
//! id = 1
//! key = "oak_tree"
//! name = "Oak Tree"
//! allowed_terrain = ["grass", "dirt"]
//! rarity = "common"
//! harvest_time_ms = 3000
//! respawn_time_ms = 300000
//! primary_item = "wood"
//! primary_yield = { min = 2, max = 4 }
//! secondary_drops = [{ item = "acorn", probability_bp = 1500, min = 1, max = 2 }]
//! visual = { color = "#4f7a28", icon = "tree_oak", footprint = 1 }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::NodeTypeId;
use crate::rarity::Rarity;
use crate::terrain::TerrainType;

/// Errors raised while loading or validating a catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The TOML text could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(String),
    /// The catalog has no entries.
    #[error("catalog defines no node types")]
    Empty,
    /// Type id 0 is reserved.
    #[error("node type {key:?} uses reserved id 0")]
    ReservedId {
        /// Offending type key.
        key: String,
    },
    /// Two entries share an id.
    #[error("duplicate node type id {0}")]
    DuplicateId(NodeTypeId),
    /// Two entries share a key.
    #[error("duplicate node type key {0:?}")]
    DuplicateKey(String),
    /// An entry may not spawn anywhere.
    #[error("node type {key:?} allows no terrain")]
    NoTerrain {
        /// Offending type key.
        key: String,
    },
    /// A yield or drop range is empty or inverted.
    #[error("node type {key:?} has invalid amount range {min}..={max}")]
    InvalidRange {
        /// Offending type key.
        key: String,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// A secondary drop probability exceeds 100%.
    #[error("node type {key:?} has drop probability {probability_bp} bp (max 10000)")]
    InvalidProbability {
        /// Offending type key.
        key: String,
        /// Offending probability.
        probability_bp: u32,
    },
}

/// Inclusive amount range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldRange {
    /// Smallest amount.
    pub min: u32,
    /// Largest amount.
    pub max: u32,
}

impl YieldRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    const fn is_valid(self) -> bool {
        self.min >= 1 && self.min <= self.max
    }
}

/// An extra item a node may drop alongside its primary item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryDrop {
    /// Item key.
    pub item: String,
    /// Chance to drop, in basis points (10000 = always).
    pub probability_bp: u32,
    /// Smallest amount when it drops.
    pub min: u32,
    /// Largest amount when it drops.
    pub max: u32,
}

/// Client-side presentation hints. The server never interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualHints {
    /// Hex colour, `#rrggbb`.
    pub color: String,
    /// Icon or sprite key.
    pub icon: String,
    /// Footprint in tiles.
    #[serde(default = "default_footprint")]
    pub footprint: u8,
}

const fn default_footprint() -> u8 {
    1
}

impl Default for VisualHints {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            icon: "unknown".to_string(),
            footprint: 1,
        }
    }
}

/// One kind of harvestable node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNodeType {
    /// Stable numeric id, stored in every placed node.
    pub id: NodeTypeId,
    /// Machine-readable key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Terrain on which this type may spawn.
    pub allowed_terrain: Vec<TerrainType>,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Presentation hints.
    #[serde(default)]
    pub visual: VisualHints,
    /// Advertised harvest duration. Metadata only.
    pub harvest_time_ms: u64,
    /// Time until a depleted node is available again.
    pub respawn_time_ms: u64,
    /// Item key granted on every harvest.
    pub primary_item: String,
    /// Amount range of the primary item before scaling.
    pub primary_yield: YieldRange,
    /// Chance-based extra items.
    #[serde(default)]
    pub secondary_drops: Vec<SecondaryDrop>,
}

impl ResourceNodeType {
    /// Returns true if this type may spawn on `terrain`.
    #[inline]
    #[must_use]
    pub fn allows(&self, terrain: TerrainType) -> bool {
        self.allowed_terrain.contains(&terrain)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "node_type", default)]
    node_types: Vec<ResourceNodeType>,
}

/// Validated, indexed set of node types.
#[derive(Clone, Debug)]
pub struct ResourceCatalog {
    types: Vec<ResourceNodeType>,
    by_id: HashMap<NodeTypeId, usize>,
    by_terrain: [Vec<usize>; 5],
}

impl ResourceCatalog {
    /// Builds a catalog from a list of types.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if ids or keys collide, an entry allows no
    /// terrain, or a range/probability is invalid.
    pub fn from_types(types: Vec<ResourceNodeType>) -> Result<Self, CatalogError> {
        if types.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(types.len());
        let mut keys = HashSet::with_capacity(types.len());
        let mut by_terrain: [Vec<usize>; 5] = Default::default();

        for (index, ty) in types.iter().enumerate() {
            validate_type(ty)?;
            if by_id.insert(ty.id, index).is_some() {
                return Err(CatalogError::DuplicateId(ty.id));
            }
            if !keys.insert(ty.key.as_str()) {
                return Err(CatalogError::DuplicateKey(ty.key.clone()));
            }
            for terrain in TerrainType::ALL {
                if ty.allows(terrain) {
                    by_terrain[terrain as usize].push(index);
                }
            }
        }

        Ok(Self {
            types,
            by_id,
            by_terrain,
        })
    }

    /// Parses and validates a TOML catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed TOML, otherwise the
    /// validation errors of [`Self::from_types`].
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_types(file.node_types)
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let types = builtin_types();
        let mut by_id = HashMap::with_capacity(types.len());
        let mut by_terrain: [Vec<usize>; 5] = Default::default();
        for (index, ty) in types.iter().enumerate() {
            by_id.insert(ty.id, index);
            for terrain in TerrainType::ALL {
                if ty.allows(terrain) {
                    by_terrain[terrain as usize].push(index);
                }
            }
        }
        Self {
            types,
            by_id,
            by_terrain,
        }
    }

    /// Looks up a type by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeTypeId) -> Option<&ResourceNodeType> {
        self.by_id.get(&id).map(|&i| &self.types[i])
    }

    /// All types in definition order.
    #[inline]
    #[must_use]
    pub fn types(&self) -> &[ResourceNodeType] {
        &self.types
    }

    /// Types allowed on `terrain`, in definition order.
    pub fn types_for(&self, terrain: TerrainType) -> impl Iterator<Item = &ResourceNodeType> + '_ {
        self.by_terrain[terrain as usize]
            .iter()
            .map(move |&i| &self.types[i])
    }

    /// Number of types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the catalog is empty. A validated catalog never is.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_type(ty: &ResourceNodeType) -> Result<(), CatalogError> {
    if ty.id == 0 {
        return Err(CatalogError::ReservedId { key: ty.key.clone() });
    }
    if ty.allowed_terrain.is_empty() {
        return Err(CatalogError::NoTerrain { key: ty.key.clone() });
    }
    if !ty.primary_yield.is_valid() {
        return Err(CatalogError::InvalidRange {
            key: ty.key.clone(),
            min: ty.primary_yield.min,
            max: ty.primary_yield.max,
        });
    }
    for drop in &ty.secondary_drops {
        if drop.probability_bp > 10_000 {
            return Err(CatalogError::InvalidProbability {
                key: ty.key.clone(),
                probability_bp: drop.probability_bp,
            });
        }
        if !YieldRange::new(drop.min, drop.max).is_valid() {
            return Err(CatalogError::InvalidRange {
                key: ty.key.clone(),
                min: drop.min,
                max: drop.max,
            });
        }
    }
    Ok(())
}

/// Compact row used to spell out the built-in table.
struct Row {
    id: NodeTypeId,
    key: &'static str,
    name: &'static str,
    terrain: &'static [TerrainType],
    rarity: Rarity,
    color: &'static str,
    harvest_s: u64,
    respawn_s: u64,
    primary: (&'static str, u32, u32),
    secondary: &'static [(&'static str, u32, u32, u32)],
}

impl Row {
    fn build(self) -> ResourceNodeType {
        ResourceNodeType {
            id: self.id,
            key: self.key.to_string(),
            name: self.name.to_string(),
            allowed_terrain: self.terrain.to_vec(),
            rarity: self.rarity,
            visual: VisualHints {
                color: self.color.to_string(),
                icon: self.key.to_string(),
                footprint: 1,
            },
            harvest_time_ms: self.harvest_s * 1000,
            respawn_time_ms: self.respawn_s * 1000,
            primary_item: self.primary.0.to_string(),
            primary_yield: YieldRange::new(self.primary.1, self.primary.2),
            secondary_drops: self
                .secondary
                .iter()
                .map(|&(item, probability_bp, min, max)| SecondaryDrop {
                    item: item.to_string(),
                    probability_bp,
                    min,
                    max,
                })
                .collect(),
        }
    }
}

fn builtin_types() -> Vec<ResourceNodeType> {
    use TerrainType::{Dirt, Grass, Sand, Stone, Water};

    let rows = [
        Row {
            id: 1,
            key: "oak_tree",
            name: "Oak Tree",
            terrain: &[Grass, Dirt],
            rarity: Rarity::Common,
            color: "#4f7a28",
            harvest_s: 3,
            respawn_s: 300,
            primary: ("wood", 2, 4),
            secondary: &[("acorn", 1500, 1, 2)],
        },
        Row {
            id: 2,
            key: "pine_tree",
            name: "Pine Tree",
            terrain: &[Grass, Dirt],
            rarity: Rarity::Common,
            color: "#2e5e3a",
            harvest_s: 3,
            respawn_s: 360,
            primary: ("wood", 3, 5),
            secondary: &[("resin", 1000, 1, 1)],
        },
        Row {
            id: 3,
            key: "berry_bush",
            name: "Berry Bush",
            terrain: &[Grass],
            rarity: Rarity::Uncommon,
            color: "#8e2b5c",
            harvest_s: 1,
            respawn_s: 180,
            primary: ("berries", 2, 6),
            secondary: &[("seeds", 2500, 1, 3)],
        },
        Row {
            id: 4,
            key: "boulder",
            name: "Boulder",
            terrain: &[Stone, Dirt],
            rarity: Rarity::Common,
            color: "#8a8a8a",
            harvest_s: 4,
            respawn_s: 600,
            primary: ("stone", 2, 5),
            secondary: &[("flint", 2000, 1, 2)],
        },
        Row {
            id: 5,
            key: "copper_vein",
            name: "Copper Vein",
            terrain: &[Stone],
            rarity: Rarity::Uncommon,
            color: "#b87333",
            harvest_s: 5,
            respawn_s: 900,
            primary: ("copper_ore", 1, 3),
            secondary: &[("stone", 5000, 1, 2)],
        },
        Row {
            id: 6,
            key: "iron_vein",
            name: "Iron Vein",
            terrain: &[Stone],
            rarity: Rarity::Rare,
            color: "#6e6259",
            harvest_s: 6,
            respawn_s: 1200,
            primary: ("iron_ore", 1, 3),
            secondary: &[("stone", 5000, 1, 2), ("coal", 1500, 1, 2)],
        },
        Row {
            id: 7,
            key: "gold_vein",
            name: "Gold Vein",
            terrain: &[Stone],
            rarity: Rarity::Epic,
            color: "#d4af37",
            harvest_s: 8,
            respawn_s: 2400,
            primary: ("gold_ore", 1, 2),
            secondary: &[("gemstone", 500, 1, 1)],
        },
        Row {
            id: 8,
            key: "crystal_cluster",
            name: "Crystal Cluster",
            terrain: &[Stone],
            rarity: Rarity::Legendary,
            color: "#9fd8f0",
            harvest_s: 10,
            respawn_s: 3600,
            primary: ("crystal", 1, 2),
            secondary: &[("crystal_dust", 3000, 1, 3)],
        },
        Row {
            id: 9,
            key: "reeds",
            name: "Reeds",
            terrain: &[Sand, Water],
            rarity: Rarity::Common,
            color: "#a8b45c",
            harvest_s: 1,
            respawn_s: 120,
            primary: ("fiber", 2, 4),
            secondary: &[],
        },
        Row {
            id: 10,
            key: "driftwood",
            name: "Driftwood",
            terrain: &[Sand],
            rarity: Rarity::Uncommon,
            color: "#b49b7a",
            harvest_s: 2,
            respawn_s: 240,
            primary: ("wood", 1, 3),
            secondary: &[("shell", 1200, 1, 1)],
        },
        Row {
            id: 11,
            key: "clay_deposit",
            name: "Clay Deposit",
            terrain: &[Dirt, Sand],
            rarity: Rarity::Uncommon,
            color: "#b5651d",
            harvest_s: 3,
            respawn_s: 480,
            primary: ("clay", 2, 4),
            secondary: &[],
        },
        Row {
            id: 12,
            key: "fish_school",
            name: "School of Fish",
            terrain: &[Water],
            rarity: Rarity::Common,
            color: "#5a8fb8",
            harvest_s: 4,
            respawn_s: 300,
            primary: ("raw_fish", 1, 3),
            secondary: &[("pearl", 100, 1, 1)],
        },
        Row {
            id: 13,
            key: "moonpetal",
            name: "Moonpetal",
            terrain: &[Grass],
            rarity: Rarity::Mythic,
            color: "#e6e0ff",
            harvest_s: 2,
            respawn_s: 7200,
            primary: ("moonpetal", 1, 1),
            secondary: &[],
        },
    ];

    rows.into_iter().map(Row::build).collect()
}
