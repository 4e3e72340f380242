//! # VELDT Economy
//!
//! What a harvested node is worth, and how it reaches a character.
//!
//! ## Modules
//!
//! - `harvest`: deterministic yield rolling (primary + secondary drops)
//! - `inventory`: the inventory-ledger seam and an in-memory ledger
//! - `error`: economy error types

#![deny(unsafe_code)]

pub mod error;
pub mod harvest;
pub mod inventory;

pub use error::{EconomyError, EconomyResult};
pub use harvest::{roll_seed, roll_yield, ItemGrant, YieldRoller};
pub use inventory::{InventoryLedger, ItemStack, MemoryLedger};
