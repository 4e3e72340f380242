//! # Inventory Ledger
//!
//! Harvested items leave the world through an [`InventoryLedger`]. The
//! ledger itself belongs to another system; this crate only defines the
//! seam and an in-memory implementation for tests and local runs.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use veldt_shared::CharacterId;

use crate::error::{EconomyError, EconomyResult};
use crate::harvest::ItemGrant;

/// A character's holding of one item after a credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemStack {
    /// Item key.
    pub item: String,
    /// Total amount held.
    pub quantity: u64,
}

/// Credits items to characters.
pub trait InventoryLedger: Send + Sync {
    /// Credits every grant to `character`.
    ///
    /// All-or-nothing: on error no grant has been applied.
    ///
    /// # Errors
    ///
    /// Returns an `EconomyError` if the ledger rejects or cannot apply the
    /// credit.
    fn credit(&self, character: CharacterId, grants: &[ItemGrant]) -> EconomyResult<Vec<ItemStack>>;

    /// Current holding of one item.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::LedgerUnavailable` if the ledger cannot be read.
    fn stack(&self, character: CharacterId, item: &str) -> EconomyResult<ItemStack>;
}

/// In-memory ledger with an optional per-item cap.
#[derive(Debug)]
pub struct MemoryLedger {
    holdings: RwLock<HashMap<CharacterId, HashMap<String, u64>>>,
    max_stack: u64,
}

impl MemoryLedger {
    /// Creates an uncapped ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_stack(u64::MAX)
    }

    /// Creates a ledger that refuses to hold more than `max_stack` of any
    /// item per character.
    #[must_use]
    pub fn with_max_stack(max_stack: u64) -> Self {
        Self {
            holdings: RwLock::new(HashMap::new()),
            max_stack,
        }
    }

    /// Sum of every item held by `character`.
    #[must_use]
    pub fn total_items(&self, character: CharacterId) -> u64 {
        self.holdings
            .read()
            .get(&character)
            .map_or(0, |items| items.values().fold(0, |total, &n| total.saturating_add(n)))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryLedger for MemoryLedger {
    fn credit(&self, character: CharacterId, grants: &[ItemGrant]) -> EconomyResult<Vec<ItemStack>> {
        let mut holdings = self.holdings.write();
        let items = holdings.entry(character).or_default();

        // Validate the whole batch before touching anything.
        let mut pending: HashMap<&str, u64> = HashMap::new();
        for grant in grants {
            let held = items.get(&grant.item).copied().unwrap_or(0);
            let queued = pending.entry(grant.item.as_str()).or_insert(held);
            let next = queued
                .checked_add(u64::from(grant.quantity))
                .filter(|&next| next <= self.max_stack)
                .ok_or_else(|| EconomyError::InventoryFull {
                    character,
                    item: grant.item.clone(),
                    amount: u64::from(grant.quantity),
                })?;
            *queued = next;
        }

        let mut stacks = Vec::with_capacity(grants.len());
        for grant in grants {
            let held = items.entry(grant.item.clone()).or_insert(0);
            *held = held.saturating_add(u64::from(grant.quantity));
            stacks.push(ItemStack {
                item: grant.item.clone(),
                quantity: *held,
            });
        }
        Ok(stacks)
    }

    fn stack(&self, character: CharacterId, item: &str) -> EconomyResult<ItemStack> {
        let quantity = self
            .holdings
            .read()
            .get(&character)
            .and_then(|items| items.get(item).copied())
            .unwrap_or(0);
        Ok(ItemStack {
            item: item.to_string(),
            quantity,
        })
    }
}
