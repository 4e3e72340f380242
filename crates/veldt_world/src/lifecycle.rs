//! # Resource Node Lifecycle
//!
//! Harvesting and respawn.
//!
//! A node moves `Available -> Depleted { respawn_ready_at } -> Available`.
//! The first transition is a compare-and-swap on the node's state version,
//! so of any number of concurrent harvests exactly one wins. The second
//! transition is never written: a depleted node whose respawn time has
//! passed simply reads as available.
//!
//! Items are credited only after the node has been depleted. If the credit
//! fails the node is put back with a fresh version, so a harvest either
//! both depletes and pays, or does neither.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use veldt_economy::{roll_seed, EconomyError, InventoryLedger, ItemGrant, ItemStack, YieldRoller};
use veldt_shared::{CharacterId, NodeId, Timestamp};

use crate::context::OpContext;
use crate::error::{WorldError, WorldResult};
use crate::model::{NodeState, ResourceNode, World};
use crate::store::ChunkStore;

/// Result of a successful harvest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// The node, now depleted.
    pub node: ResourceNode,
    /// Items produced, primary first.
    pub grants: Vec<ItemGrant>,
    /// The character's holdings of each granted item after the credit.
    pub stacks: Vec<ItemStack>,
    /// When the node becomes harvestable again.
    pub respawn_ready_at: Timestamp,
}

/// Harvests resource nodes.
pub struct ResourceNodeLifecycle {
    store: Arc<ChunkStore>,
    roller: YieldRoller,
    ledger: Arc<dyn InventoryLedger>,
}

impl ResourceNodeLifecycle {
    /// Creates a lifecycle over a store and an inventory ledger. Yields are
    /// rolled against the store's catalog.
    #[must_use]
    pub fn new(store: Arc<ChunkStore>, ledger: Arc<dyn InventoryLedger>) -> Self {
        let roller = YieldRoller::new(Arc::clone(store.catalog()));
        Self { store, roller, ledger }
    }

    /// Harvests a node for a character.
    ///
    /// # Errors
    ///
    /// - `WorldError::NodeNotFound` if the node does not exist
    /// - `WorldError::NodeUnavailable` if it is depleted or another harvest
    ///   won the race
    /// - `WorldError::Economy` if the yield cannot be rolled or credited;
    ///   the node is left available
    /// - `WorldError::Cancelled` / `DeadlineExceeded` if `ctx` expires
    ///   before the node is depleted
    /// - `WorldError::Storage` if the repository fails
    pub fn harvest(
        &self,
        ctx: &OpContext,
        world: &World,
        node_id: NodeId,
        character: CharacterId,
    ) -> WorldResult<HarvestReport> {
        ctx.check()?;
        let mut node = self.store.locate_node(world, node_id)?;
        let node_type = self
            .store
            .catalog()
            .get(node.type_id)
            .ok_or(EconomyError::UnknownNodeType(node.type_id))?;

        let repo = self.store.repository();
        let record = repo.node_state(world.id, node_id)?;
        let now = self.store.now();
        if !record.state.is_available_at(now) {
            return Err(WorldError::NodeUnavailable(node_id));
        }

        let seed = roll_seed(world.seed.value(), node_id.as_i64() as u64, record.version);
        let grants = self.roller.roll(node.type_id, node.scale_pct, seed)?;

        let respawn_ready_at = now.saturating_add(Duration::from_millis(node_type.respawn_time_ms));
        let depleted = NodeState::Depleted { respawn_ready_at };

        ctx.check()?;
        if !repo.compare_and_swap_node(world.id, node_id, record.version, depleted)? {
            tracing::debug!("Lost harvest race for node {}", node_id);
            return Err(WorldError::NodeUnavailable(node_id));
        }

        let stacks = match self.ledger.credit(character, &grants) {
            Ok(stacks) => stacks,
            Err(e) => {
                self.restore(world, node_id, record.version + 1, &e);
                return Err(e.into());
            }
        };

        tracing::info!(
            "Character {} harvested node {} ({}) for {} item kinds",
            character,
            node_id,
            node_type.key,
            grants.len()
        );

        node.state = depleted;
        Ok(HarvestReport {
            node,
            grants,
            stacks,
            respawn_ready_at,
        })
    }

    /// Puts a node back after a failed credit.
    fn restore(&self, world: &World, node_id: NodeId, depleted_version: u64, cause: &EconomyError) {
        let repo = self.store.repository();
        match repo.compare_and_swap_node(world.id, node_id, depleted_version, NodeState::Available) {
            Ok(true) => {
                tracing::warn!("Credit failed for node {}, node restored: {}", node_id, cause);
            }
            Ok(false) => {
                tracing::warn!(
                    "Credit failed for node {} and its state moved on, not restored: {}",
                    node_id,
                    cause
                );
            }
            Err(e) => {
                tracing::warn!("Credit failed for node {} and restore failed: {} ({})", node_id, cause, e);
            }
        }
    }
}
