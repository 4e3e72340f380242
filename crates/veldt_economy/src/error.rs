//! # Economy Error Types
//!
//! All errors that can occur while rolling yields or crediting items.

use thiserror::Error;
use veldt_shared::{CharacterId, NodeTypeId};

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// A node references a type the catalog does not know.
    #[error("unknown node type: {0}")]
    UnknownNodeType(NodeTypeId),

    /// The character's inventory cannot hold the credited amount.
    #[error("inventory full: character {character} cannot hold {amount} more {item}")]
    InventoryFull {
        /// Receiving character.
        character: CharacterId,
        /// Item key.
        item: String,
        /// Amount that did not fit.
        amount: u64,
    },

    /// The ledger refused the credit for a business reason.
    #[error("credit rejected: {reason}")]
    CreditRejected {
        /// Reason given by the ledger.
        reason: String,
    },

    /// The ledger could not be reached. Safe to retry.
    #[error("inventory ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EconomyError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
