//! # World Error Types
//!
//! Errors surfaced by the chunk store, the repositories and the node
//! lifecycle.
//!
//! Movement rejections are not errors; see [`crate::movement::MoveVerdict`].

use thiserror::Error;
use veldt_economy::EconomyError;
use veldt_shared::{CharacterId, NodeId};

/// Failures of the persistence layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// An I/O operation failed. Usually transient.
    #[error("storage I/O failed during {op} on {path}: {message}")]
    Io {
        /// What was being done.
        op: &'static str,
        /// Path involved.
        path: String,
        /// OS error text.
        message: String,
    },

    /// A stored record failed validation.
    #[error("corrupt record {what}: {reason}")]
    Corrupt {
        /// Record description.
        what: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The backend is temporarily not serving requests.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Builds an [`StorageError::Io`] from an `std::io::Error`.
    #[must_use]
    pub fn io(op: &'static str, path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Builds a [`StorageError::Corrupt`].
    #[must_use]
    pub fn corrupt(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if retrying may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Unavailable(_))
    }
}

/// Result type for repository operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in world operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The caller passed a malformed or out-of-range argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No world with this id.
    #[error("world not found: {0}")]
    WorldNotFound(String),

    /// No position is known for this character.
    #[error("character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// No resource node with this id exists.
    #[error("resource node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node is depleted, or another harvest won the race.
    #[error("resource node unavailable: {0}")]
    NodeUnavailable(NodeId),

    /// Persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Rolling or crediting the harvest failed.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation ran past its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// An internal invariant broke (e.g. a generator panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorldError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Economy(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for cancellation and deadline errors.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        let io = StorageError::io(
            "read",
            std::path::Path::new("/tmp/x"),
            &std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert!(WorldError::from(io).is_retryable());
        assert!(!WorldError::from(StorageError::corrupt("chunk", "bad crc")).is_retryable());
        assert!(WorldError::from(EconomyError::LedgerUnavailable("down".into())).is_retryable());
        assert!(!WorldError::NodeUnavailable(NodeId::from_raw(1).unwrap()).is_retryable());
        assert!(WorldError::Cancelled.is_abort());
    }
}
