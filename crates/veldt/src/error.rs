//! # Service Error Types
//!
//! What a transport layer sees. Every internal error folds into one of a
//! handful of variants, each with a stable [`ServiceError::code`].

use thiserror::Error;
use veldt_world::WorldError;

/// Errors returned by [`crate::WorldService`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or missing argument. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown world, character or resource node.
    #[error("not found: {0}")]
    NotFound(String),

    /// The node is depleted or was harvested concurrently.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The caller could not be identified.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller cancelled the request.
    #[error("cancelled")]
    Cancelled,

    /// The request ran past its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Infrastructure or invariant failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description.
        message: String,
        /// Whether the same request may succeed if retried.
        retryable: bool,
    },
}

impl ServiceError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns true if the same request may succeed if retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal { retryable: true, .. })
    }
}

impl From<WorldError> for ServiceError {
    fn from(err: WorldError) -> Self {
        let retryable = err.is_retryable();
        match err {
            WorldError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            WorldError::WorldNotFound(id) => Self::NotFound(format!("world {id}")),
            WorldError::CharacterNotFound(id) => Self::NotFound(format!("character {id}")),
            WorldError::NodeNotFound(id) => Self::NotFound(format!("resource node {id}")),
            WorldError::NodeUnavailable(id) => Self::Unavailable(format!("resource node {id}")),
            WorldError::Cancelled => Self::Cancelled,
            WorldError::DeadlineExceeded => Self::DeadlineExceeded,
            other @ (WorldError::Storage(_) | WorldError::Economy(_) | WorldError::Internal(_)) => {
                Self::Internal {
                    message: other.to_string(),
                    retryable,
                }
            }
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use veldt_economy::EconomyError;
    use veldt_shared::NodeId;
    use veldt_world::StorageError;

    #[test]
    fn test_world_error_mapping() {
        let node = NodeId::from_raw(5).unwrap();
        assert_eq!(ServiceError::from(WorldError::NodeNotFound(node)).code(), "not_found");
        assert_eq!(ServiceError::from(WorldError::NodeUnavailable(node)).code(), "unavailable");
        assert_eq!(ServiceError::from(WorldError::Cancelled), ServiceError::Cancelled);

        let down = ServiceError::from(WorldError::Storage(StorageError::Unavailable("db".into())));
        assert_eq!(down.code(), "internal");
        assert!(down.is_retryable());

        let full = ServiceError::from(WorldError::Economy(EconomyError::CreditRejected {
            reason: "frozen".into(),
        }));
        assert!(!full.is_retryable());
    }
}
