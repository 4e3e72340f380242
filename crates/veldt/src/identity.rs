//! Caller identity.
//!
//! Authentication belongs to another system. The service only needs to
//! turn a request into a character id, through [`IdentityResolver`].

use std::collections::HashMap;

use parking_lot::RwLock;
use veldt_shared::CharacterId;

use crate::error::{ServiceError, ServiceResult};

/// Credentials attached to a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Bearer token, if the caller sent one.
    pub token: Option<String>,
}

impl RequestContext {
    /// A request carrying `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A request without credentials.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Resolves the character acting in a request.
pub trait IdentityResolver: Send + Sync {
    /// Returns the caller's character.
    ///
    /// # Errors
    ///
    /// `ServiceError::Unauthenticated` if the request cannot be attributed.
    fn resolve_character(&self, request: &RequestContext) -> ServiceResult<CharacterId>;
}

/// Fixed token table, for tests and local runs.
#[derive(Debug, Default)]
pub struct StaticTokenResolver {
    tokens: RwLock<HashMap<String, CharacterId>>,
}

impl StaticTokenResolver {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `token` act as `character`.
    pub fn grant(&self, token: impl Into<String>, character: CharacterId) {
        self.tokens.write().insert(token.into(), character);
    }

    /// Forgets `token`.
    pub fn revoke(&self, token: &str) {
        self.tokens.write().remove(token);
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve_character(&self, request: &RequestContext) -> ServiceResult<CharacterId> {
        let token = request.token.as_deref().ok_or(ServiceError::Unauthenticated)?;
        self.tokens
            .read()
            .get(token)
            .copied()
            .ok_or(ServiceError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_and_revoke() {
        let resolver = StaticTokenResolver::new();
        resolver.grant("abc", CharacterId(4));
        assert_eq!(
            resolver.resolve_character(&RequestContext::with_token("abc")),
            Ok(CharacterId(4))
        );
        assert_eq!(
            resolver.resolve_character(&RequestContext::anonymous()),
            Err(ServiceError::Unauthenticated)
        );
        resolver.revoke("abc");
        assert_eq!(
            resolver.resolve_character(&RequestContext::with_token("abc")),
            Err(ServiceError::Unauthenticated)
        );
    }
}
