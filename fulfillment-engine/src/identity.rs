//! Identity/role provider contract
//!
//! The engine never reads ambient "current user" state: every operation
//! takes an explicit actor id and resolves it here. That keeps the
//! authorization guard and audit trail independently testable.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::error::{EngineError, EngineResult};
use shared::models::role::StaffRole;
use shared::models::store_config::StoreConfig;

/// Resolved actor identity plus the store flags the guard needs.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: String,
    pub role: StaffRole,
    /// Store's `can_workers_reset` flag at resolution time.
    pub can_workers_reset: bool,
}

/// Consumed collaborator: actor id -> role + store flags.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn actor_context(&self, actor_id: &str) -> EngineResult<ActorContext>;
}

/// In-memory provider for tests and single-store deployments.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    actors: DashMap<String, StaffRole>,
    config: StoreConfig,
}

impl StaticIdentityProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            actors: DashMap::new(),
            config,
        }
    }

    pub fn insert(&self, actor_id: impl Into<String>, role: StaffRole) {
        self.actors.insert(actor_id.into(), role);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn actor_context(&self, actor_id: &str) -> EngineResult<ActorContext> {
        let role = self
            .actors
            .get(actor_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| EngineError::Unauthorized {
                actor_id: actor_id.to_string(),
                action: "resolve identity".to_string(),
            })?;
        Ok(ActorContext {
            actor_id: actor_id.to_string(),
            role,
            can_workers_reset: self.config.can_workers_reset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_actor_resolves() {
        let provider = StaticIdentityProvider::new(StoreConfig {
            can_workers_reset: true,
            ..StoreConfig::default()
        });
        provider.insert("u-1", StaffRole::Worker);

        let ctx = provider.actor_context("u-1").await.unwrap();
        assert_eq!(ctx.role, StaffRole::Worker);
        assert!(ctx.can_workers_reset);
    }

    #[tokio::test]
    async fn test_unknown_actor_is_unauthorized() {
        let provider = StaticIdentityProvider::new(StoreConfig::default());
        let result = provider.actor_context("ghost").await;
        assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    }
}
