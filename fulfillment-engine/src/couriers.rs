//! Courier directory contract
//!
//! Read-only collaborator. The lifecycle engine only ever asks "is a
//! courier assigned"; contact data and per-governorate fees are looked up
//! for display by the presentation layer through [`CourierDirectory`].

use async_trait::async_trait;
use dashmap::DashMap;
use shared::error::EngineResult;
use shared::models::courier::Courier;

/// Consumed collaborator: courier id -> contact/fee data.
#[async_trait]
pub trait CourierDirectory: Send + Sync {
    /// `Ok(None)` when the id is unknown; lookups never gate transitions.
    async fn get_courier(&self, courier_id: &str) -> EngineResult<Option<Courier>>;
}

/// In-memory directory for tests and single-store deployments.
#[derive(Debug, Default)]
pub struct StaticCourierDirectory {
    couriers: DashMap<String, Courier>,
}

impl StaticCourierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, courier: Courier) {
        self.couriers.insert(courier.id.clone(), courier);
    }
}

#[async_trait]
impl CourierDirectory for StaticCourierDirectory {
    async fn get_courier(&self, courier_id: &str) -> EngineResult<Option<Courier>> {
        Ok(self.couriers.get(courier_id).map(|entry| entry.value().clone()))
    }
}
