//! Order Lifecycle & Inventory Reconciliation Engine
//!
//! Coordination core for a multi-tenant store-operations backend: a closed
//! state machine over order fulfillment, coupled with compensating stock
//! adjustments that stay exactly consistent with it (deduct once on
//! assembly, restore exactly once on reset/cancel, never double under
//! concurrent access).
//!
//! The presentation layer is an external collaborator: it calls
//! [`LifecycleEngine::transition`], [`LifecycleEngine::add_comment`] and
//! [`LifecycleEngine::get_order`], and owns all request shaping and
//! user-facing text.

pub mod couriers;
pub mod identity;
pub mod inventory;
pub mod orders;
pub mod store;
pub mod variants;

// Re-exports
pub use orders::lifecycle::LifecycleEngine;
pub use store::{DocumentStore, memory::MemoryStore};
