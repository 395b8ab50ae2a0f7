//! Typed failure surface of the fulfillment engine
//!
//! Every engine operation fails per-request with one of these variants;
//! nothing here is fatal to the process. The presentation layer owns the
//! user-facing wording, so messages stay operator-oriented.

use crate::models::order::OrderStatus;
use thiserror::Error;

/// Errors surfaced by lifecycle and inventory operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested transition is not defined for the order's current status.
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The actor's role does not permit this operation.
    #[error("actor {actor_id} is not authorized to {action}")]
    Unauthorized { actor_id: String, action: String },

    /// No order document exists for the given id.
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// No product document exists for the given id.
    #[error("product {0} not found")]
    ProductNotFound(String),

    /// The inventory backend failed transiently; safe to retry.
    #[error("inventory store unavailable: {0}")]
    InventoryUnavailable(String),

    /// Some line items have a confirmed inventory effect, some do not.
    /// Order status is left unchanged; retrying the same transition is safe
    /// because reserve/release are idempotent per order.
    #[error("inventory effect incomplete: {completed} of {total} products done")]
    PartialInventoryFailure { completed: usize, total: usize },

    /// The order changed underfoot; reload and retry against fresh state.
    #[error("order {0} was modified concurrently")]
    ConcurrentModification(String),

    /// Unclassified backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InventoryUnavailable(_)
                | Self::PartialInventoryFailure { .. }
                | Self::ConcurrentModification(_)
        )
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
