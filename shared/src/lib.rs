//! Shared types for the store-operations engine
//!
//! Domain models and the typed error surface consumed by both the
//! fulfillment engine and the (external) presentation layer.

pub mod error;
pub mod models;

// Re-exports
pub use error::{EngineError, EngineResult};
pub use serde::{Deserialize, Serialize};
