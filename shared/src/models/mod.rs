//! Data models
//!
//! Shared between the fulfillment engine and the (external) presentation
//! layer. All documents serialize to JSON for the document store.

pub mod courier;
pub mod order;
pub mod product;
pub mod role;
pub mod store_config;

// Re-exports
pub use courier::*;
pub use order::*;
pub use product::*;
pub use role::*;
pub use store_config::*;
