//! Order records and lifecycle
//!
//! `records` owns order-document persistence, `transitions` defines the
//! closed state machine, `lifecycle` coordinates the two with the
//! inventory store.

pub mod lifecycle;
pub mod records;
pub mod transitions;

pub use lifecycle::LifecycleEngine;
pub use records::OrderRecordStore;
