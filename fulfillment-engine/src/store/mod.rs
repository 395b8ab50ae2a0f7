//! Document store abstraction
//!
//! The engine's single persistence seam. Backends must provide per-document
//! atomicity for [`DocumentStore::atomic_update`]: all field ops in one call
//! land together or not at all, and no concurrent update interleaves within
//! one document. Cross-document transactions are deliberately absent; the
//! engine is designed around commutative field-level ops instead.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("document {0} already exists")]
    AlreadyExists(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Transient backend failure; the operation may be retried.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Path to a field inside a document, one map segment per element.
///
/// Segments are kept separate (not joined with a dot) because variant option
/// keys are free-form text.
pub type FieldPath = Vec<String>;

/// Build a [`FieldPath`] from literal segments.
pub fn field_path(segments: &[&str]) -> FieldPath {
    segments.iter().map(|s| s.to_string()).collect()
}

/// One field-level mutation inside an atomic update.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Overwrite the field with a value.
    Set { field: FieldPath, value: Value },
    /// Add `delta` to a numeric field, treating a missing field as 0.
    Increment { field: FieldPath, delta: i64 },
    /// Insert (or overwrite) one entry of a map-valued field.
    MapEntryInsert {
        field: FieldPath,
        key: String,
        value: Value,
    },
    /// Remove one entry of a map-valued field; missing entry is a no-op.
    MapEntryDelete { field: FieldPath, key: String },
}

impl FieldOp {
    pub fn set(segments: &[&str], value: Value) -> Self {
        Self::Set {
            field: field_path(segments),
            value,
        }
    }

    pub fn increment(segments: &[&str], delta: i64) -> Self {
        Self::Increment {
            field: field_path(segments),
            delta,
        }
    }

    pub fn map_insert(segments: &[&str], key: impl Into<String>, value: Value) -> Self {
        Self::MapEntryInsert {
            field: field_path(segments),
            key: key.into(),
            value,
        }
    }

    pub fn map_delete(segments: &[&str], key: impl Into<String>) -> Self {
        Self::MapEntryDelete {
            field: field_path(segments),
            key: key.into(),
        }
    }
}

/// Comparison operator for [`DocumentStore::query_by_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Le,
}

/// Result ordering on the queried field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Abstract document store (consumed collaborator contract).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by path (`collection/id`).
    async fn get_document(&self, path: &str) -> Result<Value, StoreError>;

    /// Create or fully replace one document.
    async fn put_document(&self, path: &str, doc: Value) -> Result<(), StoreError>;

    /// Apply all ops to one existing document atomically.
    async fn atomic_update(&self, path: &str, ops: Vec<FieldOp>) -> Result<(), StoreError>;

    /// Filter a collection on one field, ordered by that field.
    ///
    /// `cursor` is the `id` field of the last document of the previous page;
    /// results resume strictly after it.
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: FilterOp,
        value: Value,
        order: SortOrder,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Value>, StoreError>;
}
