//! In-memory document store backend
//!
//! Documents live in a DashMap keyed by `collection/id`. `atomic_update`
//! holds the map entry's exclusive guard for the whole batch, which gives
//! the per-document atomicity the trait requires: concurrent updates to the
//! same document serialize, updates to different documents do not contend.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::{DocumentStore, FieldOp, FieldPath, FilterOp, SortOrder, StoreError};

/// DashMap-backed store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (test convenience).
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Walk to the parent object of `path`, creating intermediate objects,
/// and return it together with the final segment.
fn resolve_parent<'a>(
    doc: &'a mut Value,
    path: &FieldPath,
) -> Result<(&'a mut Map<String, Value>, String), StoreError> {
    let (last, rest) = path
        .split_last()
        .ok_or_else(|| StoreError::Serialization("empty field path".to_string()))?;

    let mut current = doc;
    for seg in rest {
        let obj = current.as_object_mut().ok_or_else(|| {
            StoreError::Serialization(format!("segment {seg} is not an object"))
        })?;
        current = obj
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let parent = current.as_object_mut().ok_or_else(|| {
        StoreError::Serialization(format!("parent of {last} is not an object"))
    })?;
    Ok((parent, last.clone()))
}

fn apply_op(doc: &mut Value, op: &FieldOp) -> Result<(), StoreError> {
    match op {
        FieldOp::Set { field, value } => {
            let (parent, key) = resolve_parent(doc, field)?;
            parent.insert(key, value.clone());
        }
        FieldOp::Increment { field, delta } => {
            let (parent, key) = resolve_parent(doc, field)?;
            let current = match parent.get(&key) {
                None | Some(Value::Null) => 0,
                Some(v) => v.as_i64().ok_or_else(|| {
                    StoreError::Serialization(format!("field {key} is not an integer"))
                })?,
            };
            parent.insert(key, Value::from(current + delta));
        }
        FieldOp::MapEntryInsert { field, key, value } => {
            let (parent, map_key) = resolve_parent(doc, field)?;
            let map = parent
                .entry(map_key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            let map = map.as_object_mut().ok_or_else(|| {
                StoreError::Serialization(format!("field {map_key} is not a map"))
            })?;
            map.insert(key.clone(), value.clone());
        }
        FieldOp::MapEntryDelete { field, key } => {
            let (parent, map_key) = resolve_parent(doc, field)?;
            if let Some(map) = parent.get_mut(&map_key).and_then(Value::as_object_mut) {
                map.remove(key);
            }
        }
    }
    Ok(())
}

/// Total order over comparable JSON scalars; mixed types never match.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches(op: FilterOp, field_value: &Value, probe: &Value) -> bool {
    match compare(field_value, probe) {
        Some(ord) => match op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Le => ord != Ordering::Greater,
        },
        None => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &str) -> Result<Value, StoreError> {
        self.docs
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn put_document(&self, path: &str, doc: Value) -> Result<(), StoreError> {
        self.docs.insert(path.to_string(), doc);
        Ok(())
    }

    async fn atomic_update(&self, path: &str, ops: Vec<FieldOp>) -> Result<(), StoreError> {
        let mut entry = self
            .docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        // Apply to a scratch copy so a failing op leaves the document
        // untouched (all ops land together or not at all).
        let mut scratch = entry.value().clone();
        for op in &ops {
            apply_op(&mut scratch, op)?;
        }
        *entry.value_mut() = scratch;
        Ok(())
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: FilterOp,
        value: Value,
        order: SortOrder,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let prefix = format!("{collection}/");
        let mut hits: Vec<Value> = self
            .docs
            .iter()
            .filter(|entry| {
                entry.key().starts_with(&prefix) && !entry.key()[prefix.len()..].contains('/')
            })
            .filter(|entry| {
                entry
                    .value()
                    .get(field)
                    .is_some_and(|v| matches(op, v, &value))
            })
            .map(|entry| entry.value().clone())
            .collect();

        hits.sort_by(|a, b| {
            let by_field = compare(
                a.get(field).unwrap_or(&Value::Null),
                b.get(field).unwrap_or(&Value::Null),
            )
            .unwrap_or(Ordering::Equal);
            let by_field = match order {
                SortOrder::Asc => by_field,
                SortOrder::Desc => by_field.reverse(),
            };
            // Tie-break on id for a stable page order.
            by_field.then_with(|| {
                let ida = a.get("id").and_then(Value::as_str).unwrap_or_default();
                let idb = b.get("id").and_then(Value::as_str).unwrap_or_default();
                ida.cmp(idb)
            })
        });

        let start = match cursor {
            Some(cursor_id) => {
                match hits
                    .iter()
                    .position(|doc| doc.get("id").and_then(Value::as_str) == Some(cursor_id))
                {
                    Some(pos) => pos + 1,
                    // The cursor document no longer matches the filter;
                    // restarting from the top would re-serve earlier pages.
                    None => return Ok(Vec::new()),
                }
            }
            None => 0,
        };

        Ok(hits.into_iter().skip(start).take(limit).collect())
    }
}
