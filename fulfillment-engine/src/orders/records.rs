//! Order Record Store
//!
//! Typed persistence for order documents. Writers hold the engine's
//! per-order token, so full-document writes are race-free within one
//! process; the revision check below also rejects stale writers from other
//! processes sharing the backing store.

use std::sync::Arc;

use shared::error::{EngineError, EngineResult};
use shared::models::order::{Order, OrderStatus};

use crate::store::{DocumentStore, FilterOp, SortOrder, StoreError};

const COLLECTION: &str = "orders";

fn order_path(order_id: &str) -> String {
    format!("{COLLECTION}/{order_id}")
}

fn map_err(order_id: &str, err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound(_) => EngineError::OrderNotFound(order_id.to_string()),
        other => EngineError::Storage(other.to_string()),
    }
}

/// Typed order persistence over the document store.
pub struct OrderRecordStore {
    store: Arc<dyn DocumentStore>,
}

impl OrderRecordStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, order_id: &str) -> EngineResult<Order> {
        let doc = self
            .store
            .get_document(&order_path(order_id))
            .await
            .map_err(|e| map_err(order_id, e))?;
        serde_json::from_value(doc).map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Intake path: persist a brand-new order, refusing to overwrite.
    pub async fn create(&self, order: &Order) -> EngineResult<()> {
        match self.store.get_document(&order_path(&order.id)).await {
            Ok(_) => {
                return Err(EngineError::Storage(format!(
                    "order {} already exists",
                    order.id
                )));
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(map_err(&order.id, e)),
        }
        let doc = serde_json::to_value(order).map_err(|e| EngineError::Storage(e.to_string()))?;
        self.store
            .put_document(&order_path(&order.id), doc)
            .await
            .map_err(|e| map_err(&order.id, e))
    }

    /// Persist a mutated order, bumping its revision.
    ///
    /// Fails with [`EngineError::ConcurrentModification`] when the stored
    /// revision no longer matches the one this order was loaded at: the
    /// caller lost a race and must reload before retrying.
    pub async fn put(&self, order: &mut Order) -> EngineResult<()> {
        let current = self.get(&order.id).await?;
        if current.revision != order.revision {
            return Err(EngineError::ConcurrentModification(order.id.clone()));
        }
        order.revision += 1;
        let doc = serde_json::to_value(&*order).map_err(|e| EngineError::Storage(e.to_string()))?;
        self.store
            .put_document(&order_path(&order.id), doc)
            .await
            .map_err(|e| map_err(&order.id, e))
    }

    /// Page through orders in a given status (order-list fragments).
    pub async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
        cursor: Option<&str>,
    ) -> EngineResult<Vec<Order>> {
        let probe = serde_json::to_value(status).map_err(|e| EngineError::Storage(e.to_string()))?;
        let docs = self
            .store
            .query_by_field(
                COLLECTION,
                "status",
                FilterOp::Eq,
                probe,
                SortOrder::Asc,
                limit,
                cursor,
            )
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(|e| EngineError::Storage(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::models::order::Financials;

    fn store() -> OrderRecordStore {
        OrderRecordStore::new(Arc::new(MemoryStore::new()))
    }

    fn order(id: &str) -> Order {
        Order::new(id, Vec::new(), Financials::default())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let records = store();
        records.create(&order("o-1")).await.unwrap();

        let loaded = records.get("o-1").await.unwrap();
        assert_eq!(loaded.id, "o-1");
        assert_eq!(loaded.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_refuses_overwrite() {
        let records = store();
        records.create(&order("o-1")).await.unwrap();
        assert!(records.create(&order("o-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let records = store();
        assert!(matches!(
            records.get("ghost").await,
            Err(EngineError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_bumps_revision() {
        let records = store();
        records.create(&order("o-1")).await.unwrap();

        let mut loaded = records.get("o-1").await.unwrap();
        loaded.status = OrderStatus::Confirmed;
        records.put(&mut loaded).await.unwrap();
        assert_eq!(loaded.revision, 1);

        let reloaded = records.get("o-1").await.unwrap();
        assert_eq!(reloaded.status, OrderStatus::Confirmed);
        assert_eq!(reloaded.revision, 1);
    }

    #[tokio::test]
    async fn test_stale_writer_is_rejected() {
        let records = store();
        records.create(&order("o-1")).await.unwrap();

        let mut copy_a = records.get("o-1").await.unwrap();
        let mut copy_b = records.get("o-1").await.unwrap();

        copy_a.status = OrderStatus::Confirmed;
        records.put(&mut copy_a).await.unwrap();

        copy_b.status = OrderStatus::Deleted;
        let result = records.put(&mut copy_b).await;
        assert!(matches!(
            result,
            Err(EngineError::ConcurrentModification(_))
        ));

        let stored = records.get("o-1").await.unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed, "loser must not win");
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let records = store();
        records.create(&order("o-1")).await.unwrap();
        records.create(&order("o-2")).await.unwrap();

        let mut confirmed = records.get("o-2").await.unwrap();
        confirmed.status = OrderStatus::Confirmed;
        records.put(&mut confirmed).await.unwrap();

        let pending = records
            .list_by_status(OrderStatus::Pending, 10, None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "o-1");

        let confirmed = records
            .list_by_status(OrderStatus::Confirmed, 10, None)
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "o-2");
    }
}
