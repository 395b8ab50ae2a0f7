//! Product Inventory Store
//!
//! Owns on-hand quantity per product and per variant, plus the ledger of
//! reservations (which order consumed how much). Every mutation is one
//! atomic field-level update on a single product document; the reservation
//! map is never rewritten wholesale, so concurrent orders touching the same
//! product commute without product-level locking.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use shared::error::{EngineError, EngineResult};
use shared::models::order::LineItem;
use shared::models::product::{Product, ReservationEntry, option_key};

use crate::store::{DocumentStore, FieldOp, FilterOp, SortOrder, StoreError, field_path};

const COLLECTION: &str = "products";

fn product_path(product_id: &str) -> String {
    format!("{COLLECTION}/{product_id}")
}

/// Result of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was deducted and the reservation entry recorded.
    Reserved,
    /// This order already holds a reservation on the product; nothing was
    /// changed. Retry absorption, not an error.
    AlreadyReserved,
}

/// Result of a release attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Stock was restored; carries the released quantity.
    Released(i64),
    /// No reservation existed for this order; nothing was changed.
    NothingToRelease,
}

/// Result of recording a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleOutcome {
    /// Sold counters were incremented and the order marked.
    Recorded,
    /// This order's sale was already counted; nothing was changed.
    AlreadyRecorded,
}

/// Typed inventory operations over the document store.
pub struct InventoryStore {
    store: Arc<dyn DocumentStore>,
}

impl InventoryStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn map_err(product_id: &str, err: StoreError) -> EngineError {
        match err {
            StoreError::NotFound(_) => EngineError::ProductNotFound(product_id.to_string()),
            StoreError::Unavailable(message) => EngineError::InventoryUnavailable(message),
            other => EngineError::Storage(other.to_string()),
        }
    }

    pub async fn get_product(&self, product_id: &str) -> EngineResult<Product> {
        let doc = self
            .store
            .get_document(&product_path(product_id))
            .await
            .map_err(|e| Self::map_err(product_id, e))?;
        serde_json::from_value(doc).map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Persist a full product document. Product intake is an external
    /// collaborator; this is its seam (and the test seeding path).
    pub async fn put_product(&self, product: &Product) -> EngineResult<()> {
        let doc = serde_json::to_value(product).map_err(|e| EngineError::Storage(e.to_string()))?;
        self.store
            .put_document(&product_path(&product.id), doc)
            .await
            .map_err(|e| Self::map_err(&product.id, e))
    }

    /// Deduct stock for an order's line items on one product and record the
    /// reservation, in one atomic update.
    ///
    /// On-hand quantity is allowed to go negative: assembly proceeds on
    /// backorder and negative stock surfaces to operators instead of
    /// blocking fulfillment. Returns [`ReserveOutcome::AlreadyReserved`]
    /// without touching anything when the order already holds a
    /// reservation here, which is what makes engine retries safe.
    pub async fn reserve_for_order(
        &self,
        product_id: &str,
        order_id: &str,
        lines: &[LineItem],
    ) -> EngineResult<ReserveOutcome> {
        let product = self.get_product(product_id).await?;
        if product.reservations.contains_key(order_id) {
            tracing::debug!(product_id, order_id, "reservation already present, skipping");
            return Ok(ReserveOutcome::AlreadyReserved);
        }

        let mut total = 0i64;
        let mut per_variant: BTreeMap<String, i64> = BTreeMap::new();
        for line in lines.iter().filter(|l| l.product_id == product_id) {
            total += line.quantity;
            if line.variant_options.is_empty() {
                continue;
            }
            let key = option_key(&line.variant_options);
            if product.variants.contains_key(&key) {
                *per_variant.entry(key).or_insert(0) += line.quantity;
            } else {
                tracing::warn!(
                    product_id,
                    order_id,
                    variant = %key,
                    "line item references unknown variant, deducting product total only"
                );
            }
        }
        if total == 0 {
            return Ok(ReserveOutcome::AlreadyReserved);
        }

        let mut ops = vec![FieldOp::increment(&["on_hand"], -total)];
        for (key, quantity) in &per_variant {
            ops.push(FieldOp::Increment {
                field: field_path(&["variants", key.as_str(), "quantity"]),
                delta: -quantity,
            });
        }
        let entry = ReservationEntry {
            total,
            variants: per_variant,
            sale_recorded: false,
        };
        ops.push(FieldOp::map_insert(
            &["reservations"],
            order_id,
            serde_json::to_value(&entry).map_err(|e| EngineError::Storage(e.to_string()))?,
        ));

        self.store
            .atomic_update(&product_path(product_id), ops)
            .await
            .map_err(|e| Self::map_err(product_id, e))?;

        tracing::debug!(product_id, order_id, quantity = total, "stock reserved");
        Ok(ReserveOutcome::Reserved)
    }

    /// Return an order's reserved stock on one product and drop the
    /// reservation entry, in one atomic update.
    ///
    /// A missing reservation is a safe no-op
    /// ([`ReleaseOutcome::NothingToRelease`]), which makes restoration
    /// idempotent under retries.
    pub async fn release_for_order(
        &self,
        product_id: &str,
        order_id: &str,
    ) -> EngineResult<ReleaseOutcome> {
        let product = self.get_product(product_id).await?;
        let Some(entry) = product.reservations.get(order_id) else {
            tracing::debug!(product_id, order_id, "no reservation to release");
            return Ok(ReleaseOutcome::NothingToRelease);
        };

        let mut ops = vec![FieldOp::increment(&["on_hand"], entry.total)];
        for (key, quantity) in &entry.variants {
            ops.push(FieldOp::Increment {
                field: field_path(&["variants", key.as_str(), "quantity"]),
                delta: *quantity,
            });
        }
        ops.push(FieldOp::map_delete(&["reservations"], order_id));

        self.store
            .atomic_update(&product_path(product_id), ops)
            .await
            .map_err(|e| Self::map_err(product_id, e))?;

        tracing::debug!(product_id, order_id, quantity = entry.total, "stock released");
        Ok(ReleaseOutcome::Released(entry.total))
    }

    /// Bump the cumulative sold counters for one product, at the transition
    /// into Delivered; never reversed.
    ///
    /// The order's reservation entry is flagged `sale_recorded` in the same
    /// atomic update, so a retried delivery skips products already counted
    /// ([`SaleOutcome::AlreadyRecorded`]) instead of inflating `sold`.
    pub async fn record_sale(
        &self,
        product_id: &str,
        order_id: &str,
        lines: &[LineItem],
    ) -> EngineResult<SaleOutcome> {
        let product = self.get_product(product_id).await?;
        if product
            .reservations
            .get(order_id)
            .is_some_and(|entry| entry.sale_recorded)
        {
            tracing::debug!(product_id, order_id, "sale already recorded, skipping");
            return Ok(SaleOutcome::AlreadyRecorded);
        }

        let mut total = 0i64;
        let mut ops = Vec::new();
        for line in lines.iter().filter(|l| l.product_id == product_id) {
            total += line.quantity;
            if line.variant_options.is_empty() {
                continue;
            }
            let key = option_key(&line.variant_options);
            if product.variants.contains_key(&key) {
                ops.push(FieldOp::Increment {
                    field: field_path(&["variants", key.as_str(), "sold"]),
                    delta: line.quantity,
                });
            }
        }
        if total == 0 {
            return Ok(SaleOutcome::AlreadyRecorded);
        }
        ops.insert(0, FieldOp::increment(&["sold"], total));
        // Marker lands in the same batch as the counters.
        match product.reservations.get(order_id) {
            Some(_) => ops.push(FieldOp::set(
                &["reservations", order_id, "sale_recorded"],
                json!(true),
            )),
            // Sale without a reservation (direct call): a zero-total entry
            // carries the marker.
            None => ops.push(FieldOp::map_insert(
                &["reservations"],
                order_id,
                serde_json::to_value(&ReservationEntry {
                    total: 0,
                    variants: BTreeMap::new(),
                    sale_recorded: true,
                })
                .map_err(|e| EngineError::Storage(e.to_string()))?,
            )),
        }

        self.store
            .atomic_update(&product_path(product_id), ops)
            .await
            .map_err(|e| Self::map_err(product_id, e))?;

        tracing::debug!(product_id, order_id, quantity = total, "sale recorded");
        Ok(SaleOutcome::Recorded)
    }

    // ========== Stock queries (read-side) ==========

    async fn query_products(
        &self,
        field: &str,
        op: FilterOp,
        value: serde_json::Value,
        order: SortOrder,
        limit: usize,
        cursor: Option<&str>,
    ) -> EngineResult<Vec<Product>> {
        let docs = self
            .store
            .query_by_field(COLLECTION, field, op, value, order, limit, cursor)
            .await
            .map_err(|e| match e {
                StoreError::Unavailable(message) => EngineError::InventoryUnavailable(message),
                other => EngineError::Storage(other.to_string()),
            })?;
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(|e| EngineError::Storage(e.to_string())))
            .collect()
    }

    /// Products with stock on hand, most stocked first.
    pub async fn in_stock(&self, limit: usize, cursor: Option<&str>) -> EngineResult<Vec<Product>> {
        self.query_products("on_hand", FilterOp::Gt, json!(0), SortOrder::Desc, limit, cursor)
            .await
    }

    /// Products at or below zero stock (backordered first).
    pub async fn out_of_stock(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> EngineResult<Vec<Product>> {
        self.query_products("on_hand", FilterOp::Le, json!(0), SortOrder::Asc, limit, cursor)
            .await
    }

    /// Products still in stock but at or below `threshold` units.
    pub async fn almost_out(
        &self,
        threshold: i64,
        limit: usize,
        cursor: Option<&str>,
    ) -> EngineResult<Vec<Product>> {
        let products = self
            .query_products(
                "on_hand",
                FilterOp::Le,
                json!(threshold),
                SortOrder::Desc,
                limit,
                cursor,
            )
            .await?;
        // Descending order puts the in-stock tail first; drop the rest.
        Ok(products.into_iter().filter(|p| p.on_hand > 0).collect())
    }

    /// Best sellers, highest cumulative sold first.
    pub async fn top_selling(&self, limit: usize) -> EngineResult<Vec<Product>> {
        self.query_products("sold", FilterOp::Gt, json!(0), SortOrder::Desc, limit, None)
            .await
    }
}
