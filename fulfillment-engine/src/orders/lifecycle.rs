//! Order Lifecycle Engine
//!
//! Coordinates the transition table, the inventory store and the
//! collaborator contracts. One transition call runs under the order's
//! token, applies the inventory effect first, and only persists the new
//! status once every per-product effect is confirmed. Inventory effects
//! are idempotent per order, so a call that fails midway can simply be
//! retried.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Mutex;
use uuid::Uuid;

use shared::error::{EngineError, EngineResult};
use shared::models::courier::Courier;
use shared::models::order::{Order, OrderStatus, TransitionCode};
use shared::models::role::StaffRole;

use crate::couriers::CourierDirectory;
use crate::identity::{ActorContext, IdentityProvider};
use crate::inventory::{InventoryStore, ReleaseOutcome, ReserveOutcome};
use crate::orders::records::OrderRecordStore;
use crate::orders::transitions::{self, CourierRule, InventoryEffect};
use crate::store::DocumentStore;

/// Orchestrates order status changes and their inventory effects.
pub struct LifecycleEngine {
    records: OrderRecordStore,
    inventory: InventoryStore,
    identity: Arc<dyn IdentityProvider>,
    couriers: Arc<dyn CourierDirectory>,
    /// Per-order token registry; transitions on one order are serialized.
    tokens: DashMap<String, Arc<Mutex<()>>>,
    /// Identifies this engine instance in logs across restarts.
    epoch: String,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        couriers: Arc<dyn CourierDirectory>,
    ) -> Self {
        let epoch = Uuid::new_v4().to_string();
        tracing::info!(%epoch, "lifecycle engine started");
        Self {
            records: OrderRecordStore::new(store.clone()),
            inventory: InventoryStore::new(store),
            identity,
            couriers,
            tokens: DashMap::new(),
            epoch,
        }
    }

    fn order_token(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.tokens.entry(order_id.to_string()).or_default().clone()
    }

    // ========== Public operations ==========

    /// Intake path: persist a new Pending order.
    pub async fn submit_order(&self, order: Order) -> EngineResult<Order> {
        self.records.create(&order).await?;
        tracing::info!(epoch = %self.epoch, order_id = %order.id, "order submitted");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: &str) -> EngineResult<Order> {
        self.records.get(order_id).await
    }

    /// Page through orders in one status.
    pub async fn list_orders(
        &self,
        status: OrderStatus,
        limit: usize,
        cursor: Option<&str>,
    ) -> EngineResult<Vec<Order>> {
        self.records.list_by_status(status, limit, cursor).await
    }

    /// Contact/fee data for the order's assigned courier, if any.
    pub async fn assigned_courier(&self, order_id: &str) -> EngineResult<Option<Courier>> {
        let order = self.records.get(order_id).await?;
        match order.courier_id {
            Some(courier_id) => self.couriers.get_courier(&courier_id).await,
            None => Ok(None),
        }
    }

    /// Move an order to `target`, applying the transition's inventory
    /// effect and audit entry.
    ///
    /// The new status is persisted only after every per-product inventory
    /// effect is confirmed; on [`EngineError::PartialInventoryFailure`] the
    /// order is left in its previous status and the same call can be
    /// retried.
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor_id: &str,
        courier_id: Option<&str>,
    ) -> EngineResult<Order> {
        let token = self.order_token(order_id);
        let _guard = token.lock().await;

        // 1. Load fresh state under the token; a racing caller that lost
        //    observes the committed status here.
        let mut order = self.records.get(order_id).await?;
        let from = order.status;

        // 2. Table lookup plus the delivery-only restriction.
        let transition = transitions::validate(from, target)?;
        if transition.delivery_orders_only && !order.requires_delivery {
            return Err(EngineError::InvalidTransition { from, to: target });
        }

        // 3. Resolve the actor and apply the rewind guard before any
        //    mutation.
        let actor = self.identity.actor_context(actor_id).await?;
        if transition.guarded && !Self::may_rewind(&actor, from) {
            return Err(EngineError::Unauthorized {
                actor_id: actor_id.to_string(),
                action: format!("{:?} order in {from:?}", transition.code),
            });
        }

        // 4. Courier precondition. The id passed in wins over one already
        //    on the order; neither present is a refused transition.
        let effective_courier = courier_id
            .map(str::to_string)
            .or_else(|| order.courier_id.clone());
        let courier_needed = match transition.courier {
            CourierRule::Required => true,
            CourierRule::RequiredIfDelivery => order.requires_delivery,
            CourierRule::NotRequired => false,
        };
        if courier_needed && effective_courier.is_none() {
            return Err(EngineError::InvalidTransition { from, to: target });
        }

        // 5. Inventory effect, per product, status untouched until all
        //    confirmed.
        let stock_moved = self.apply_effect(transition.effect, &order).await?;
        if stock_moved {
            order.reservation_version += 1;
        }

        // 6. Commit status, courier assignment and audit entry.
        order.status = target;
        if courier_needed && order.courier_id.is_none() {
            order.courier_id = effective_courier.clone();
        }
        let message = Self::audit_message(transition.code, effective_courier.as_deref());
        order.push_audit(actor_id, message, transition.code);
        self.records.put(&mut order).await?;

        tracing::info!(
            epoch = %self.epoch,
            order_id,
            from = ?from,
            to = ?target,
            actor = actor_id,
            "order transitioned"
        );
        Ok(order)
    }

    /// Append a free-form audit comment. No status, inventory or
    /// reservation change.
    pub async fn add_comment(
        &self,
        order_id: &str,
        actor_id: &str,
        text: &str,
    ) -> EngineResult<Order> {
        let token = self.order_token(order_id);
        let _guard = token.lock().await;

        let actor = self.identity.actor_context(actor_id).await?;
        let mut order = self.records.get(order_id).await?;
        order.push_audit(&actor.actor_id, text, TransitionCode::Comment);
        self.records.put(&mut order).await?;
        Ok(order)
    }

    // ========== Internals ==========

    /// Reset and Delete may rewind work other people did; who may do so
    /// depends on role, store policy and how far the order has moved.
    fn may_rewind(actor: &ActorContext, current: OrderStatus) -> bool {
        match actor.role {
            StaffRole::Owner | StaffRole::Admin => true,
            StaffRole::Worker => actor.can_workers_reset,
            StaffRole::Sales => current == OrderStatus::Pending,
        }
    }

    /// Run one transition's inventory effect across every product the
    /// order touches. Independent products run concurrently; products that
    /// failed get one retry within the call. Returns whether any
    /// reservation was created or released.
    async fn apply_effect(&self, effect: InventoryEffect, order: &Order) -> EngineResult<bool> {
        if effect == InventoryEffect::None {
            return Ok(false);
        }

        let products = order.product_ids();
        let total = products.len();
        let mut pending = products;
        let mut stock_moved = false;

        for attempt in 0..2u8 {
            let results = join_all(
                pending
                    .iter()
                    .map(|product_id| self.apply_one(effect, product_id, order)),
            )
            .await;

            let mut failed = Vec::new();
            for (product_id, result) in pending.iter().zip(results) {
                match result {
                    Ok(moved) => stock_moved |= moved,
                    // A missing product is not transient; surface it.
                    Err(err @ EngineError::ProductNotFound(_)) => return Err(err),
                    Err(err) => {
                        tracing::warn!(
                            order_id = %order.id,
                            product_id,
                            attempt,
                            error = %err,
                            "inventory effect failed"
                        );
                        failed.push(*product_id);
                    }
                }
            }
            pending = failed;
            if pending.is_empty() {
                break;
            }
        }

        if !pending.is_empty() {
            tracing::warn!(
                order_id = %order.id,
                completed = total - pending.len(),
                total,
                "inventory effect incomplete, leaving status unchanged"
            );
            return Err(EngineError::PartialInventoryFailure {
                completed: total - pending.len(),
                total,
            });
        }
        Ok(stock_moved)
    }

    async fn apply_one(
        &self,
        effect: InventoryEffect,
        product_id: &str,
        order: &Order,
    ) -> EngineResult<bool> {
        match effect {
            InventoryEffect::None => Ok(false),
            InventoryEffect::Reserve => {
                let outcome = self
                    .inventory
                    .reserve_for_order(product_id, &order.id, &order.line_items)
                    .await?;
                Ok(outcome == ReserveOutcome::Reserved)
            }
            InventoryEffect::Release => {
                let outcome = self.inventory.release_for_order(product_id, &order.id).await?;
                Ok(matches!(outcome, ReleaseOutcome::Released(_)))
            }
            InventoryEffect::RecordSale => {
                self.inventory
                    .record_sale(product_id, &order.id, &order.line_items)
                    .await?;
                Ok(false)
            }
        }
    }

    fn audit_message(code: TransitionCode, courier: Option<&str>) -> String {
        match code {
            TransitionCode::Confirmed => "order confirmed".to_string(),
            TransitionCode::Assembled => "order assembled, stock reserved".to_string(),
            TransitionCode::OutForDelivery => match courier {
                Some(id) => format!("handed to courier {id}, out for delivery"),
                None => "out for delivery".to_string(),
            },
            TransitionCode::Delivered => "order delivered".to_string(),
            TransitionCode::Failed => "delivery failed, stock returned".to_string(),
            TransitionCode::Reset => "order reset to pending".to_string(),
            TransitionCode::Deleted => "order deleted".to_string(),
            TransitionCode::Comment => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::couriers::StaticCourierDirectory;
    use crate::identity::StaticIdentityProvider;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use shared::models::order::{Financials, LineItem};
    use shared::models::product::Product;
    use shared::models::store_config::StoreConfig;
    use std::collections::BTreeMap;

    fn line(product_id: &str, quantity: i64) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            variant_options: BTreeMap::new(),
            quantity,
            unit_price: Decimal::from(100),
            unit_cost: Decimal::from(40),
        }
    }

    async fn create_test_engine(config: StoreConfig) -> (LifecycleEngine, InventoryStore) {
        let store = Arc::new(MemoryStore::new());

        let identity = StaticIdentityProvider::new(config);
        identity.insert("owner", StaffRole::Owner);
        identity.insert("worker", StaffRole::Worker);
        identity.insert("sales", StaffRole::Sales);

        let couriers = StaticCourierDirectory::new();
        couriers.insert(Courier {
            id: "c-1".into(),
            name: "Speedy".into(),
            phone: "0100".into(),
            fee_by_governorate: BTreeMap::new(),
            visible: true,
        });

        let inventory = InventoryStore::new(store.clone());
        inventory
            .put_product(&Product::new("p-1", "shirt", 10))
            .await
            .unwrap();

        let engine = LifecycleEngine::new(store, Arc::new(identity), Arc::new(couriers));
        (engine, inventory)
    }

    async fn seeded_order(engine: &LifecycleEngine, id: &str) -> Order {
        let order = Order::new(id, vec![line("p-1", 2)], Financials::default());
        engine.submit_order(order).await.unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_to_delivered() {
        let (engine, inventory) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;

        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::OutForDelivery, "owner", Some("c-1"))
            .await
            .unwrap();
        let order = engine
            .transition("o-1", OrderStatus::Delivered, "owner", None)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.courier_id.as_deref(), Some("c-1"));
        assert_eq!(order.reservation_version, 1);
        assert_eq!(order.audit_log.len(), 4);

        let product = inventory.get_product("p-1").await.unwrap();
        assert_eq!(product.on_hand, 8, "delivery keeps the deduction");
        assert_eq!(product.sold, 2);
        assert_eq!(
            product.reserved_for("o-1"),
            Some(2),
            "delivered orders keep their reservation entry"
        );
    }

    #[tokio::test]
    async fn test_out_for_delivery_needs_courier() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;
        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();

        let result = engine
            .transition("o-1", OrderStatus::OutForDelivery, "owner", None)
            .await;
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_pickup_order_delivers_without_courier() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        let order = Order::new("o-1", vec![line("p-1", 1)], Financials::default())
            .with_requires_delivery(false);
        engine.submit_order(order).await.unwrap();

        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();
        let order = engine
            .transition("o-1", OrderStatus::Delivered, "owner", None)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.courier_id, None);
    }

    #[tokio::test]
    async fn test_failed_requires_delivery_order() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        let order = Order::new("o-1", vec![line("p-1", 1)], Financials::default())
            .with_requires_delivery(false);
        engine.submit_order(order).await.unwrap();
        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();

        let result = engine
            .transition("o-1", OrderStatus::Failed, "owner", None)
            .await;
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_worker_reset_gated_by_store_flag() {
        let (engine, _) = create_test_engine(StoreConfig {
            can_workers_reset: false,
            ..StoreConfig::default()
        })
        .await;
        seeded_order(&engine, "o-1").await;
        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();

        let result = engine
            .transition("o-1", OrderStatus::Pending, "worker", None)
            .await;
        assert!(matches!(result, Err(EngineError::Unauthorized { .. })));

        let order = engine.get_order("o-1").await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed, "refusal must not mutate");
    }

    #[tokio::test]
    async fn test_worker_reset_allowed_when_flag_set() {
        let (engine, inventory) = create_test_engine(StoreConfig {
            can_workers_reset: true,
            ..StoreConfig::default()
        })
        .await;
        seeded_order(&engine, "o-1").await;
        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();

        let order = engine
            .transition("o-1", OrderStatus::Pending, "worker", None)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.reservation_version, 2, "reserve then release");

        let product = inventory.get_product("p-1").await.unwrap();
        assert_eq!(product.on_hand, 10, "reset returns the stock");
    }

    #[tokio::test]
    async fn test_sales_may_delete_pending_only() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;
        seeded_order(&engine, "o-2").await;

        let order = engine
            .transition("o-1", OrderStatus::Deleted, "sales", None)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Deleted);

        engine
            .transition("o-2", OrderStatus::Confirmed, "sales", None)
            .await
            .unwrap();
        let result = engine
            .transition("o-2", OrderStatus::Deleted, "sales", None)
            .await;
        assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_add_comment_leaves_everything_else() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;

        let order = engine
            .add_comment("o-1", "owner", "customer asked to call first")
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.reservation_version, 0);
        assert_eq!(order.audit_log.len(), 1);
        assert_eq!(order.audit_log[0].code, TransitionCode::Comment);
        assert_eq!(order.audit_log[0].message, "customer asked to call first");
    }

    #[tokio::test]
    async fn test_unknown_actor_rejected() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;
        let result = engine
            .transition("o-1", OrderStatus::Confirmed, "ghost", None)
            .await;
        assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_assigned_courier_lookup() {
        let (engine, _) = create_test_engine(StoreConfig::default()).await;
        seeded_order(&engine, "o-1").await;
        assert!(engine.assigned_courier("o-1").await.unwrap().is_none());

        engine
            .transition("o-1", OrderStatus::Confirmed, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::Assembled, "owner", None)
            .await
            .unwrap();
        engine
            .transition("o-1", OrderStatus::OutForDelivery, "owner", Some("c-1"))
            .await
            .unwrap();

        let courier = engine.assigned_courier("o-1").await.unwrap().unwrap();
        assert_eq!(courier.name, "Speedy");
    }
}
