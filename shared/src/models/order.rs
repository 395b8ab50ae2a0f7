//! Order Model
//!
//! An order is never physically deleted: `Deleted` is a terminal status.
//! Inventory for an order's line items is reserved in the backing store if
//! and only if the status is Assembled, OutForDelivery or Delivered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Order lifecycle status (closed enumeration)
///
/// Legality of a transition is defined once, in the engine's transition
/// table, never re-derived from string comparisons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Assembled,
    OutForDelivery,
    Delivered,
    Failed,
    Deleted,
}

impl OrderStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Deleted)
    }

    /// Whether stock is reserved for an order in this status.
    pub fn holds_reservation(&self) -> bool {
        matches!(self, Self::Assembled | Self::OutForDelivery | Self::Delivered)
    }
}

/// Audit-log entry code, one per transition plus free-form comments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionCode {
    Confirmed,
    Assembled,
    OutForDelivery,
    Delivered,
    Failed,
    Reset,
    Deleted,
    Comment,
}

/// Append-only audit-log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub code: TransitionCode,
}

/// One product/variant + quantity entry within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    /// Selected option per axis; empty for a single-SKU product.
    #[serde(default)]
    pub variant_options: BTreeMap<String, String>,
    /// Always > 0.
    pub quantity: i64,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
}

/// Order financials; `amount_due` is derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Financials {
    pub total_price: Decimal,
    pub shipping_fee: Decimal,
    /// Always >= 0.
    pub discount: Decimal,
    /// Always >= 0.
    pub deposit: Decimal,
}

impl Financials {
    pub fn amount_due(&self) -> Decimal {
        self.total_price + self.shipping_fee - self.discount - self.deposit
    }
}

/// Customer shipping data, mandatory only when the order requires delivery
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShippingInfo {
    pub name: String,
    pub phone: String,
    pub governorate: String,
    pub address: String,
}

/// Order document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Stable identifier, immutable once assigned.
    pub id: String,
    pub status: OrderStatus,
    pub line_items: Vec<LineItem>,
    pub financials: Financials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingInfo>,
    /// Set once, when the order goes out for delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,
    pub requires_delivery: bool,
    /// Incremented every time inventory is reserved or released for this
    /// order; makes restoration idempotent under retries.
    #[serde(default)]
    pub reservation_version: u64,
    /// Persistence revision, bumped on every write. A stale writer fails
    /// with ConcurrentModification instead of clobbering newer state.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// New order in Pending, as produced by order intake.
    pub fn new(id: impl Into<String>, line_items: Vec<LineItem>, financials: Financials) -> Self {
        Self {
            id: id.into(),
            status: OrderStatus::Pending,
            line_items,
            financials,
            shipping: None,
            courier_id: None,
            requires_delivery: true,
            reservation_version: 0,
            revision: 0,
            audit_log: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_requires_delivery(mut self, requires_delivery: bool) -> Self {
        self.requires_delivery = requires_delivery;
        self
    }

    pub fn with_shipping(mut self, shipping: ShippingInfo) -> Self {
        self.shipping = Some(shipping);
        self
    }

    /// Append one audit entry (append-only; entries are never edited).
    pub fn push_audit(&mut self, actor_id: &str, message: impl Into<String>, code: TransitionCode) {
        self.audit_log.push(AuditEntry {
            actor_id: actor_id.to_string(),
            timestamp: Utc::now(),
            message: message.into(),
            code,
        });
    }

    /// Product ids touched by this order, deduplicated, in line-item order.
    pub fn product_ids(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for item in &self.line_items {
            if !seen.contains(&item.product_id.as_str()) {
                seen.push(item.product_id.as_str());
            }
        }
        seen
    }
}
