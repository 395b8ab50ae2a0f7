//! Product Model
//!
//! On-hand quantity may go negative transiently (assembly can proceed on
//! backorder); negative stock is an operator signal, not an invariant
//! violation. The `reservations` map is the single source of truth for
//! "has this order already consumed stock from this product".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sellable variant of a product, keyed by its canonical option key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Option per axis, e.g. {"Color": "Red", "Size": "M"}.
    pub options: BTreeMap<String, String>,
    pub quantity: i64,
    #[serde(default)]
    pub sold: i64,
    pub cost: Decimal,
    pub price: Decimal,
}

/// Recorded stock deduction for one order on one product
///
/// The per-variant breakdown is what lets a release restore each
/// VariantRecord's quantity exactly, not just the product total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationEntry {
    /// Total units reserved across the order's line items for this product.
    pub total: i64,
    /// Reserved units per variant option key; empty for single-SKU lines.
    #[serde(default)]
    pub variants: BTreeMap<String, i64>,
    /// Set once this order's units were counted into `sold`; makes sale
    /// recording idempotent under retries.
    #[serde(default)]
    pub sale_recorded: bool,
}

/// Product document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Signed; may be driven negative before reconciliation.
    pub on_hand: i64,
    /// Cumulative units sold, monotonically non-decreasing.
    #[serde(default)]
    pub sold: i64,
    pub price: Decimal,
    pub cost: Decimal,
    /// Keyed by [`option_key`] of each record's options. Empty for a
    /// single-SKU product.
    #[serde(default)]
    pub variants: BTreeMap<String, VariantRecord>,
    /// order_id -> reservation held by that order on this product. An order
    /// id appears at most once.
    #[serde(default)]
    pub reservations: BTreeMap<String, ReservationEntry>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, on_hand: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            on_hand,
            sold: 0,
            price: Decimal::ZERO,
            cost: Decimal::ZERO,
            variants: BTreeMap::new(),
            reservations: BTreeMap::new(),
        }
    }

    pub fn with_pricing(mut self, price: Decimal, cost: Decimal) -> Self {
        self.price = price;
        self.cost = cost;
        self
    }

    /// Look up a variant by its option mapping, in any insertion order.
    pub fn variant(&self, options: &BTreeMap<String, String>) -> Option<&VariantRecord> {
        self.variants.get(&option_key(options))
    }

    /// Total units a given order currently holds on this product.
    pub fn reserved_for(&self, order_id: &str) -> Option<i64> {
        self.reservations.get(order_id).map(|r| r.total)
    }
}

/// Canonical, order-independent encoding of an option mapping.
///
/// Axes are sorted by name and joined as `axis=value|axis=value`, so the
/// same selection always yields the same key regardless of how the caller
/// assembled the map. Empty mapping encodes to the empty string (root SKU).
pub fn option_key(options: &BTreeMap<String, String>) -> String {
    options
        .iter()
        .map(|(axis, value)| format!("{axis}={value}"))
        .collect::<Vec<_>>()
        .join("|")
}
