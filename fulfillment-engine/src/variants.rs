//! Variant Combinator
//!
//! Expands a product's option axes (e.g. Color x Size) into the full
//! cross-product of sellable variant records. Pure, no I/O; callers rely on
//! the output order for display, so expansion is depth-first in exactly the
//! order axes and values were supplied.

use rust_decimal::Decimal;
use shared::models::product::{VariantRecord, option_key};
use std::collections::BTreeMap;

/// Stock/pricing defaults every generated combination inherits.
#[derive(Debug, Clone, Copy)]
pub struct VariantDefaults {
    pub quantity: i64,
    pub cost: Decimal,
    pub price: Decimal,
}

/// One point of the option cross-product (ephemeral, not persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCombination {
    /// Canonical, order-independent key for this option selection.
    pub key: String,
    pub options: BTreeMap<String, String>,
    pub quantity: i64,
    pub cost: Decimal,
    pub price: Decimal,
}

impl VariantCombination {
    /// Convert into the persisted map entry shape.
    pub fn into_record(self) -> (String, VariantRecord) {
        (
            self.key,
            VariantRecord {
                options: self.options,
                quantity: self.quantity,
                sold: 0,
                cost: self.cost,
                price: self.price,
            },
        )
    }
}

/// Expand option axes into the full Cartesian product.
///
/// An empty axis list yields no variants (the product is sold as a single
/// undifferentiated SKU). An axis with a single value still participates:
/// every generated record carries a value for every axis.
pub fn expand(axes: &[(String, Vec<String>)], defaults: VariantDefaults) -> Vec<VariantCombination> {
    if axes.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current: Vec<(String, String)> = Vec::with_capacity(axes.len());
    walk(axes, 0, &mut current, defaults, &mut out);
    out
}

fn walk(
    axes: &[(String, Vec<String>)],
    depth: usize,
    current: &mut Vec<(String, String)>,
    defaults: VariantDefaults,
    out: &mut Vec<VariantCombination>,
) {
    if depth == axes.len() {
        let options: BTreeMap<String, String> = current.iter().cloned().collect();
        out.push(VariantCombination {
            key: option_key(&options),
            options,
            quantity: defaults.quantity,
            cost: defaults.cost,
            price: defaults.price,
        });
        return;
    }

    let (axis, values) = &axes[depth];
    for value in values {
        current.push((axis.clone(), value.clone()));
        walk(axes, depth + 1, current, defaults, out);
        current.pop();
    }
}
