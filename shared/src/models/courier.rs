//! Courier Model
//!
//! Read-only collaborator data: the engine only checks that a courier is
//! assigned; fees and contact details are display/collaborator concerns.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Courier entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Shipping fee per governorate.
    #[serde(default)]
    pub fee_by_governorate: BTreeMap<String, Decimal>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Courier {
    /// Shipping fee for a governorate, if this courier serves it.
    pub fn fee_for(&self, governorate: &str) -> Option<Decimal> {
        self.fee_by_governorate.get(governorate).copied()
    }
}
