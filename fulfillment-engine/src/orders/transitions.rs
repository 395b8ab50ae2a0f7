//! Closed transition table
//!
//! The single place where (from, to) legality is defined. Anything that
//! needs "can this order move to X" asks this table; there are no status
//! string comparisons anywhere else.

use shared::error::{EngineError, EngineResult};
use shared::models::order::{OrderStatus, TransitionCode};

/// Inventory side effect a transition carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    /// No stock movement.
    None,
    /// Reserve stock for every line item (deduct + record reservation).
    Reserve,
    /// Release any held reservation (idempotent: absent entries are no-ops).
    Release,
    /// Bump cumulative sold counters; reservations stay in place.
    RecordSale,
}

/// Courier precondition of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierRule {
    /// No courier requirement.
    NotRequired,
    /// A courier must be assigned (going out for delivery).
    Required,
    /// A courier must be assigned only when the order requires delivery.
    RequiredIfDelivery,
}

/// Resolved description of one legal transition.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub code: TransitionCode,
    pub effect: InventoryEffect,
    pub courier: CourierRule,
    /// Legal only for orders that require delivery (delivery failure).
    pub delivery_orders_only: bool,
    /// Subject to the reset/delete role guard.
    pub guarded: bool,
}

/// Look up (from, to) in the table.
///
/// Unknown pairs, including self-transitions and anything out of a
/// terminal status, fail with [`EngineError::InvalidTransition`].
pub fn validate(from: OrderStatus, to: OrderStatus) -> EngineResult<Transition> {
    use CourierRule::*;
    use InventoryEffect::*;
    use OrderStatus::*;

    let transition = match (from, to) {
        (Pending, Confirmed) => Transition {
            code: TransitionCode::Confirmed,
            effect: None,
            courier: NotRequired,
            delivery_orders_only: false,
            guarded: false,
        },
        (Confirmed, Assembled) => Transition {
            code: TransitionCode::Assembled,
            effect: Reserve,
            courier: NotRequired,
            delivery_orders_only: false,
            guarded: false,
        },
        (Assembled, OutForDelivery) => Transition {
            code: TransitionCode::OutForDelivery,
            effect: None,
            courier: Required,
            delivery_orders_only: false,
            guarded: false,
        },
        (Assembled | OutForDelivery, Delivered) => Transition {
            code: TransitionCode::Delivered,
            effect: RecordSale,
            courier: RequiredIfDelivery,
            delivery_orders_only: false,
            guarded: false,
        },
        (Assembled | OutForDelivery, Failed) => Transition {
            code: TransitionCode::Failed,
            effect: Release,
            courier: NotRequired,
            delivery_orders_only: true,
            guarded: false,
        },
        // Reset: anything non-terminal except Pending itself goes back to
        // Pending, returning stock if any was held.
        (from, Pending) if !from.is_terminal() && from != Pending => Transition {
            code: TransitionCode::Reset,
            effect: Release,
            courier: NotRequired,
            delivery_orders_only: false,
            guarded: true,
        },
        (from, Deleted) if !from.is_terminal() => Transition {
            code: TransitionCode::Deleted,
            effect: Release,
            courier: NotRequired,
            delivery_orders_only: false,
            guarded: true,
        },
        _ => return Err(EngineError::InvalidTransition { from, to }),
    };
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 7] = [
        Pending,
        Confirmed,
        Assembled,
        OutForDelivery,
        Delivered,
        Failed,
        Deleted,
    ];

    fn legal(from: OrderStatus, to: OrderStatus) -> bool {
        validate(from, to).is_ok()
    }

    #[test]
    fn test_happy_path_chain() {
        assert!(legal(Pending, Confirmed));
        assert!(legal(Confirmed, Assembled));
        assert!(legal(Assembled, OutForDelivery));
        assert!(legal(OutForDelivery, Delivered));
        assert!(legal(Assembled, Delivered), "pickup orders skip delivery");
    }

    #[test]
    fn test_terminal_statuses_admit_nothing() {
        for from in [Delivered, Deleted] {
            for to in ALL {
                assert!(!legal(from, to), "{from:?} -> {to:?} must be invalid");
            }
        }
    }

    #[test]
    fn test_reset_targets() {
        for from in [Confirmed, Assembled, OutForDelivery, Failed] {
            assert!(legal(from, Pending), "{from:?} must be resettable");
            assert!(validate(from, Pending).unwrap().guarded);
        }
        assert!(!legal(Pending, Pending), "self-reset is not a transition");
    }

    #[test]
    fn test_delete_targets() {
        for from in [Pending, Confirmed, Assembled, OutForDelivery, Failed] {
            assert!(legal(from, Deleted), "{from:?} must be deletable");
        }
    }

    #[test]
    fn test_failed_only_from_fulfillment() {
        assert!(legal(Assembled, Failed));
        assert!(legal(OutForDelivery, Failed));
        assert!(!legal(Pending, Failed));
        assert!(!legal(Confirmed, Failed));
    }

    #[test]
    fn test_skipping_stages_is_invalid() {
        assert!(!legal(Pending, Assembled));
        assert!(!legal(Pending, Delivered));
        assert!(!legal(Confirmed, OutForDelivery));
        assert!(!legal(Confirmed, Delivered));
    }

    #[test]
    fn test_effects_match_table() {
        assert_eq!(validate(Confirmed, Assembled).unwrap().effect, InventoryEffect::Reserve);
        assert_eq!(
            validate(OutForDelivery, Delivered).unwrap().effect,
            InventoryEffect::RecordSale
        );
        assert_eq!(validate(Assembled, Failed).unwrap().effect, InventoryEffect::Release);
        assert_eq!(validate(Assembled, Pending).unwrap().effect, InventoryEffect::Release);
        assert_eq!(validate(Pending, Confirmed).unwrap().effect, InventoryEffect::None);
    }

    #[test]
    fn test_courier_rules() {
        assert_eq!(
            validate(Assembled, OutForDelivery).unwrap().courier,
            CourierRule::Required
        );
        assert_eq!(
            validate(Assembled, Delivered).unwrap().courier,
            CourierRule::RequiredIfDelivery
        );
    }
}
