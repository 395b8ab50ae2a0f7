//! Staff role model
//!
//! Roles gate the sensitive lifecycle operations (reset/delete). Everything
//! else is available to any authenticated staff member; the presentation
//! layer may hide buttons, but the engine enforces the guard.

use serde::{Deserialize, Serialize};

/// Staff account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Owner,
    Admin,
    Worker,
    /// Restricted role: may never reset or delete an order beyond Pending.
    Sales,
}

impl StaffRole {
    /// Elevated roles pass every lifecycle guard unconditionally.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}
