//! Capability checks for privileged operations.
//!
//! Moderation and admin overrides call [`require`] before touching the
//! privileged ledger/asset operations. Keeps authorization out of the
//! ledger and trading engine themselves.

use crate::types::{Account, Role};

use super::EconError;

/// What a privileged caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Flag/unflag assets, delete listings.
    Moderate,
    /// Direct price and balance overrides.
    AdminOverride,
}

/// Check that `actor` holds `capability`.
pub fn require(actor: &Account, capability: Capability) -> Result<(), EconError> {
    let allowed = match capability {
        Capability::Moderate => matches!(actor.role, Role::Moderator | Role::Admin),
        Capability::AdminOverride => matches!(actor.role, Role::Admin),
    };
    if allowed {
        Ok(())
    } else {
        Err(EconError::PermissionDenied(format!(
            "{} requires {:?}",
            actor.id, capability
        )))
    }
}
