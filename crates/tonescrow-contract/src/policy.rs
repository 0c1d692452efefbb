//! Authorization policy: who may trigger which action.
//!
//! | Action    | Permitted roles      |
//! |-----------|----------------------|
//! | construct | any sender           |
//! | withdraw  | investor, guarantor  |
//! | refund    | worker, guarantor    |
//!
//! The investor approves paying the worker; the worker approves returning the
//! investor's money; the guarantor arbitrates both ways. Nobody can trigger a
//! payout to themselves alone.
//!
//! The policy is a pure function of `(caller, roles, action)` and never
//! touches state.

use tonescrow_types::{ActionKind, Address, EscrowError, Result, Role, Roles};

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The caller holds one of the permitted roles (or the action is open).
    Allow,
    /// The caller holds none of the permitted roles.
    Deny,
}

const WITHDRAW_ROLES: &[Role] = &[Role::Investor, Role::Guarantor];
const REFUND_ROLES: &[Role] = &[Role::Worker, Role::Guarantor];

/// Roles allowed to trigger `action`. `None` means open to any sender.
#[must_use]
pub fn permitted_roles(action: ActionKind) -> Option<&'static [Role]> {
    match action {
        ActionKind::Construct => None,
        ActionKind::Withdraw => Some(WITHDRAW_ROLES),
        ActionKind::Refund => Some(REFUND_ROLES),
    }
}

#[must_use]
pub fn decide(caller: &Address, roles: &Roles, action: ActionKind) -> Decision {
    match permitted_roles(action) {
        None => Decision::Allow,
        Some(permitted) if permitted.iter().any(|&r| roles.holds(caller, r)) => Decision::Allow,
        Some(_) => Decision::Deny,
    }
}

/// [`decide`], as a `Result`.
///
/// # Errors
/// Returns `Unauthorized` naming the caller and action on [`Decision::Deny`].
pub fn authorize(caller: &Address, roles: &Roles, action: ActionKind) -> Result<()> {
    match decide(caller, roles, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(EscrowError::Unauthorized {
            caller: *caller,
            action,
        }),
    }
}
