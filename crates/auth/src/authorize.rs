use serde::Serialize;
use thiserror::Error;

use crate::permissions::requirement_for;
use crate::{Action, CoarseRole, Identity, Role};

/// Coarse classification of the current identity.
///
/// Always derived from a snapshot, never stored: call [`resolve_roles`]
/// again after the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoleResolution {
    pub is_admin: bool,
    pub is_user: bool,
    /// `None` for no session or an unrecognized role set.
    pub role: Option<CoarseRole>,
}

impl RoleResolution {
    pub fn has_permission(&self, action: Action) -> bool {
        requirement_for(action).is_some_and(|req| req.is_met_by(self.role))
    }
}

/// Classify an identity into admin / user / none.
pub fn resolve_roles(identity: Option<&Identity>) -> RoleResolution {
    let Some(identity) = identity else {
        return RoleResolution::default();
    };

    let is_admin = identity.has_role(&Role::ADMIN);
    let is_user = identity.has_role(&Role::USER);
    let role = if is_admin {
        Some(CoarseRole::Admin)
    } else if is_user {
        Some(CoarseRole::User)
    } else {
        None
    };

    RoleResolution {
        is_admin,
        is_user,
        role,
    }
}

pub fn has_permission(identity: Option<&Identity>, action: Action) -> bool {
    resolve_roles(identity).has_permission(action)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{0}' requires a higher role")]
    Forbidden(Action),
}

/// `Result` flavour of [`has_permission`] for callers that propagate with `?`.
pub fn authorize(identity: Option<&Identity>, action: Action) -> Result<(), AuthzError> {
    if has_permission(identity, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(action))
    }
}
