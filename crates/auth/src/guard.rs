//! Declarative route gate: render the protected view or redirect.
//!
//! The guard is evaluated on every render against the current identity
//! snapshot. It keeps no cache, so a logout is visible on the next
//! evaluation without any invalidation step.

use serde::{Deserialize, Serialize};

use crate::{Identity, Role};

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// Where the guard stands for a given identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// No identity.
    Unauthenticated,
    /// Identity present, none of the allowed roles.
    Unauthorized,
    /// Identity holds at least one allowed role.
    Authorized,
}

/// What the routing layer should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    /// Navigate to `to`. `replace` swaps the current history entry so that
    /// back-navigation does not land on the guarded path again.
    Redirect { to: String, replace: bool },
}

impl GuardDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardDecision::Render)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteGuard {
    allowed_roles: Vec<Role>,
    login_path: String,
    landing_path: String,
}

impl RouteGuard {
    pub fn new<I, R>(allowed_roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        Self {
            allowed_roles: allowed_roles.into_iter().map(Into::into).collect(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    pub fn state(&self, identity: Option<&Identity>) -> GuardState {
        match identity {
            None => GuardState::Unauthenticated,
            Some(identity) if identity.has_any_role(&self.allowed_roles) => GuardState::Authorized,
            Some(_) => GuardState::Unauthorized,
        }
    }

    pub fn evaluate(&self, identity: Option<&Identity>) -> GuardDecision {
        match self.state(identity) {
            GuardState::Authorized => GuardDecision::Render,
            GuardState::Unauthenticated => GuardDecision::Redirect {
                to: self.login_path.clone(),
                replace: true,
            },
            GuardState::Unauthorized => GuardDecision::Redirect {
                to: self.landing_path.clone(),
                replace: true,
            },
        }
    }
}

/// Does the identity hold any of `roles`? False without an identity.
pub fn has_any_role(identity: Option<&Identity>, roles: &[Role]) -> bool {
    identity.is_some_and(|i| i.has_any_role(roles))
}

pub fn is_administrator(identity: Option<&Identity>) -> bool {
    identity.is_some_and(|i| i.has_role(&Role::ADMIN))
}
