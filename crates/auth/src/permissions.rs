use core::str::FromStr;

use serde::{Deserialize, Serialize};

use fiskal_core::DomainError;

use crate::CoarseRole;

/// UI-level action gated by the permission predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Action::View),
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            other => Err(DomainError::validation(format!("unknown action '{other}'"))),
        }
    }
}

/// What the current session must hold to perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Granted with or without a session.
    Anyone,
    /// Granted to this coarse role or any higher one.
    AtLeast(CoarseRole),
}

/// Action → requirement.
///
/// Two tiers only: view/create are never gated at this layer, edit/delete
/// need an administrator. An action missing from the table is denied.
pub const PERMISSION_TABLE: &[(Action, Requirement)] = &[
    (Action::View, Requirement::Anyone),
    (Action::Create, Requirement::Anyone),
    (Action::Edit, Requirement::AtLeast(CoarseRole::Admin)),
    (Action::Delete, Requirement::AtLeast(CoarseRole::Admin)),
];

pub fn requirement_for(action: Action) -> Option<Requirement> {
    PERMISSION_TABLE
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, req)| *req)
}

impl Requirement {
    pub fn is_met_by(&self, role: Option<CoarseRole>) -> bool {
        match self {
            Requirement::Anyone => true,
            Requirement::AtLeast(min) => role.is_some_and(|r| r >= *min),
        }
    }
}
