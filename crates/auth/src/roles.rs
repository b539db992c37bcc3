use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Namespace prefix the backend uses for role authorities.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Role identifier as issued by the backend.
///
/// Roles stay opaque strings, but every value is normalized once on the way
/// in: a name without the `ROLE_` prefix gains it, so `ADMIN` and
/// `ROLE_ADMIN` compare equal. After normalization comparisons are exact
/// (case-sensitive) string matches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ROLE_ADMIN"));
    pub const USER: Role = Role(Cow::Borrowed("ROLE_USER"));
    pub const CLIENT: Role = Role(Cow::Borrowed("ROLE_CLIENT"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(normalize(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(name: Cow<'static, str>) -> Cow<'static, str> {
    if name.is_empty() || name.starts_with(ROLE_PREFIX) {
        name
    } else {
        Cow::Owned(format!("{ROLE_PREFIX}{name}"))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0.into_owned()
    }
}

/// Coarse classification derived from the raw role set.
///
/// Variants are ordered by privilege, so a requirement for `User` is met by
/// an `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoarseRole {
    User,
    Admin,
}

impl CoarseRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoarseRole::User => "USER",
            CoarseRole::Admin => "ADMIN",
        }
    }

    /// Canonical backend role granting this classification.
    pub fn role(&self) -> Role {
        match self {
            CoarseRole::User => Role::USER,
            CoarseRole::Admin => Role::ADMIN,
        }
    }
}

impl core::fmt::Display for CoarseRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
