//! `fiskal-auth` — pure authorization over the current client identity.
//!
//! Nothing here touches storage or the UI: every function derives its answer
//! from an `Option<&Identity>` snapshot handed in by the caller.

pub mod authorize;
pub mod guard;
pub mod identity;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, RoleResolution, authorize, has_permission, resolve_roles};
pub use guard::{GuardDecision, GuardState, RouteGuard, has_any_role, is_administrator};
pub use identity::{Credential, Identity};
pub use permissions::{Action, PERMISSION_TABLE, Requirement};
pub use roles::{CoarseRole, Role};
