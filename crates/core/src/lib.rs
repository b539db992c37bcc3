//! `fiskal-core` — shared building blocks for the client session layer.
//!
//! This crate contains **pure** primitives (no storage, no UI).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, UserId};
