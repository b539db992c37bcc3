//! `fiskal-session`
//!
//! **Responsibility:** the client's single source of truth for "who is logged in".
//!
//! This crate provides:
//! - `SessionStore`: identity + credential holder with write-through persistence
//! - `KeyValueStore` backends (in-memory, file)
//! - `ForcedLogoutSignal` / `LogoutSignalBridge`: out-of-band logout from the network layer
//!
//! Authorization answers (roles, permissions, route guards) come from
//! `fiskal-auth` and are derived from the store's current snapshot.

pub mod bridge;
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_store;
pub mod runtime;
pub mod signal;
pub mod storage;
pub mod store;

pub use bridge::{BridgeError, LogoutSignalBridge};
pub use config::SessionConfig;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;
pub use runtime::SessionRuntime;
pub use signal::{ForcedLogoutSignal, SubscriptionId};
pub use storage::{InMemoryStore, KeyValueStore, StorageError};
pub use store::{SessionState, SessionStore};
