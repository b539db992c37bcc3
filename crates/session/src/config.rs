//! Session configuration (storage keys, redirect targets).

use serde::{Deserialize, Serialize};

use fiskal_auth::guard::{DEFAULT_LANDING_PATH, DEFAULT_LOGIN_PATH};

pub const DEFAULT_TOKEN_KEY: &str = "token";
pub const DEFAULT_IDENTITY_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage key holding the raw bearer token.
    pub token_key: String,
    /// Storage key holding the JSON identity record.
    pub identity_key: String,
    /// Where guards send visitors without a session.
    pub login_path: String,
    /// Where guards send authenticated users lacking the required role.
    pub landing_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    /// Read overrides from `FISKAL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            token_key: read("FISKAL_TOKEN_KEY", defaults.token_key),
            identity_key: read("FISKAL_IDENTITY_KEY", defaults.identity_key),
            login_path: read("FISKAL_LOGIN_PATH", defaults.login_path),
            landing_path: read("FISKAL_LANDING_PATH", defaults.landing_path),
        }
    }
}
