//! Key/value configuration consumed by the request layer.
//!
//! The store performs no validation; a hostname is checked for a scheme at
//! the point of use in [`crate::rest`], admin credentials are checked when
//! an admin-scoped request is issued, and so on. Unknown keys read back as
//! `None`.
//!
//! The configuration is an explicit object owned by the host application
//! and shared behind an `Arc`; it is built up front with [`Configuration::set`]
//! and treated as read-only once shared.

use std::collections::BTreeMap;

/// Well-known configuration keys.
pub mod keys {
    /// Scheme-qualified base URL of the Stacks deployment.
    pub const HOSTNAME: &str = "hostname";
    /// Basic-auth username for user-scoped requests.
    pub const USERNAME: &str = "username";
    /// Basic-auth password for user-scoped requests.
    pub const PASSWORD: &str = "password";
    /// Basic-auth username for admin-scoped requests.
    pub const ADMIN_USERNAME: &str = "admin_username";
    /// Basic-auth password for admin-scoped requests.
    pub const ADMIN_PASSWORD: &str = "admin_password";
    /// HTTP connect timeout in seconds.
    pub const CONNECT_TIMEOUT_SECS: &str = "connect_timeout_secs";
    /// HTTP read timeout in seconds.
    pub const TIMEOUT_SECS: &str = "timeout_secs";
}

/// Default HTTP connect timeout when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide connection settings for the Stacks services.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    /// Creates an empty configuration; every key reads back as unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, or `None` when unset or empty.
    ///
    /// Empty strings count as unset so that `set(key, "")` behaves like
    /// clearing the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Sets a single key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Replaces the entire store with the supplied map.
    pub fn replace_all(&mut self, values: BTreeMap<String, String>) {
        self.values = values;
    }

    /// Returns all settings currently held.
    #[must_use]
    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Parses a seconds value from `key`, falling back to `default` when
    /// unset or unparseable.
    #[must_use]
    pub fn timeout_or(&self, key: &str, default: u64) -> u64 {
        self.get(key)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(default)
    }
}

impl From<BTreeMap<String, String>> for Configuration {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}
