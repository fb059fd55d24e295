// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gate Configuration
//!
//! Configuration is loaded once at startup from simple `key = value`
//! properties and frozen into an immutable [`GateConfig`] that is shared by
//! `Arc` with every component. There is no lazy re-reading: changing the
//! configuration requires a restart.
//!
//! ## Keys
//!
//! | Key | Description | Default |
//! |-----|-------------|---------|
//! | `attribute.<name>` | Logical attribute name -> HTTP header name | - |
//! | `require` | CSV of logical names required for authentication | empty |
//! | `login.enable` | Redirect to the SSO login initiator | `true` |
//! | `login.url` | SSO login initiator URL | `/Shibboleth.sso/Login` |
//! | `login.return` | Fallback return URL after authentication | - |
//! | `logout.enable` | Redirect to the SSO logout initiator | `false` |
//! | `logout.url` | SSO logout initiator URL | `/Shibboleth.sso/Logout` |
//! | `logout.return` | Destination after logout | `/` |
//! | `base.url` | Base for building absolute initiator targets | from `Host` |
//! | `mode` | `mock` substitutes configured headers for real ones | - |
//! | `mock.<header>` | Mock header value (only read in mock mode) | - |
//!
//! Mock mode is a test facility and is ignored when the process runs in
//! production (`APP_ENV=production`).

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::attributes::{build_mapping, AttributeMapping};

/// Environment variable naming the properties file to load.
pub const CONFIG_PATH_ENV: &str = "GATE_CONFIG";

/// Environment variable carrying the deployment environment name.
pub const APP_ENV: &str = "APP_ENV";

const KEY_REQUIRE: &str = "require";
const KEY_LOGIN_ENABLE: &str = "login.enable";
const KEY_LOGIN_URL: &str = "login.url";
const KEY_LOGIN_RETURN: &str = "login.return";
const KEY_LOGOUT_ENABLE: &str = "logout.enable";
const KEY_LOGOUT_URL: &str = "logout.url";
const KEY_LOGOUT_RETURN: &str = "logout.return";
const KEY_BASE_URL: &str = "base.url";
const KEY_MODE: &str = "mode";
const MOCK_PREFIX: &str = "mock.";

const DEFAULT_LOGIN_URL: &str = "/Shibboleth.sso/Login";
const DEFAULT_LOGOUT_URL: &str = "/Shibboleth.sso/Logout";
const DEFAULT_LOGOUT_RETURN: &str = "/";

/// Configuration failures are fatal at startup, never per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration line {line}: expected 'key = value'")]
    MalformedLine { line: usize },
    #[error("configuration key '{key}' has invalid boolean value '{value}'")]
    InvalidBool { key: String, value: String },
}

/// Immutable gate configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Logical attribute name -> source header name.
    pub attributes: AttributeMapping,
    /// Logical names that must be present for authentication to complete.
    pub required: Vec<String>,
    /// When false, authentication runs directly against the current
    /// request's headers instead of redirecting to the login initiator.
    pub login_enable: bool,
    /// SSO login initiator URL.
    pub login_url: String,
    /// Fallback return URL used after authentication when neither the
    /// flash store nor the `return` query parameter carries one.
    pub login_return: Option<String>,
    /// Whether logout redirects through the SSO logout initiator.
    pub logout_enable: bool,
    /// SSO logout initiator URL.
    pub logout_url: String,
    /// Destination after logout completes.
    pub logout_return: String,
    /// Base URL for absolute initiator targets; the request `Host` header
    /// is used when unset.
    pub base_url: Option<String>,
    /// Mock header entries (`mock.<header> = <value>`), seeded into the
    /// mock header store.
    pub mock_headers: Vec<(String, String)>,
    mock: bool,
}

impl GateConfig {
    /// Build the configuration from `(key, value)` property pairs.
    ///
    /// `production` disables mock mode regardless of the `mode` key.
    pub fn from_properties<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)> + Clone,
        production: bool,
    ) -> Result<Self, ConfigError> {
        // Last-wins for scalar keys, like the attribute mapping.
        let mut scalars: HashMap<&str, &str> = HashMap::new();
        let mut mock_headers = Vec::new();
        for (key, value) in pairs.clone() {
            if let Some(header) = key.strip_prefix(MOCK_PREFIX) {
                if !header.is_empty() {
                    mock_headers.push((header.to_string(), value.to_string()));
                }
            } else {
                scalars.insert(key, value);
            }
        }

        let attributes = build_mapping(pairs);

        let required = scalars
            .get(KEY_REQUIRE)
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let login_enable = parse_bool(&scalars, KEY_LOGIN_ENABLE)?.unwrap_or(true);
        let logout_enable = parse_bool(&scalars, KEY_LOGOUT_ENABLE)?.unwrap_or(false);

        let mock = !production
            && scalars
                .get(KEY_MODE)
                .is_some_and(|mode| mode.eq_ignore_ascii_case("mock"));

        Ok(Self {
            attributes,
            required,
            login_enable,
            login_url: scalars
                .get(KEY_LOGIN_URL)
                .copied()
                .unwrap_or(DEFAULT_LOGIN_URL)
                .to_string(),
            login_return: scalars.get(KEY_LOGIN_RETURN).map(|v| v.to_string()),
            logout_enable,
            logout_url: scalars
                .get(KEY_LOGOUT_URL)
                .copied()
                .unwrap_or(DEFAULT_LOGOUT_URL)
                .to_string(),
            logout_return: scalars
                .get(KEY_LOGOUT_RETURN)
                .copied()
                .unwrap_or(DEFAULT_LOGOUT_RETURN)
                .to_string(),
            base_url: scalars.get(KEY_BASE_URL).map(|v| v.to_string()),
            mock_headers,
            mock,
        })
    }

    /// Load from a properties file (`key = value`, `#` comments).
    pub fn load(path: impl AsRef<Path>, production: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let pairs = parse_properties(&text)?;
        Self::from_properties(
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            production,
        )
    }

    /// Whether the mock header double replaces real transport headers.
    pub fn mock_enabled(&self) -> bool {
        self.mock
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::from_properties(std::iter::empty(), false).expect("empty configuration is valid")
    }
}

/// Parse properties text into ordered `(key, value)` pairs.
///
/// Duplicate keys are preserved here; last-wins resolution happens in
/// [`GateConfig::from_properties`].
pub fn parse_properties(text: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or(ConfigError::MalformedLine { line: idx + 1 })?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

fn parse_bool(scalars: &HashMap<&str, &str>, key: &str) -> Result<Option<bool>, ConfigError> {
    match scalars.get(key) {
        None => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(value) if value.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(value) => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
