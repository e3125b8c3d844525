//! # Router Configuration Module
//!
//! [`RouterConfig`] controls how request paths are normalized before matching and
//! how large a request body the router accepts.
//!
//! ## Environment Variables
//!
//! ### `CHAINR_STRICT_ROUTING`
//!
//! When `true`, `/foo` and `/foo/` are different paths. Default: `false`.
//!
//! ### `CHAINR_UNESCAPE_PATH`
//!
//! When `true`, every path segment is percent-decoded before matching, so route
//! parameters bind decoded values (`/users/j%C3%B6rg` binds `jörg`). Default: `false`.
//!
//! ### `CHAINR_BODY_LIMIT`
//!
//! Maximum accepted request body in bytes. Accepts decimal (`4194304`) or
//! hexadecimal (`0x400000`). Larger bodies are answered with
//! `413 Request Entity Too Large` before any handler runs. Default: 4 MiB.
//!
//! ## YAML
//!
//! The same settings can be loaded from a config file:
//!
//! ```yaml
//! strict_routing: false
//! unescape_path: true
//! body_limit: 1048576
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chainrouter::config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("Body limit: {} bytes", config.body_limit);
//! ```

use serde::Deserialize;
use std::env;

/// Default request body limit (4 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Path matching and body-size settings for a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Treat a trailing slash as significant
    pub strict_routing: bool,
    /// Percent-decode path segments before matching
    pub unescape_path: bool,
    /// Maximum request body size in bytes
    pub body_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strict_routing: false,
            unescape_path: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strict_routing: env_flag("CHAINR_STRICT_ROUTING").unwrap_or(defaults.strict_routing),
            unescape_path: env_flag("CHAINR_UNESCAPE_PATH").unwrap_or(defaults.unescape_path),
            body_limit: env::var("CHAINR_BODY_LIMIT")
                .ok()
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.body_limit),
        }
    }

    /// Parse configuration from a YAML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML or a value has the wrong type.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
