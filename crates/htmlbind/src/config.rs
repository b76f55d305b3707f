//! Scan configuration and its resolution from the environment.

use serde::{Deserialize, Serialize};

/// Environment variable read by [`Config::from_env`].
pub const CONCURRENT_ENV: &str = "HTMLBIND_CONCURRENT";

/// Options that control how a destination is scanned.
///
/// A [`crate::Document`] carries a config; every selection taken from it
/// inherits that config, and a scan can override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process sibling fields on the rayon pool instead of one at a time.
    pub concurrent: bool,
}

impl Config {
    /// Set whether sibling fields are processed concurrently. Sequential by default.
    pub fn concurrent(mut self, allow: bool) -> Self {
        self.concurrent = allow;
        self
    }

    /// Resolve a config from `HTMLBIND_CONCURRENT`, falling back to defaults.
    pub fn from_env() -> Self {
        let concurrent = std::env::var(CONCURRENT_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        Self { concurrent }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
