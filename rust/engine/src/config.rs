// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base URL of the annotation backend.
    pub api_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum annotation title length, in characters.
    pub title_max_len: usize,
    /// Maximum annotation description length, in characters.
    pub description_max_len: usize,
    /// Offset along +X of marker count labels.
    pub label_offset: f64,
    /// Distance from the camera to the stored viewpoint target.
    pub view_distance: f64,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let builtin = Self::builtin();
        Self {
            api_url: std::env::var("BIMTODO_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(builtin.api_url),
            request_timeout_secs: env_or(
                "BIMTODO_REQUEST_TIMEOUT_SECS",
                builtin.request_timeout_secs,
            ),
            title_max_len: env_or("BIMTODO_TITLE_MAX_LEN", builtin.title_max_len),
            description_max_len: env_or("BIMTODO_DESCRIPTION_MAX_LEN", builtin.description_max_len),
            label_offset: env_or("BIMTODO_LABEL_OFFSET", builtin.label_offset),
            view_distance: env_or("BIMTODO_VIEW_DISTANCE", builtin.view_distance),
        }
    }

    /// Hard-coded defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            request_timeout_secs: 30,
            title_max_len: 120,
            description_max_len: 2000,
            label_offset: 0.1,
            view_distance: 10.0,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults() {
        let config = EngineConfig::builtin();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.title_max_len, 120);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unparsable_values_fall_back() {
        assert_eq!(env_or("BIMTODO_TEST_UNSET_VARIABLE", 7usize), 7);
    }
}
