/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Runtime configuration.
//!
//! [`MazewireConfig::load`] looks for `mazewire/config.toml` in the XDG config
//! directories (`$XDG_CONFIG_HOME`, then `$XDG_CONFIG_DIRS`). Every field has a
//! default, so a file only needs the values it changes:
//!
//! ```toml
//! [timeouts]
//! query_ms = 2000
//!
//! [remote.limits]
//! max_connections = 10
//! ```
//!
//! A missing or unreadable file is logged and the defaults are used.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::remote::RemoteConfig;

/// Top-level configuration carried by every [`ActorRuntime`](crate::common::ActorRuntime).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MazewireConfig {
    /// Shutdown and query timeouts.
    pub timeouts: TimeoutConfig,
    /// Capacity limits.
    pub limits: LimitsConfig,
    /// Default values.
    pub defaults: DefaultsConfig,
    /// Listener and connection settings.
    pub remote: RemoteConfig,
}

/// Timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time one actor gets to stop during runtime shutdown.
    pub actor_shutdown_ms: u64,
    /// Time the whole runtime gets to shut down.
    pub system_shutdown_ms: u64,
    /// Default wait for query results, used by relays.
    pub query_ms: u64,
}

/// Capacity limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Inbox capacity of actors without a per-actor override.
    pub actor_inbox_capacity: usize,
}

/// Default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Display name of unnamed actors.
    pub actor_name: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            actor_shutdown_ms: 10_000,
            system_shutdown_ms: 30_000,
            query_ms: 5_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            actor_inbox_capacity: 255,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            actor_name: "actor".to_string(),
        }
    }
}

impl MazewireConfig {
    /// Time one actor gets to stop during runtime shutdown.
    pub const fn actor_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.actor_shutdown_ms)
    }

    /// Time the whole runtime gets to shut down.
    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_ms)
    }

    /// Default wait for query results.
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.query_ms)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or mistyped values.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads the configuration from `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(text) => match Self::from_toml_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Loads `mazewire/config.toml` from the XDG config directories.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("mazewire") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };
        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_files_keep_the_other_defaults() {
        let config = MazewireConfig::from_toml_str(
            r#"
            [timeouts]
            query_ms = 250

            [remote.timeouts]
            read_ms = 50
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.query_timeout(), Duration::from_millis(250));
        assert_eq!(config.timeouts.system_shutdown_ms, 30_000);
        assert_eq!(config.limits.actor_inbox_capacity, 255);
        assert_eq!(config.remote.timeouts.read, 50);
        assert_eq!(config.remote.limits.max_connections, 100);
    }

    #[test]
    fn unreadable_or_malformed_files_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[timeouts]\nquery_ms = \"soon\"").expect("write");
        let config = MazewireConfig::load_from(file.path());
        assert_eq!(config.timeouts.query_ms, 5_000);

        let missing = MazewireConfig::load_from(Path::new("/nonexistent/mazewire.toml"));
        assert_eq!(missing.defaults.actor_name, "actor");
    }
}
