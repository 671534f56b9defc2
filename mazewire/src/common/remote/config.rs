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

//! Listener and connection settings, the `[remote]` section of `config.toml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for listeners and the connections they accept or open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Connection and frame limits.
    pub limits: RemoteLimitsConfig,
    /// Socket timeouts.
    pub timeouts: RemoteTimeoutsConfig,
    /// Listener shutdown behaviour.
    pub shutdown: ShutdownConfig,
    /// TCP socket options.
    pub tcp: TcpConfig,
}

/// Connection and frame limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLimitsConfig {
    /// Concurrent connections one listener accepts; extra connections are closed.
    pub max_connections: usize,
    /// Largest frame accepted, in bytes. Unlimited when unset.
    pub max_frame_size: Option<usize>,
}

/// Socket timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteTimeoutsConfig {
    /// Poll interval of the inbox worker. An idle connection is not an error.
    #[serde(rename = "read_ms")]
    pub read: u64,
    /// Longest time one frame may take to write before the connection is dropped.
    #[serde(rename = "write_ms")]
    pub write: u64,
    /// Longest time to wait while connecting to a peer.
    #[serde(rename = "connect_ms")]
    pub connect: u64,
}

/// Listener shutdown behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time open connections get to wind down when a listener stops.
    #[serde(rename = "drain_ms")]
    pub drain: u64,
}

/// TCP socket options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm on every connection.
    pub nodelay: bool,
}

impl Default for RemoteLimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_frame_size: None,
        }
    }
}

impl Default for RemoteTimeoutsConfig {
    fn default() -> Self {
        Self {
            read: 500,
            write: 30_000,
            connect: 5_000,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { drain: 5_000 }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self { nodelay: true }
    }
}

impl RemoteConfig {
    /// Poll interval of the inbox worker.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.read)
    }

    /// Per-frame write timeout.
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.write)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect)
    }

    /// Drain time for connections of a stopping listener.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown.drain)
    }
}
