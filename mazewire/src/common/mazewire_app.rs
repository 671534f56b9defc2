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

use tracing::trace;

use crate::common::{ActorRuntime, MazewireConfig};

/// Entry point for starting an actor system.
///
/// # Example
///
/// ```rust,ignore
/// use mazewire::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let runtime = MazewireApp::launch_async().await;
///     // Use runtime...
///     runtime.shutdown_all().await
/// }
/// ```
#[derive(Default, Debug, Clone)]
pub struct MazewireApp;

impl MazewireApp {
    /// Starts a runtime configured from `mazewire/config.toml` in the XDG
    /// config directories, or from defaults when there is none.
    pub async fn launch_async() -> ActorRuntime {
        trace!("Starting Mazewire system initialization");
        let config = MazewireConfig::load();
        Self::launch_with_config(config).await
    }

    /// Starts a runtime with an explicit configuration.
    pub async fn launch_with_config(config: MazewireConfig) -> ActorRuntime {
        trace!("Configuration loaded: {:?}", config);
        let runtime = ActorRuntime::with_config(config);
        trace!("Mazewire system initialization complete");
        runtime
    }
}
