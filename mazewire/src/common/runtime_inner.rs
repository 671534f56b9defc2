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

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::common::{ActorId, LocalRef, MazewireConfig};
use crate::remote::{ListenerHandle, Mailbox};

/// Shared state behind an [`ActorRuntime`](crate::common::ActorRuntime).
///
/// Mailboxes hold it weakly, so dropping the last runtime handle releases it
/// even while connections are still open.
#[derive(Debug, Default)]
pub(crate) struct RuntimeInner {
    /// Every started actor that has not stopped yet.
    pub(crate) actors: DashMap<ActorId, LocalRef>,

    /// Symbolic names, shared with every listener for first-contact routing.
    pub(crate) names: Arc<DashMap<String, ActorId>>,

    /// Client connections opened by `actor_for`, keyed by `host:port`.
    pub(crate) connections: DashMap<String, Mailbox>,

    /// One gate per `host:port`; held while a client connection is opened.
    pub(crate) connecting: DashMap<String, Arc<Mutex<()>>>,

    /// Running listeners, keyed by bound address.
    pub(crate) listeners: DashMap<SocketAddr, ListenerHandle>,

    /// Parent of every actor's stop token.
    pub(crate) cancellation_token: CancellationToken,

    pub(crate) config: MazewireConfig,
}

impl RuntimeInner {
    pub(crate) fn new(config: MazewireConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Finds a local actor by registered name, then by id.
    pub(crate) fn resolve_local(&self, address: &str) -> Option<LocalRef> {
        let id = match self.names.get(address) {
            Some(entry) => *entry.value(),
            None => address.parse::<ActorId>().ok()?,
        };
        self.actors.get(&id).map(|entry| entry.value().clone())
    }
}
