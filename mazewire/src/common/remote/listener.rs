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

//! TCP listener that turns every accepted connection into a [`Mailbox`].
//!
//! The listener owns a [`RemoteRegistry`]: the runtime's name table (shared,
//! consulted when an envelope names its destination) and the table of open
//! peer connections. Stopping the listener stops every connection it accepted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use super::{Mailbox, RemoteConfig, RemoteError};
use crate::common::runtime_inner::RuntimeInner;
use crate::common::ActorId;

/// Counters for one listener.
#[derive(Debug, Default)]
pub struct ListenerStats {
    /// Connections accepted since the listener started.
    pub connections_accepted: AtomicUsize,
    /// Connections currently open.
    pub connections_active: AtomicUsize,
    /// Connections closed right away because the limit was reached.
    pub connections_rejected: AtomicUsize,
    /// Frames read from all connections.
    pub frames_received: AtomicUsize,
    /// Frames delivered to an actor or a pending query.
    pub frames_routed: AtomicUsize,
    /// Accept failures, malformed frames and unroutable queries.
    pub errors: AtomicUsize,
}

impl ListenerStats {
    /// Connections accepted since the listener started.
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    /// Connections currently open.
    #[must_use]
    pub fn connections_active(&self) -> usize {
        self.connections_active.load(Ordering::Relaxed)
    }

    /// Connections turned away at the limit.
    #[must_use]
    pub fn connections_rejected(&self) -> usize {
        self.connections_rejected.load(Ordering::Relaxed)
    }

    /// Frames read from all connections.
    #[must_use]
    pub fn frames_received(&self) -> usize {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Frames delivered.
    #[must_use]
    pub fn frames_routed(&self) -> usize {
        self.frames_routed.load(Ordering::Relaxed)
    }

    /// Errors of any kind.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub(crate) fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_routed(&self) {
        self.frames_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Name table and open connections of one listener.
#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    names: Arc<DashMap<String, ActorId>>,
    peers: Arc<DashMap<u64, Mailbox>>,
    next_peer: Arc<AtomicU64>,
}

impl RemoteRegistry {
    pub(crate) fn new(names: Arc<DashMap<String, ActorId>>) -> Self {
        Self {
            names,
            peers: Arc::new(DashMap::new()),
            next_peer: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The actor registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).map(|entry| *entry.value())
    }

    /// Registered names.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Open connections.
    pub fn peers(&self) -> Vec<Mailbox> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of open connections.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn admit(&self, mailbox: &Mailbox) -> u64 {
        let key = self.next_peer.fetch_add(1, Ordering::Relaxed);
        self.peers.insert(key, mailbox.clone());
        key
    }

    fn take_peers(&self) -> Vec<Mailbox> {
        let keys: Vec<u64> = self.peers.iter().map(|entry| *entry.key()).collect();
        keys.into_iter()
            .filter_map(|key| self.peers.remove(&key).map(|(_, mailbox)| mailbox))
            .collect()
    }
}

/// Handle to a running listener.
///
/// Clones control the same listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stats: Arc<ListenerStats>,
    registry: RemoteRegistry,
    cancellation_token: CancellationToken,
    tracker: TaskTracker,
    drain: Duration,
}

impl ListenerHandle {
    /// The bound address; with port 0 this carries the port actually assigned.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Counters.
    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    /// Name table and open connections.
    pub const fn registry(&self) -> &RemoteRegistry {
        &self.registry
    }

    /// `true` until [`stop`](Self::stop) is called.
    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }

    /// Stops accepting, then stops every open connection.
    ///
    /// Each connection gets the configured drain time; the ones that exceed it
    /// are reported together and abandoned.
    #[instrument(skip(self), fields(addr = %self.local_addr))]
    pub async fn stop(&self) {
        self.cancellation_token.cancel();
        self.tracker.wait().await;

        let drain = self.drain;
        let stops = self.registry.take_peers().into_iter().map(|mailbox| async move {
            let peer = mailbox.peer();
            tokio::time::timeout(drain, mailbox.stop()).await.err().map(|_| peer)
        });
        let stuck: Vec<SocketAddr> = join_all(stops).await.into_iter().flatten().collect();
        if stuck.is_empty() {
            info!("listener stopped");
        } else {
            warn!(
                count = stuck.len(),
                peers = ?stuck,
                ?drain,
                "connections did not close within the drain time"
            );
        }
    }
}

/// Binds `host:port` and starts accepting connections.
pub(crate) async fn run(
    host: &str,
    port: u16,
    runtime: Weak<RuntimeInner>,
    names: Arc<DashMap<String, ActorId>>,
    config: RemoteConfig,
    cancellation_token: CancellationToken,
) -> Result<ListenerHandle, RemoteError> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| RemoteError::Io(format!("Failed to bind {host}:{port}: {e}")))?;
    let local_addr = listener.local_addr()?;
    info!("listener started on: {local_addr}");

    let stats = Arc::new(ListenerStats::default());
    let registry = RemoteRegistry::new(names);
    let tracker = TaskTracker::new();
    let drain = config.drain_timeout();
    let connections = Arc::new(Semaphore::new(config.limits.max_connections));

    tracker.spawn(accept_loop(
        listener,
        runtime,
        config,
        registry.clone(),
        connections,
        stats.clone(),
        cancellation_token.clone(),
    ));
    tracker.close();

    Ok(ListenerHandle {
        local_addr,
        stats,
        registry,
        cancellation_token,
        tracker,
        drain,
    })
}

async fn accept_loop(
    listener: TcpListener,
    runtime: Weak<RuntimeInner>,
    config: RemoteConfig,
    registry: RemoteRegistry,
    connections: Arc<Semaphore>,
    stats: Arc<ListenerStats>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancellation_token.cancelled() => {
                debug!("listener received shutdown signal");
                break;
            }

            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        stats.record_error();
                        continue;
                    }
                };
                let Ok(permit) = connections.clone().try_acquire_owned() else {
                    warn!(%addr, "maximum concurrent connections reached, rejecting connection");
                    stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                    continue;
                };
                let mailbox = match Mailbox::launch(stream, runtime.clone(), &config, Some(stats.clone())) {
                    Ok(mailbox) => mailbox,
                    Err(e) => {
                        error!(%addr, "Failed to set up connection: {}", e);
                        stats.record_error();
                        continue;
                    }
                };

                stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                stats.connections_active.fetch_add(1, Ordering::Relaxed);
                let key = registry.admit(&mailbox);
                trace!(%addr, key, "accepted connection");

                let peers = Arc::downgrade(&registry.peers);
                let counters = stats.clone();
                mailbox.set_close_hook(Box::new(move || {
                    if let Some(peers) = peers.upgrade() {
                        peers.remove(&key);
                    }
                    counters.connections_active.fetch_sub(1, Ordering::Relaxed);
                    drop(permit);
                }));
            }
        }
    }
}
