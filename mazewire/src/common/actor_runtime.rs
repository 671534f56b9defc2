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

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use anyhow::bail;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::net::TcpStream;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actor::{ActorConfig, Idle, ManagedActor};
use crate::common::runtime_inner::RuntimeInner;
use crate::common::{ActorCell, ActorId, ActorRef, LocalRef, MazewireConfig, Relay, Reply};
use crate::common::remote::run_listener;
use crate::remote::{ListenerHandle, Mailbox, RemoteError};
use crate::traits::ActorRefInterface;

/// The running actor system.
///
/// Obtained from [`MazewireApp::launch_async`](crate::common::MazewireApp::launch_async).
/// It is the context object every part of the system resolves addresses
/// through: the table of live actors, the name table used for first contact
/// over the network, open client connections and running listeners.
///
/// Cloning is cheap and shares the same system.
#[derive(Debug, Clone)]
pub struct ActorRuntime(pub(crate) Arc<RuntimeInner>);

impl ActorRuntime {
    pub(crate) fn with_config(config: MazewireConfig) -> Self {
        Self(Arc::new(RuntimeInner::new(config)))
    }

    /// Creates an unnamed actor builder.
    ///
    /// The actor is not part of the runtime until it is started.
    pub fn new_actor<State>(&self) -> ManagedActor<Idle, State>
    where
        State: Default + Send + Debug + 'static,
    {
        self.new_actor_with_config(ActorConfig::new())
    }

    /// Creates an actor builder whose actor is registered under `name` when it starts.
    pub fn new_actor_with_name<State>(&self, name: impl Into<String>) -> ManagedActor<Idle, State>
    where
        State: Default + Send + Debug + 'static,
    {
        self.new_actor_with_config(ActorConfig::named(name))
    }

    /// Creates an actor builder from an explicit configuration.
    pub fn new_actor_with_config<State>(&self, config: ActorConfig) -> ManagedActor<Idle, State>
    where
        State: Default + Send + Debug + 'static,
    {
        ManagedActor::new(self, &config)
    }

    /// Starts a raw actor that forwards everything it receives to `destination`.
    ///
    /// Query results are awaited for `timeouts.query_ms`.
    #[instrument(skip(self), fields(to = %destination.address()))]
    pub async fn spawn_relay(&self, destination: ActorRef) -> ActorRef {
        let relay = Relay::new(destination, self.config().query_timeout());
        let mut actor = self.new_actor::<()>();
        actor.on_message(move |_actor, ctx| {
            let relay = relay.clone();
            let message = ctx.params().clone();
            let reply_to = ctx.reply_to().cloned();
            Reply::pending(async move { relay.forward(message, reply_to).await })
        });
        actor.start().await
    }

    /// The configuration the runtime was launched with.
    pub fn config(&self) -> &MazewireConfig {
        &self.0.config
    }

    /// Number of started actors that have not stopped.
    pub fn actor_count(&self) -> usize {
        self.0.actors.len()
    }

    /// Makes a local actor reachable by `name`, locally and from connected peers.
    ///
    /// A name registered twice points at the latest actor.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub fn register(&self, name: impl Into<String>, actor: &ActorRef) -> anyhow::Result<()> {
        let Some(id) = actor.id() else {
            bail!("only local actors can be registered by name");
        };
        let name = name.into();
        if let Some(previous) = self.0.names.insert(name.clone(), id) {
            if previous != id {
                warn!(%name, %previous, %id, "name re-registered");
            }
        }
        debug!(%name, %id, "registered");
        Ok(())
    }

    /// Removes a name. Returns the actor it pointed at.
    pub fn unregister(&self, name: &str) -> Option<ActorId> {
        self.0.names.remove(name).map(|(_, id)| id)
    }

    /// Finds a live local actor by registered name or by id.
    pub fn lookup(&self, address: &str) -> Option<ActorRef> {
        self.0.resolve_local(address).map(ActorRef::Local)
    }

    /// Binds `host:port` and routes incoming connections to local actors.
    ///
    /// Port 0 picks a free port; see [`ListenerHandle::local_addr`]. The runtime
    /// keeps a handle and stops the listener in [`shutdown_all`](Self::shutdown_all).
    ///
    /// # Errors
    ///
    /// [`RemoteError::Io`] if the address cannot be bound.
    #[instrument(skip(self))]
    pub async fn start_listener(&self, host: &str, port: u16) -> Result<ListenerHandle, RemoteError> {
        let handle = run_listener(
            host,
            port,
            self.downgrade(),
            self.0.names.clone(),
            self.config().remote.clone(),
            self.0.cancellation_token.child_token(),
        )
        .await?;
        self.0.listeners.insert(handle.local_addr(), handle.clone());
        Ok(handle)
    }

    /// A reference to the actor registered as `name` in the runtime at `host:port`.
    ///
    /// Connections are shared: every reference to the same `host:port` uses one
    /// [`Mailbox`] until it closes.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Timeout`] when the connection is not established within
    /// `remote.timeouts.connect_ms`, or the socket error.
    #[instrument(skip(self))]
    pub async fn actor_for(&self, name: &str, host: &str, port: u16) -> Result<ActorRef, RemoteError> {
        let key = format!("{host}:{port}");
        if let Some(mailbox) = self.open_connection(&key) {
            return Ok(ActorRef::Remote(mailbox.actor(name)));
        }

        // Concurrent callers for the same key wait here; the first one connects
        // and the rest find its mailbox.
        let gate = self.0.connecting.entry(key.clone()).or_default().clone();
        let _connecting = gate.lock().await;
        let mailbox = match self.open_connection(&key) {
            Some(mailbox) => mailbox,
            None => self.connect(key, host, port).await?,
        };
        Ok(ActorRef::Remote(mailbox.actor(name)))
    }

    fn open_connection(&self, key: &str) -> Option<Mailbox> {
        self.0
            .connections
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(Mailbox::is_alive)
    }

    async fn connect(&self, key: String, host: &str, port: u16) -> Result<Mailbox, RemoteError> {
        let config = &self.config().remote;
        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect((host, port)))
            .await
            .map_err(|_| RemoteError::Timeout)??;
        let mailbox = Mailbox::launch(stream, self.downgrade(), config, None)?;

        let runtime = self.downgrade();
        let local = mailbox.local_addr();
        let entry = key.clone();
        mailbox.set_close_hook(Box::new(move || {
            if let Some(inner) = runtime.upgrade() {
                inner
                    .connections
                    .remove_if(&entry, |_, open| open.local_addr() == local);
            }
        }));
        self.0.connections.insert(key, mailbox.clone());
        info!(peer = %mailbox.peer(), "connected");
        Ok(mailbox)
    }

    /// Stops listeners, client connections and actors, concurrently.
    ///
    /// Each actor gets `timeouts.actor_shutdown_ms`; the whole shutdown gets
    /// `timeouts.system_shutdown_ms`, after which every remaining actor is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Fails when the system-wide timeout expires.
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let listeners = drain(&self.0.listeners);
        let connections = drain(&self.0.connections);
        let actors = drain(&self.0.actors);
        let per_actor = self.config().actor_shutdown_timeout();
        trace!(
            listeners = listeners.len(),
            connections = connections.len(),
            actors = actors.len(),
            "shutting down"
        );

        let stop_listeners = join_all(listeners.iter().map(ListenerHandle::stop));
        let stop_connections = join_all(connections.iter().map(Mailbox::stop));
        let stop_actors = join_all(actors.into_iter().map(|actor| async move {
            let id = actor.id();
            let handle = ActorRef::Local(actor);
            match tokio::time::timeout(per_actor, handle.stop()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Error stopping actor {}: {:?}", id, e),
                Err(_) => error!(%id, ?per_actor, "actor did not stop in time"),
            }
        }));

        let timeout = self.config().system_shutdown_timeout();
        let everything = async {
            futures::join!(stop_listeners, stop_connections, stop_actors);
        };
        if tokio::time::timeout(timeout, everything).await.is_err() {
            error!(
                "System-wide shutdown timeout expired after {:?}. Forcefully cancelling remaining tasks.",
                timeout
            );
            self.0.cancellation_token.cancel();
            bail!("shutdown did not finish within {timeout:?}");
        }
        trace!("System shutdown complete.");
        Ok(())
    }

    pub(crate) fn admit(&self, cell: &Arc<ActorCell>) {
        self.0.actors.insert(cell.id, LocalRef::new(cell.clone()));
        if let Some(name) = &cell.name {
            if let Some(previous) = self.0.names.insert(name.clone(), cell.id) {
                warn!(%name, %previous, id = %cell.id, "name taken over by a new actor");
            }
        }
    }

    pub(crate) fn forget(&self, id: ActorId, name: Option<&str>) {
        self.0.actors.remove(&id);
        if let Some(name) = name {
            self.0.names.remove_if(name, |_, registered| *registered == id);
        }
    }

    pub(crate) fn local(&self, id: ActorId) -> Option<LocalRef> {
        self.0.actors.get(&id).map(|entry| entry.value().clone())
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Arc::downgrade(&self.0)
    }
}

fn drain<K: Eq + Hash + Clone, V>(table: &DashMap<K, V>) -> Vec<V> {
    let keys: Vec<K> = table.iter().map(|entry| entry.key().clone()).collect();
    keys.into_iter()
        .filter_map(|key| table.remove(&key).map(|(_, value)| value))
        .collect()
}
