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

//! Actor references.
//!
//! An [`ActorRef`] is either a [`LocalRef`] (a handle to an actor in this
//! runtime) or a [`RemoteRef`] (a target name on the far side of a connection).
//! Both speak [`ActorRefInterface`]; only local references can control the
//! actor's lifecycle.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace, warn};

use crate::actor::{ActorState, ExitSignal};
use crate::common::{ActorId, Request, RequestRegistry};
use crate::message::{Envelope, Inbound, Message, MessageError, Params, RequestId, SystemSignal};
use crate::remote::RemoteRef;
use crate::traits::ActorRefInterface;

/// Shared state of one actor, owned jointly by its processing task and every
/// [`LocalRef`] to it.
pub(crate) struct ActorCell {
    pub(crate) id: ActorId,
    pub(crate) name: Option<String>,
    pub(crate) inbox: mpsc::Sender<Inbound>,
    /// Queries this actor is the target of; local replies are resolved here.
    pub(crate) requests: RequestRegistry,
    state: Mutex<ActorState>,
    pub(crate) paused: watch::Sender<bool>,
    links: Mutex<HashSet<ActorId>>,
    trap_exit: AtomicBool,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) tracker: TaskTracker,
}

impl ActorCell {
    pub(crate) fn new(
        id: ActorId,
        name: Option<String>,
        inbox: mpsc::Sender<Inbound>,
        trap_exit: bool,
        cancellation_token: CancellationToken,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            id,
            name,
            inbox,
            requests: RequestRegistry::new(),
            state: Mutex::new(ActorState::Created),
            paused,
            links: Mutex::new(HashSet::new()),
            trap_exit: AtomicBool::new(trap_exit),
            cancellation_token,
            tracker: TaskTracker::new(),
        }
    }

    pub(crate) fn state(&self) -> ActorState {
        *self.state.lock()
    }

    /// Moves to `next` unless the actor is already terminating.
    pub(crate) fn set_state(&self, next: ActorState) -> bool {
        let mut state = self.state.lock();
        if *state == next || !state.can_become(next) {
            return false;
        }
        trace!(actor = %self.id, from = %*state, to = %next, "state change");
        *state = next;
        true
    }

    pub(crate) fn traps_exit(&self) -> bool {
        self.trap_exit.load(Ordering::Acquire)
    }

    pub(crate) fn set_trap_exit(&self, enabled: bool) {
        self.trap_exit.store(enabled, Ordering::Release);
    }

    pub(crate) fn link(&self, other: ActorId) {
        self.links.lock().insert(other);
    }

    pub(crate) fn unlink(&self, other: ActorId) -> bool {
        self.links.lock().remove(&other)
    }

    pub(crate) fn links(&self) -> Vec<ActorId> {
        self.links.lock().iter().copied().collect()
    }

    pub(crate) fn take_links(&self) -> Vec<ActorId> {
        self.links.lock().drain().collect()
    }

    pub(crate) fn request_stop(&self) {
        if self.state() == ActorState::Created {
            // never scheduled; nothing to wait for
            self.tracker.close();
        }
        self.set_state(ActorState::Stopping);
        self.cancellation_token.cancel();
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Handle to an actor living in this runtime.
#[derive(Clone)]
pub struct LocalRef {
    pub(crate) cell: Arc<ActorCell>,
    sender: Option<Box<ActorRef>>,
}

assert_impl_all!(LocalRef: Send, Sync, Clone);

impl LocalRef {
    pub(crate) const fn new(cell: Arc<ActorCell>) -> Self {
        Self { cell, sender: None }
    }

    /// The actor's id.
    pub fn id(&self) -> ActorId {
        self.cell.id
    }

    /// The name the actor was configured with.
    pub fn name(&self) -> Option<&str> {
        self.cell.name.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActorState {
        self.cell.state()
    }

    /// Ids of the actors currently linked to this one.
    pub fn links(&self) -> Vec<ActorId> {
        self.cell.links()
    }

    /// Outstanding queries addressed to this actor.
    pub fn pending_queries(&self) -> usize {
        self.cell.requests.pending()
    }

    fn own_ref(&self) -> ActorRef {
        ActorRef::Local(Self::new(self.cell.clone()))
    }

    fn sender_ref(&self) -> Option<ActorRef> {
        self.sender.as_deref().cloned()
    }

    pub(crate) async fn deliver(&self, envelope: Envelope) -> Result<(), MessageError> {
        self.cell
            .inbox
            .send(Inbound::Message(envelope))
            .await
            .map_err(|_| MessageError::ActorStopped(self.id().to_string()))
    }

    pub(crate) async fn exit(&self, signal: ExitSignal) -> bool {
        trace!(to = %self.id(), from = %signal.from, reason = %signal.reason, "delivering exit signal");
        self.cell.inbox.send(Inbound::Exit(signal)).await.is_ok()
    }

    async fn send_query(&self, message: Message, request: Request) -> Request {
        let id = request.id();
        let envelope = Envelope::new(message)
            .with_reply_to(Some(self.own_ref()))
            .with_sender(self.sender_ref());
        if let Err(error) = self.deliver(envelope).await {
            debug!(actor = %self.id(), id, "query to a stopped actor");
            self.cell
                .requests
                .resolve(id, Message::error(error.to_value(), Some(id)));
        }
        request
    }
}

impl fmt::Debug for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRef")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActorRefInterface for LocalRef {
    fn address(&self) -> String {
        self.id().to_string()
    }

    fn is_alive(&self) -> bool {
        self.state() != ActorState::Stopped && !self.cell.inbox.is_closed()
    }

    #[instrument(skip(self, params), fields(actor = %self.id()))]
    async fn notify(&self, method: &str, params: Params) {
        let envelope =
            Envelope::new(Message::notification(method, params)).with_sender(self.sender_ref());
        if self.deliver(envelope).await.is_err() {
            warn!(method, "actor has stopped; notification dropped");
        }
    }

    #[instrument(skip(self, params), fields(actor = %self.id()))]
    async fn query(&self, method: &str, params: Params) -> Request {
        let request = self.cell.requests.register();
        let message = Message::query(method, params, request.id());
        self.send_query(message, request).await
    }

    async fn query_with_id(&self, method: &str, params: Params, id: RequestId) -> Request {
        match self.cell.requests.register_with_id(id) {
            Ok(request) => {
                self.send_query(Message::query(method, params, id), request)
                    .await
            }
            Err(error) => Request::failed(id, &error),
        }
    }

    async fn put(&self, message: Message) {
        if let Some(id) = message.reply_id() {
            // Queries to this actor are registered here, so a reply resolves
            // at once instead of queueing behind the handler that sent it.
            trace!(actor = %self.id(), id, "resolving local reply");
            self.cell.requests.resolve(id, message);
            return;
        }
        let sender = self.sender_ref();
        let envelope = Envelope::new(message)
            .with_reply_to(sender.clone())
            .with_sender(sender);
        if let Err(error) = self.deliver(envelope).await {
            warn!(actor = %self.id(), %error, "message dropped");
        }
    }
}

/// A reference to an actor, local or remote.
///
/// Equality and hashing go by [`address`](ActorRefInterface::address).
#[derive(Clone, Debug)]
pub enum ActorRef {
    /// An actor in this runtime.
    Local(LocalRef),
    /// A named actor on the far side of a connection.
    Remote(RemoteRef),
}

assert_impl_all!(ActorRef: Send, Sync, Clone);

impl ActorRef {
    /// The local actor id, `None` for remote references.
    pub fn id(&self) -> Option<ActorId> {
        self.as_local().map(LocalRef::id)
    }

    /// The local handle, if this reference is local.
    pub const fn as_local(&self) -> Option<&LocalRef> {
        match self {
            Self::Local(local) => Some(local),
            Self::Remote(_) => None,
        }
    }

    /// The remote handle, if this reference is remote.
    pub const fn as_remote(&self) -> Option<&RemoteRef> {
        match self {
            Self::Remote(remote) => Some(remote),
            Self::Local(_) => None,
        }
    }

    /// `true` for actors in this runtime.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Lifecycle state of a local actor.
    pub fn state(&self) -> Option<ActorState> {
        self.as_local().map(LocalRef::state)
    }

    /// A copy of this reference whose messages carry `sender` as their origin.
    #[must_use]
    pub fn with_sender(&self, sender: &Self) -> Self {
        match self {
            Self::Local(local) => Self::Local(LocalRef {
                cell: local.cell.clone(),
                sender: Some(Box::new(sender.without_sender())),
            }),
            Self::Remote(remote) => Self::Remote(remote.with_sender(sender.id())),
        }
    }

    /// A copy of this reference that carries no sender.
    #[must_use]
    pub fn without_sender(&self) -> Self {
        match self {
            Self::Local(local) => Self::Local(LocalRef::new(local.cell.clone())),
            Self::Remote(remote) => Self::Remote(remote.with_sender(None)),
        }
    }

    fn local(&self, operation: &str) -> anyhow::Result<&LocalRef> {
        match self {
            Self::Local(local) => Ok(local),
            Self::Remote(remote) => {
                bail!("{operation} is not available for the remote actor {}", remote.address())
            }
        }
    }

    /// Stops the actor and waits until it reaches `Stopped`.
    ///
    /// The message being processed completes; everything still queued is drained
    /// (pending queries are answered with `actor_stopped`).
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    #[instrument(skip(self), fields(actor = %self.address()))]
    pub async fn stop(&self) -> anyhow::Result<()> {
        let local = self.local("stop")?;
        local.cell.request_stop();
        local.cell.tracker.wait().await;
        trace!("actor stopped");
        Ok(())
    }

    /// Stops the actor after it has processed everything queued before this call.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub async fn terminate(&self) -> anyhow::Result<()> {
        let local = self.local("terminate")?;
        if local.state() == ActorState::Created {
            local.cell.request_stop();
        } else {
            let _ = local
                .cell
                .inbox
                .send(Inbound::Signal(SystemSignal::Terminate))
                .await;
        }
        local.cell.tracker.wait().await;
        Ok(())
    }

    /// Pauses message processing. Messages keep queueing.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub fn suspend(&self) -> anyhow::Result<()> {
        self.local("suspend")?.cell.paused.send_replace(true);
        Ok(())
    }

    /// Resumes a suspended actor.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub fn resume(&self) -> anyhow::Result<()> {
        self.local("resume")?.cell.paused.send_replace(false);
        Ok(())
    }

    /// Turns exit trapping on or off.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub fn set_trap_exit(&self, enabled: bool) -> anyhow::Result<()> {
        self.local("trap_exit")?.cell.set_trap_exit(enabled);
        Ok(())
    }

    /// Links two actors: when either stops, the other receives an exit signal.
    ///
    /// # Errors
    ///
    /// Fails for remote references, self-links, and actors already stopping.
    pub fn link(&self, other: &Self) -> anyhow::Result<()> {
        let this = self.local("link")?;
        let that = other.local("link")?;
        if this.id() == that.id() {
            bail!("actor {} cannot link to itself", this.id());
        }
        for end in [this, that] {
            if end.state().is_terminating() {
                bail!("actor {} is {} and cannot be linked", end.id(), end.state());
            }
        }
        this.cell.link(that.id());
        that.cell.link(this.id());
        trace!(a = %this.id(), b = %that.id(), "linked");
        Ok(())
    }

    /// Removes a link in both directions.
    ///
    /// # Errors
    ///
    /// Fails for remote references.
    pub fn unlink(&self, other: &Self) -> anyhow::Result<()> {
        let this = self.local("unlink")?;
        let that = other.local("unlink")?;
        this.cell.unlink(that.id());
        that.cell.unlink(this.id());
        Ok(())
    }
}

#[async_trait]
impl ActorRefInterface for ActorRef {
    fn address(&self) -> String {
        match self {
            Self::Local(local) => local.address(),
            Self::Remote(remote) => remote.address(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Local(local) => local.is_alive(),
            Self::Remote(remote) => remote.is_alive(),
        }
    }

    async fn notify(&self, method: &str, params: Params) {
        match self {
            Self::Local(local) => local.notify(method, params).await,
            Self::Remote(remote) => remote.notify(method, params).await,
        }
    }

    async fn query(&self, method: &str, params: Params) -> Request {
        match self {
            Self::Local(local) => local.query(method, params).await,
            Self::Remote(remote) => remote.query(method, params).await,
        }
    }

    async fn query_with_id(&self, method: &str, params: Params, id: RequestId) -> Request {
        match self {
            Self::Local(local) => local.query_with_id(method, params, id).await,
            Self::Remote(remote) => remote.query_with_id(method, params, id).await,
        }
    }

    async fn put(&self, message: Message) {
        match self {
            Self::Local(local) => local.put(message).await,
            Self::Remote(remote) => remote.put(message).await,
        }
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl From<LocalRef> for ActorRef {
    fn from(local: LocalRef) -> Self {
        Self::Local(local)
    }
}

impl From<RemoteRef> for ActorRef {
    fn from(remote: RemoteRef) -> Self {
        Self::Remote(remote)
    }
}
