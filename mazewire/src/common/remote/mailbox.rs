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

//! One connection and the two workers that bridge it to local actors.
//!
//! The inbox worker reads envelopes off the socket and routes them: replies to
//! queries sent through this connection resolve in the mailbox's own
//! [`RequestRegistry`], everything else goes to the local actor named by the
//! envelope's `actor` field, with a [`RemoteRef`] back to the sender attached
//! for replies. The outbox worker writes queued envelopes in order until it
//! dequeues the stop sentinel.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use super::listener::ListenerStats;
use super::wire::{Connection, FrameReader, FrameWriter};
use super::{RemoteConfig, RemoteError, RemoteRef, WireEnvelope};
use crate::actor::{ExitReason, ExitSignal};
use crate::common::runtime_inner::RuntimeInner;
use crate::common::{ActorRef, ActorRuntime, RequestRegistry};
use crate::message::{Envelope, Message, MessageError};
use crate::traits::ActorRefInterface;

pub(crate) type CloseHook = Box<dyn FnOnce() + Send>;

#[derive(Debug)]
enum Outgoing {
    Frame(WireEnvelope),
    Stop,
}

struct MailboxInner {
    peer: SocketAddr,
    local: SocketAddr,
    outbox: mpsc::UnboundedSender<Outgoing>,
    requests: RequestRegistry,
    runtime: Weak<RuntimeInner>,
    alive: AtomicBool,
    owner: Mutex<Option<ActorRef>>,
    on_close: Mutex<Option<CloseHook>>,
    cancellation_token: CancellationToken,
    tracker: TaskTracker,
    stats: Option<Arc<ListenerStats>>,
}

/// A live connection to a peer runtime.
///
/// Cloning shares the connection. It stays open until the peer disconnects or
/// [`stop`](Self::stop) is called; dropping every clone does not close it.
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<MailboxInner>,
}

assert_impl_all!(Mailbox: Send, Sync, Clone);

impl Mailbox {
    /// Takes over a connected stream and starts its workers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// The socket error if the stream's addresses cannot be read or its options
    /// cannot be set.
    pub fn start(
        stream: TcpStream,
        runtime: &ActorRuntime,
        config: &RemoteConfig,
    ) -> Result<Self, RemoteError> {
        Self::launch(stream, runtime.downgrade(), config, None)
    }

    #[instrument(skip_all)]
    pub(crate) fn launch(
        stream: TcpStream,
        runtime: Weak<RuntimeInner>,
        config: &RemoteConfig,
        stats: Option<Arc<ListenerStats>>,
    ) -> Result<Self, RemoteError> {
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        stream.set_nodelay(config.tcp.nodelay)?;
        let (reader, writer) = Connection::from_tcp(stream)
            .with_max_frame_size(config.limits.max_frame_size)
            .into_split();

        let (outbox, queue) = mpsc::unbounded_channel();
        let mailbox = Self {
            inner: Arc::new(MailboxInner {
                peer,
                local,
                outbox,
                requests: RequestRegistry::new(),
                runtime,
                alive: AtomicBool::new(true),
                owner: Mutex::new(None),
                on_close: Mutex::new(None),
                cancellation_token: CancellationToken::new(),
                tracker: TaskTracker::new(),
                stats,
            }),
        };

        let tracker = &mailbox.inner.tracker;
        tracker.spawn(inbox_worker(mailbox.clone(), reader, config.read_timeout()));
        tracker.spawn(outbox_worker(
            mailbox.clone(),
            writer,
            queue,
            config.write_timeout(),
        ));
        tracker.close();
        info!(%peer, %local, "connection open");
        Ok(mailbox)
    }

    /// Correlation table for queries sent through this connection.
    pub fn requests(&self) -> &RequestRegistry {
        &self.inner.requests
    }

    /// Address of the remote end.
    pub fn peer(&self) -> SocketAddr {
        self.inner.peer
    }

    /// Address of the local end.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local
    }

    /// `false` once the connection has been torn down.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Sets the actor that receives an exit signal when the connection is lost.
    pub fn set_owner(&self, owner: ActorRef) {
        *self.inner.owner.lock() = Some(owner);
    }

    /// A reference to `target` on the far side of this connection.
    pub fn actor(&self, target: impl Into<String>) -> RemoteRef {
        RemoteRef::new(self.clone(), Some(target.into()))
    }

    /// Runs `hook` once when the connection closes, or right away if it already has.
    pub(crate) fn set_close_hook(&self, hook: CloseHook) {
        let mut slot = self.inner.on_close.lock();
        if self.is_alive() {
            *slot = Some(hook);
            return;
        }
        drop(slot);
        hook();
    }

    /// Queues an envelope for the outbox worker.
    pub(crate) fn push(&self, envelope: WireEnvelope) -> Result<(), RemoteError> {
        if !self.is_alive() {
            return Err(RemoteError::ConnectionClosed);
        }
        self.inner
            .outbox
            .send(Outgoing::Frame(envelope))
            .map_err(|_| RemoteError::ConnectionClosed)
    }

    /// Closes the connection and waits for both workers to finish.
    ///
    /// Frames queued before the call are still written. Pending queries resolve
    /// with a `connection_closed` error.
    #[instrument(skip(self), fields(peer = %self.peer()))]
    pub async fn stop(&self) {
        self.shutdown(ExitReason::Normal).await;
        self.inner.tracker.wait().await;
        trace!("mailbox stopped");
    }

    async fn shutdown(&self, reason: ExitReason) {
        if !self.inner.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        let peer = self.peer();
        // The sentinel goes in first so the outbox worker wakes up and exits.
        let _ = self.inner.outbox.send(Outgoing::Stop);
        self.inner.cancellation_token.cancel();
        self.inner
            .requests
            .fail_all(&MessageError::ConnectionClosed(peer.to_string()));

        let hook = self.inner.on_close.lock().take();
        if let Some(hook) = hook {
            hook();
        }

        let owner = self.inner.owner.lock().take();
        if !reason.is_normal() {
            if let Some(local) = owner.as_ref().and_then(ActorRef::as_local) {
                local
                    .exit(ExitSignal::new(peer.to_string(), reason.clone()))
                    .await;
            }
        }
        info!(%peer, %reason, "connection closed");
    }

    fn record(&self, counter: impl FnOnce(&ListenerStats)) {
        if let Some(stats) = &self.inner.stats {
            counter(stats);
        }
    }

    /// Sends an uncorrelated error frame.
    fn reject(&self, error: &MessageError) {
        self.record(ListenerStats::record_error);
        let frame = WireEnvelope::new(None, Message::error(error.to_value(), None));
        if let Err(e) = self.push(frame) {
            debug!(peer = %self.peer(), %e, "could not report protocol error");
        }
    }

    async fn route(&self, envelope: WireEnvelope) {
        let WireEnvelope {
            actor,
            message,
            sender,
        } = envelope;

        if let Some(id) = message.reply_id() {
            if self.inner.requests.contains(id) {
                self.inner.requests.resolve(id, message);
                self.record(ListenerStats::record_routed);
                return;
            }
        }

        let reply_to = RemoteRef::new(self.clone(), sender.clone());
        let target = actor.as_deref().and_then(|address| {
            self.inner
                .runtime
                .upgrade()
                .and_then(|runtime| runtime.resolve_local(address))
        });

        let Some(target) = target else {
            let address = actor.unwrap_or_default();
            match &message {
                Message::Query { id, method, .. } => {
                    debug!(peer = %self.peer(), %address, method, "query for unknown actor");
                    self.record(ListenerStats::record_error);
                    let error = MessageError::ActorNotFound(address);
                    let _ = self.push(WireEnvelope::new(
                        sender,
                        Message::error(error.to_value(), Some(*id)),
                    ));
                }
                Message::Error { error, id: None } => {
                    warn!(peer = %self.peer(), %error, "peer reported an error");
                }
                Message::Notification { method, .. } => {
                    warn!(peer = %self.peer(), %address, method, "no such actor; notification dropped");
                }
                reply => {
                    debug!(peer = %self.peer(), id = ?reply.id(), "stale reply dropped");
                }
            }
            return;
        };

        trace!(peer = %self.peer(), to = %target.id(), kind = message.kind(), "routing");
        if message.is_reply() {
            // A reply to a query the target sent through some other path.
            target.put(message).await;
            self.record(ListenerStats::record_routed);
            return;
        }

        let query_id = match &message {
            Message::Query { id, .. } => Some(*id),
            _ => None,
        };
        let reply_ref = ActorRef::Remote(reply_to);
        let envelope = Envelope::new(message)
            .with_reply_to(Some(reply_ref.clone()))
            .with_sender(sender.is_some().then_some(reply_ref));
        match target.deliver(envelope).await {
            Ok(()) => self.record(ListenerStats::record_routed),
            Err(error) => {
                debug!(peer = %self.peer(), %error, "target stopped before delivery");
                if let Some(id) = query_id {
                    let _ = self.push(WireEnvelope::new(
                        sender,
                        Message::error(error.to_value(), Some(id)),
                    ));
                }
            }
        }
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("peer", &self.inner.peer)
            .field("local", &self.inner.local)
            .field("alive", &self.is_alive())
            .field("pending", &self.inner.requests.pending())
            .finish_non_exhaustive()
    }
}

async fn inbox_worker(mailbox: Mailbox, mut reader: FrameReader<OwnedReadHalf>, poll: Duration) {
    let cancel = mailbox.inner.cancellation_token.clone();
    let peer = mailbox.peer();
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = tokio::time::timeout(poll, reader.read()) => frame,
        };
        let value = match frame {
            // Idle; check for a stop request and read again.
            Err(_elapsed) => continue,
            Ok(Ok(value)) => value,
            Ok(Err(RemoteError::Protocol(reason))) => {
                warn!(%peer, %reason, "malformed frame");
                mailbox.reject(&MessageError::Malformed(reason));
                continue;
            }
            Ok(Err(error)) => {
                if error == RemoteError::DeadConnection {
                    debug!(%peer, "peer disconnected");
                } else {
                    error!(%peer, %error, "connection failed");
                    mailbox.record(ListenerStats::record_error);
                }
                mailbox
                    .shutdown(ExitReason::ConnectionLost(peer.to_string()))
                    .await;
                break;
            }
        };
        mailbox.record(ListenerStats::record_received);
        match WireEnvelope::from_value(&value) {
            Ok(envelope) => mailbox.route(envelope).await,
            Err(error) => {
                warn!(%peer, %error, "unrecognized envelope");
                mailbox.reject(&error);
            }
        }
    }
    trace!(%peer, "inbox worker finished");
}

async fn outbox_worker(
    mailbox: Mailbox,
    mut writer: FrameWriter<OwnedWriteHalf>,
    mut queue: mpsc::UnboundedReceiver<Outgoing>,
    write_timeout: Duration,
) {
    let peer = mailbox.peer();
    while let Some(outgoing) = queue.recv().await {
        let Outgoing::Frame(envelope) = outgoing else {
            break;
        };
        match tokio::time::timeout(write_timeout, writer.send(&envelope.to_value())).await {
            Ok(Ok(())) => trace!(%peer, kind = envelope.message.kind(), "frame written"),
            Ok(Err(RemoteError::TerminatorInPayload)) => {
                error!(%peer, "refusing to write a frame containing the terminator");
                if let Message::Query { id, .. } = envelope.message {
                    let error = MessageError::Malformed("payload contains the frame terminator".into());
                    mailbox
                        .inner
                        .requests
                        .resolve(id, Message::error(error.to_value(), Some(id)));
                }
            }
            Ok(Err(error)) => {
                debug!(%peer, %error, "write failed");
                mailbox
                    .shutdown(ExitReason::ConnectionLost(peer.to_string()))
                    .await;
                break;
            }
            Err(_elapsed) => {
                warn!(%peer, ?write_timeout, "write timed out");
                mailbox
                    .shutdown(ExitReason::ConnectionLost(peer.to_string()))
                    .await;
                break;
            }
        }
    }
    if let Err(error) = writer.close().await {
        debug!(%peer, %error, "close failed");
    }
    trace!(%peer, "outbox worker finished");
}
