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
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, error, instrument, trace, warn};

use crate::actor::dispatch::{DispatchTable, Lookup};
use crate::actor::{ActorState, ExitReason, ExitSignal, ManagedActor};
use crate::common::{ActorId, ActorRef, FutureBox, RawHandler};
use crate::message::{Envelope, Inbound, Message, MessageError, ReplyEnvelope, SystemSignal};

/// Type-state marker for a [`ManagedActor`] whose processing loop is running.
///
/// Handlers always receive the actor in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Started;

#[derive(Debug, Clone, Copy)]
enum Hook {
    Start,
    Stop,
}

impl<State: Default + Send + Debug + 'static> ManagedActor<Started, State> {
    /// Asks this actor to stop once the current handler returns.
    ///
    /// Unlike [`ActorRef::stop`] this does not wait, so it is safe to call from
    /// the actor's own handlers.
    pub fn request_stop(&self) {
        self.cell.request_stop();
    }

    /// Links this actor with `other`. See [`ActorRef::link`].
    ///
    /// # Errors
    ///
    /// As for [`ActorRef::link`].
    pub fn link(&self, other: &ActorRef) -> anyhow::Result<()> {
        self.handle.link(other)
    }

    #[instrument(skip_all, fields(actor = %self.id()))]
    pub(crate) async fn wake(
        mut self,
        table: DispatchTable<State>,
        raw: Option<Box<RawHandler<State>>>,
        ready: oneshot::Sender<()>,
    ) {
        let started = self.run_hook(Hook::Start).await;
        self.cell.set_state(ActorState::Started);
        let _ = ready.send(());

        let reason = match started {
            Ok(()) => self.run_loop(&table, raw.as_deref()).await,
            Err(reason) => {
                error!(%reason, "on_start failed");
                reason
            }
        };
        self.finish(reason).await;
    }

    async fn run_loop(
        &mut self,
        table: &DispatchTable<State>,
        raw: Option<&RawHandler<State>>,
    ) -> ExitReason {
        let cancel = self.cell.cancellation_token.clone();
        let mut paused = self.cell.paused.subscribe();
        loop {
            if *paused.borrow_and_update() {
                self.cell.set_state(ActorState::Paused);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return ExitReason::Normal,
                    changed = paused.changed() => {
                        if changed.is_err() {
                            return ExitReason::Normal;
                        }
                        continue;
                    }
                }
            }
            self.cell.set_state(ActorState::Running);

            let inbound = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    trace!("stop requested");
                    return ExitReason::Normal;
                }
                changed = paused.changed() => {
                    if changed.is_err() {
                        return ExitReason::Normal;
                    }
                    continue;
                }
                inbound = self.inbox.recv() => inbound,
            };
            let Some(inbound) = inbound else {
                trace!("inbox closed");
                return ExitReason::Normal;
            };

            match inbound {
                Inbound::Signal(SystemSignal::Terminate) => {
                    trace!("terminate signal");
                    return ExitReason::Normal;
                }
                Inbound::Exit(signal) => {
                    if let Some(reason) = self.on_exit_signal(signal, table, raw).await {
                        return reason;
                    }
                }
                Inbound::Message(envelope) => {
                    if let Some(id) = envelope.message.reply_id() {
                        self.cell.requests.resolve(id, envelope.message);
                        continue;
                    }
                    if let Err(reason) = self.dispatch(envelope, table, raw).await {
                        return reason;
                    }
                }
            }
        }
    }

    async fn on_exit_signal(
        &mut self,
        signal: ExitSignal,
        table: &DispatchTable<State>,
        raw: Option<&RawHandler<State>>,
    ) -> Option<ExitReason> {
        if self.cell.traps_exit() {
            trace!(from = %signal.from, reason = %signal.reason, "trapped exit signal");
            let envelope = Envelope::new(signal.into_message());
            return self.dispatch(envelope, table, raw).await.err();
        }
        if signal.reason.is_normal() {
            trace!(from = %signal.from, "ignoring normal exit of linked actor");
            return None;
        }
        debug!(from = %signal.from, reason = %signal.reason, "linked actor exited abnormally");
        Some(ExitReason::Linked(signal.from))
    }

    async fn dispatch(
        &mut self,
        mut envelope: Envelope,
        table: &DispatchTable<State>,
        raw: Option<&RawHandler<State>>,
    ) -> Result<(), ExitReason> {
        let query_id = match &envelope.message {
            Message::Query { id, .. } => Some(*id),
            _ => None,
        };
        let reply = ReplyEnvelope::new(query_id, envelope.reply_to.clone());
        let actor = self.id();

        if let Some(raw) = raw {
            return match panic::catch_unwind(AssertUnwindSafe(|| raw(self, &mut envelope))) {
                Ok(future) => run_handler(actor, future, &reply).await,
                Err(payload) => fault(actor, ExitReason::from_panic(payload.as_ref()), &reply).await,
            };
        }

        let Some(method) = envelope.message.method().map(str::to_owned) else {
            if let Message::Error { error, .. } = &envelope.message {
                warn!(%actor, %error, "uncorrelated error report");
            }
            return Ok(());
        };
        match table.lookup(&method) {
            Lookup::Handler(handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(self, &mut envelope))) {
                    Ok(Ok(future)) => run_handler(actor, future, &reply).await,
                    Ok(Err(error)) => {
                        reject(&reply, &error).await;
                        Ok(())
                    }
                    Err(payload) => {
                        fault(actor, ExitReason::from_panic(payload.as_ref()), &reply).await
                    }
                }
            }
            Lookup::Introspection(listing) => {
                reply.send(listing).await;
                Ok(())
            }
            Lookup::Missing(error) => {
                reject(&reply, &error).await;
                Ok(())
            }
        }
    }

    async fn run_hook(&mut self, hook: Hook) -> Result<(), ExitReason> {
        let taken = match hook {
            Hook::Start => self.on_start.take(),
            Hook::Stop => self.on_stop.take(),
        };
        let Some(hook_fn) = taken else {
            return Ok(());
        };
        trace!(?hook, "running lifecycle hook");
        let future = panic::catch_unwind(AssertUnwindSafe(|| hook_fn(&*self)))
            .map_err(|payload| ExitReason::from_panic(payload.as_ref()))?;
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(ExitReason::Fault(format!("{hook:?} hook failed: {error:#}"))),
            Err(payload) => Err(ExitReason::from_panic(payload.as_ref())),
        }
    }

    /// Drains the inbox, runs `on_stop`, leaves the runtime and notifies links.
    async fn finish(mut self, reason: ExitReason) {
        let cell = self.cell.clone();
        cell.set_state(ActorState::Stopping);

        self.inbox.close();
        let mut drained = 0_usize;
        while let Ok(inbound) = self.inbox.try_recv() {
            let Inbound::Message(Envelope {
                message, reply_to, ..
            }) = inbound
            else {
                continue;
            };
            drained += 1;
            if let Some(id) = message.reply_id() {
                cell.requests.resolve(id, message);
            } else if let Message::Query { id, .. } = message {
                ReplyEnvelope::new(Some(id), reply_to)
                    .send_failure(&MessageError::ActorStopped(cell.id.to_string()))
                    .await;
            }
        }

        if let Err(hook_failure) = self.run_hook(Hook::Stop).await {
            error!(actor = %cell.id, %hook_failure, "on_stop failed");
        }

        self.runtime.forget(cell.id, cell.name.as_deref());

        for linked in cell.take_links() {
            let Some(peer) = self.runtime.local(linked) else {
                continue;
            };
            peer.cell.unlink(cell.id);
            peer.exit(ExitSignal::new(cell.id.to_string(), reason.clone()))
                .await;
        }

        cell.set_state(ActorState::Stopped);
        cell.cancellation_token.cancel();
        if reason.is_normal() {
            debug!(actor = %cell.id, drained, "actor stopped");
        } else {
            warn!(actor = %cell.id, drained, %reason, "actor stopped abnormally");
        }
    }
}

async fn run_handler(
    actor: ActorId,
    future: FutureBox,
    reply: &ReplyEnvelope,
) -> Result<(), ExitReason> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => fault(actor, ExitReason::Fault(format!("{error:#}")), reply).await,
        Err(payload) => fault(actor, ExitReason::from_panic(payload.as_ref()), reply).await,
    }
}

/// Reports a handler fault to a waiting caller and turns it into the exit reason.
async fn fault(
    actor: ActorId,
    reason: ExitReason,
    reply: &ReplyEnvelope,
) -> Result<(), ExitReason> {
    error!(%actor, %reason, "handler fault");
    if reply.id().is_some() {
        let text = match &reason {
            ExitReason::Fault(text) => text.clone(),
            other => other.to_string(),
        };
        reply.send_failure(&MessageError::HandlerFault(text)).await;
    }
    Err(reason)
}

async fn reject(reply: &ReplyEnvelope, error: &MessageError) {
    if reply.id().is_some() {
        debug!(%error, "rejecting query");
        reply.send_failure(error).await;
    } else {
        debug!(%error, "dropping notification");
    }
}
