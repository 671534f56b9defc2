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
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tracing::{instrument, trace, warn};

use crate::actor::dispatch::DispatchTable;
use crate::actor::{ActorConfig, ManagedActor, Started};
use crate::common::{
    ActorCell, ActorId, ActorRef, ActorRuntime, FutureBox, LocalRef, MethodHandler, RawHandler,
};
use crate::message::{Envelope, Message, MessageContext, MessageError, ReplyEnvelope};

/// Type-state marker for a [`ManagedActor`] that is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Idle;

impl<State: Default + Send + Debug + 'static> ManagedActor<Idle, State> {
    /// Exposes a handler under `method`.
    ///
    /// Incoming `params` are decoded into `P` before the handler runs. A message
    /// whose params do not decode is answered with an `invalid_params` error if it
    /// is a query, and dropped if it is a notification; the handler never sees it.
    ///
    /// The handler runs with exclusive access to the actor and returns a
    /// [`FutureBox`] (see [`Reply`](crate::common::Reply)). The future must own
    /// everything it uses.
    ///
    /// Exposing the same name twice replaces the earlier handler.
    #[instrument(skip(self, handler), level = "debug")]
    pub fn expose<P, F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        P: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a mut ManagedActor<Started, State>, &'a mut MessageContext<P>) -> FutureBox
            + Send
            + Sync
            + 'static,
    {
        trace!(param_type = std::any::type_name::<P>(), "exposing method");
        let wrapped: Box<MethodHandler<State>> = Box::new(
            move |actor: &mut ManagedActor<Started, State>,
                  envelope: &mut Envelope|
                  -> Result<FutureBox, MessageError> {
                let (method, params, id) = match &envelope.message {
                    Message::Notification { method, params } => (method, params, None),
                    Message::Query { method, params, id } => (method, params, Some(*id)),
                    other => {
                        return Err(MessageError::Malformed(format!(
                            "a {} cannot be dispatched to a method",
                            other.kind()
                        )))
                    }
                };
                let decoded: P = params.decode().map_err(|e| MessageError::InvalidParams {
                    method: method.clone(),
                    reason: e.to_string(),
                })?;
                let mut context = MessageContext {
                    method: method.clone(),
                    params: decoded,
                    id,
                    sender: envelope.sender.clone(),
                    reply_envelope: ReplyEnvelope::new(id, envelope.reply_to.clone()),
                };
                Ok(handler(actor, &mut context))
            },
        );
        if self.handlers.insert(method.to_owned(), wrapped) {
            warn!(method, "replaced an existing handler");
        }
        self
    }

    /// Attaches documentation to an exposed method, returned by introspection.
    pub fn describe(&mut self, method: &str, doc: &str) -> &mut Self {
        self.handlers.describe(method.to_owned(), doc.to_owned());
        self
    }

    /// Installs a catch-all handler that receives every message undecoded.
    ///
    /// When set it takes precedence over the exposed methods, including the
    /// built-in introspection. Replies to this actor's own queries are still
    /// correlated before it runs.
    pub fn on_message<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedActor<Started, State>, &'a mut MessageContext<Message>) -> FutureBox
            + Send
            + Sync
            + 'static,
    {
        let raw: Box<RawHandler<State>> = Box::new(
            move |actor: &mut ManagedActor<Started, State>, envelope: &mut Envelope| -> FutureBox {
                let id = match &envelope.message {
                    Message::Query { id, .. } => Some(*id),
                    _ => None,
                };
                let mut context = MessageContext {
                    method: envelope.message.method().unwrap_or_default().to_owned(),
                    params: envelope.message.clone(),
                    id,
                    sender: envelope.sender.clone(),
                    reply_envelope: ReplyEnvelope::new(id, envelope.reply_to.clone()),
                };
                handler(actor, &mut context)
            },
        );
        self.raw_handler = Some(raw);
        self
    }

    /// Registers a hook that runs once, before the first message is processed.
    ///
    /// A failing hook stops the actor with a fault before it processes anything.
    pub fn on_start<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'b> Fn(&'b ManagedActor<Started, State>) -> FutureBox + Send + Sync + 'static,
    {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Registers a hook that runs once the inbox has been drained during stop.
    pub fn on_stop<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'b> Fn(&'b ManagedActor<Started, State>) -> FutureBox + Send + Sync + 'static,
    {
        self.on_stop = Some(Box::new(f));
        self
    }

    /// Turns exit trapping on or off.
    pub fn trap_exit(&mut self, enabled: bool) -> &mut Self {
        self.cell.set_trap_exit(enabled);
        self
    }

    #[instrument(skip(runtime))]
    pub(crate) fn new(runtime: &ActorRuntime, config: &ActorConfig) -> Self {
        let capacity = config
            .inbox_capacity()
            .unwrap_or(runtime.config().limits.actor_inbox_capacity)
            .max(1);
        let (outbox, inbox) = mpsc::channel(capacity);
        let cell = Arc::new(ActorCell::new(
            ActorId::random(),
            config.name().map(str::to_owned),
            outbox,
            config.trap_exit(),
            runtime.0.cancellation_token.child_token(),
        ));
        trace!(actor = %cell.id, capacity, "new actor");
        Self {
            handle: ActorRef::Local(LocalRef::new(cell.clone())),
            cell,
            runtime: runtime.clone(),
            model: State::default(),
            inbox,
            on_start: None,
            on_stop: None,
            handlers: DispatchTable::default(),
            raw_handler: None,
            _actor_state: PhantomData,
        }
    }

    /// Schedules the actor and returns a reference to it.
    ///
    /// The actor is entered in the runtime's tables (and its name, if any, in the
    /// name table), its `on_start` hook runs, and this call returns once the actor
    /// is ready to process messages.
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub async fn start(mut self) -> ActorRef {
        let table = mem::take(&mut self.handlers);
        let raw = self.raw_handler.take();
        let handle = self.handle.clone();
        let cell = self.cell.clone();
        trace!(methods = table.len(), raw = raw.is_some(), "starting actor");

        self.runtime.admit(&cell);
        let (ready, started) = oneshot::channel();
        let actor: ManagedActor<Started, State> = self.into_state();
        cell.tracker.spawn(actor.wake(table, raw, ready));
        cell.tracker.close();
        let _ = started.await;
        handle
    }
}
