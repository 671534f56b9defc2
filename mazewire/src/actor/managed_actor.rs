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

use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;

pub use idle::Idle;

use crate::actor::dispatch::DispatchTable;
use crate::common::{ActorCell, ActorId, ActorRef, ActorRuntime, LifecycleHook, RawHandler};
use crate::message::Inbound;

mod idle;
pub mod started;

/// An actor together with its state model, in the type state `ActorState`.
///
/// In the [`Idle`] state the actor is configured: methods are exposed and
/// lifecycle hooks attached. [`start`](ManagedActor::start) consumes it and
/// spawns its processing loop; from then on handlers see it in the
/// [`Started`](started::Started) state and the outside world holds an
/// [`ActorRef`].
pub struct ManagedActor<ActorState, Model: Default + Send + Debug + 'static> {
    pub(crate) handle: ActorRef,
    pub(crate) cell: Arc<ActorCell>,
    pub(crate) runtime: ActorRuntime,

    /// The user-defined state of the actor.
    pub model: Model,

    pub(crate) inbox: Receiver<Inbound>,
    pub(crate) on_start: Option<LifecycleHook<Model>>,
    pub(crate) on_stop: Option<LifecycleHook<Model>>,
    pub(crate) handlers: DispatchTable<Model>,
    pub(crate) raw_handler: Option<Box<RawHandler<Model>>>,
    _actor_state: PhantomData<ActorState>,
}

impl<ActorState, Model: Default + Send + Debug + 'static> ManagedActor<ActorState, Model> {
    /// The actor's id.
    #[inline]
    pub fn id(&self) -> ActorId {
        self.cell.id
    }

    /// The configured name, or the runtime's default actor name.
    #[inline]
    pub fn name(&self) -> &str {
        self.cell
            .name
            .as_deref()
            .unwrap_or(&self.runtime.config().defaults.actor_name)
    }

    /// A reference to this actor.
    #[inline]
    pub const fn handle(&self) -> &ActorRef {
        &self.handle
    }

    /// The runtime the actor belongs to.
    #[inline]
    pub const fn runtime(&self) -> &ActorRuntime {
        &self.runtime
    }

    /// Ids of the actors linked to this one.
    pub fn links(&self) -> Vec<ActorId> {
        self.cell.links()
    }

    /// Current lifecycle state.
    pub fn lifecycle_state(&self) -> crate::actor::ActorState {
        self.cell.state()
    }
}

impl<ActorState, Model: Default + Send + Debug + 'static> Debug
    for ManagedActor<ActorState, Model>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedActor")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("state", &self.lifecycle_state())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

// Shared by both type states when moving from Idle to Started.
impl<S, Model: Default + Send + Debug + 'static> ManagedActor<S, Model> {
    pub(crate) fn into_state<T>(self) -> ManagedActor<T, Model> {
        ManagedActor {
            handle: self.handle,
            cell: self.cell,
            runtime: self.runtime,
            model: self.model,
            inbox: self.inbox,
            on_start: self.on_start,
            on_stop: self.on_stop,
            handlers: self.handlers,
            raw_handler: self.raw_handler,
            _actor_state: PhantomData,
        }
    }
}
