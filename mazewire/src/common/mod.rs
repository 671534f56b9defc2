//! Runtime, references and the pieces shared across the crate.
//!
//! # Key Re-exported Components:
//!
//! *   [`MazewireApp`]: Starts an actor system.
//! *   [`ActorRuntime`]: The running system: actor and name tables, listeners
//!     and client connections.
//! *   [`ActorRef`]: A reference to a local or remote actor.
//! *   [`Request`] and [`RequestRegistry`]: Query correlation.
//! *   [`Reply`]: Builds the future every handler returns.
//! *   [`Relay`]: Forwards messages to a fixed destination.

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

// --- Public Re-exports ---
pub use actor_ref::{ActorRef, LocalRef};
pub use actor_reply::Reply;
pub use actor_runtime::ActorRuntime;
pub use config::MazewireConfig;
pub use mazewire_app::MazewireApp;
pub use relay::Relay;
pub use request::{QueryError, Request, RequestRegistry};
pub use types::{ActorId, FutureBox, HandlerResult};

// --- Crate-Internal Re-exports ---
pub(crate) use actor_ref::ActorCell;
pub(crate) use types::{LifecycleHook, MethodHandler, RawHandler};

// --- Submodules ---

/// Handler future aliases and [`ActorId`].
mod types;

/// Defines the `MazewireApp` entry point for system initialization.
mod mazewire_app;
/// Defines the internal state (`RuntimeInner`) of the runtime.
pub(crate) mod runtime_inner;
/// Defines the `ActorRuntime` context object.
mod actor_runtime;
/// Local and remote actor references.
mod actor_ref;
/// Defines the `Reply` utility.
mod actor_reply;
/// Query correlation.
mod request;
/// Message forwarding.
mod relay;
/// Defines the configuration system.
pub mod config;

/// Connections, listeners and remote references.
pub(crate) mod remote;
