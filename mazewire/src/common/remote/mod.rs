//! Location-transparent messaging over TCP.
//!
//! A server runtime registers names for its actors and starts a listener with
//! [`ActorRuntime::start_listener`](crate::common::ActorRuntime::start_listener).
//! A client obtains a [`RemoteRef`] with
//! [`ActorRuntime::actor_for`](crate::common::ActorRuntime::actor_for) and uses it
//! exactly like a local reference. Each connection is a [`Mailbox`]; frames on
//! it are JSON values delimited by a terminator byte (see [`wire`]).

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

pub use config::{RemoteConfig, RemoteLimitsConfig, RemoteTimeoutsConfig, ShutdownConfig, TcpConfig};
pub use listener::{ListenerHandle, ListenerStats, RemoteRegistry};
pub use mailbox::Mailbox;
pub use remote_ref::RemoteRef;
pub use types::{RemoteError, WireEnvelope};

pub(crate) use listener::run as run_listener;

mod config;
mod listener;
mod mailbox;
mod remote_ref;
mod types;

/// Frame codec.
pub mod wire;
