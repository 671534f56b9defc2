//! Building, running and linking actors.
//!
//! # Key Components
//!
//! *   [`ManagedActor`]: An actor together with its model, in a type state.
//!     In [`Idle`] it is configured (methods exposed, hooks attached); once
//!     started, handlers see it in [`Started`].
//! *   [`ActorConfig`]: Name, exit trapping and inbox capacity.
//! *   [`ActorState`]: The lifecycle `Created → Started → Running ⇄ Paused →
//!     Stopping → Stopped`.
//! *   [`ExitSignal`] and [`ExitReason`]: What linked actors learn when one of
//!     them stops.

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

pub use actor_config::ActorConfig;
pub use actor_state::ActorState;
pub use dispatch::INTROSPECT_METHOD;
pub use exit::{ExitReason, ExitSignal, EXIT_METHOD};
pub use managed_actor::started::Started;
pub use managed_actor::Idle;
pub use managed_actor::ManagedActor;

/// Contains the `ManagedActor` struct and its state-specific implementations (`Idle`, `Started`).
mod managed_actor;

/// Contains the `ActorConfig` struct for actor initialization.
mod actor_config;

/// Lifecycle states.
mod actor_state;

/// Method-name dispatch and introspection.
pub(crate) mod dispatch;

/// Exit signals and reasons.
mod exit;
