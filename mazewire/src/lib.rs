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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Mazewire
//!
//! An actor runtime on tokio in which notifications and request/response
//! queries look the same whether the receiving actor lives in this process or
//! behind a TCP connection.
//!
//! ## Key Concepts
//!
//! - **Actors (`ManagedActor`)**: independently scheduled units with a private
//!   inbox and a user-defined model. Methods are exposed by name and dispatched
//!   from an explicit table; a raw actor receives every message undecoded.
//! - **References (`ActorRef`)**: a local handle or a remote target on a
//!   connection, both speaking `ActorRefInterface` (`notify`, `query`, `put`).
//! - **Messages**: `Notification`, `Query`, `Response` and `Error`, correlated
//!   by id through a `RequestRegistry`.
//! - **Linking**: an actor that stops abnormally takes its linked partners
//!   down with it, unless they trap exits.
//! - **Remote**: a listener routes framed JSON envelopes to named actors; a
//!   client gets a reference with `ActorRuntime::actor_for`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mazewire::prelude::*;
//!
//! #[mazewire_actor]
//! struct Multiplier;
//!
//! #[mazewire_main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = MazewireApp::launch_async().await;
//!     let mut actor = runtime.new_actor_with_name::<Multiplier>("multiplier");
//!     actor.expose::<(i64, i64, i64), _>("mult", |_actor, ctx| {
//!         let (a, b, c) = *ctx.params();
//!         Reply::respond(ctx.reply_envelope(), a * b * c)
//!     });
//!     let multiplier = actor.start().await;
//!     let product = multiplier
//!         .call("mult", vec![2.into(), 3.into(), 4.into()].into(), Duration::from_secs(3))
//!         .await?;
//!     assert_eq!(product, 24);
//!     runtime.shutdown_all().await
//! }
//! ```

/// Runtime, references, correlation and configuration.
pub(crate) mod common;

/// Actor builder, lifecycle and linking.
pub(crate) mod actor;

/// Message types, envelopes and reply helpers.
pub(crate) mod message;

/// Core traits.
pub(crate) mod traits;

/// Connections, listeners and remote references.
pub mod remote {
    pub use crate::common::remote::{
        ListenerHandle, ListenerStats, Mailbox, RemoteConfig, RemoteError, RemoteLimitsConfig,
        RemoteRef, RemoteRegistry, RemoteTimeoutsConfig, ShutdownConfig, TcpConfig, WireEnvelope,
    };

    /// Frame codec.
    pub mod wire {
        pub use crate::common::remote::wire::{
            encode_frame, Connection, FrameBuffer, FrameReader, FrameWriter, TERMINATOR,
        };
    }
}

/// Configuration types.
pub mod config {
    pub use crate::common::config::{DefaultsConfig, LimitsConfig, MazewireConfig, TimeoutConfig};
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `mazewire-macro`)
/// *   `mazewire_actor`, `mazewire_params`, `mazewire_main`.
///
/// ## External Crates
/// *   `async_trait`, `serde_json::{json, Value}`, `tokio` and `Duration`.
///
/// ## Core Types
/// *   [`crate::common::MazewireApp`] and [`crate::common::ActorRuntime`].
/// *   [`crate::actor::ManagedActor`], [`crate::actor::Idle`], [`crate::actor::Started`]
///     and [`crate::actor::ActorConfig`].
/// *   [`crate::common::ActorRef`] and [`crate::traits::ActorRefInterface`].
/// *   [`crate::message::Message`], [`crate::message::Params`],
///     [`crate::message::MessageContext`], [`crate::message::ReplyEnvelope`].
/// *   [`crate::common::Reply`], [`crate::common::Request`], [`crate::common::QueryError`].
/// *   [`crate::actor::ExitReason`] and [`crate::actor::ExitSignal`].
pub mod prelude {
    // Macros from mazewire-macro
    pub use mazewire_macro::*;

    // External crate re-exports
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
    pub use std::time::Duration;
    pub use tokio;

    // Core types
    pub use crate::actor::{
        ActorConfig, ActorState, ExitReason, ExitSignal, Idle, ManagedActor, Started,
        EXIT_METHOD, INTROSPECT_METHOD,
    };
    pub use crate::common::{
        ActorId, ActorRef, ActorRuntime, FutureBox, HandlerResult, LocalRef, MazewireApp,
        MazewireConfig, QueryError, Relay, Reply, Request, RequestRegistry,
    };
    pub use crate::message::{
        Message, MessageContext, MessageError, Params, ReplyEnvelope, RequestId, SystemSignal,
    };
    pub use crate::remote::{ListenerHandle, RemoteError, RemoteRef};
    pub use crate::traits::ActorRefInterface;
}
