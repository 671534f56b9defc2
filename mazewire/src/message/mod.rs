//! The message protocol spoken between actors, locally and over the wire.
//!
//! *   [`Message`]: the four message shapes (notification, query, response, error)
//!     and their structural encoding.
//! *   [`Params`]: positional or named invocation arguments.
//! *   [`MessageError`]: decoding, routing and dispatch failures, with the
//!     `{"kind", "message"}` payload used in error replies.
//! *   [`MessageContext`] and [`ReplyEnvelope`]: what a handler receives and how it answers.
//! *   [`SystemSignal`]: in-band control signals.

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

pub use message_context::MessageContext;
pub use message_error::MessageError;
pub use reply_envelope::ReplyEnvelope;
pub use rpc_message::{Message, Params, RequestId};
pub use signal::SystemSignal;

pub(crate) use envelope::{Envelope, Inbound};
pub(crate) use rpc_message::value_kind;

/// Defines the internal `Envelope` and `Inbound` queue items.
mod envelope;
/// Defines [`MessageContext`] passed to message handlers.
mod message_context;
/// Defines [`MessageError`].
mod message_error;
/// Defines [`ReplyEnvelope`].
mod reply_envelope;
/// Defines [`Message`] and [`Params`].
mod rpc_message;
/// Defines [`SystemSignal`].
mod signal;
