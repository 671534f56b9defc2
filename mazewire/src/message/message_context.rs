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

use static_assertions::assert_impl_all;

use crate::common::ActorRef;
use crate::message::{ReplyEnvelope, RequestId};

/// What a handler sees of the message it is processing.
///
/// `P` is the decoded parameter type for handlers registered with
/// [`expose`](crate::actor::ManagedActor::expose), or the raw
/// [`Message`](crate::message::Message) for a catch-all
/// [`on_message`](crate::actor::ManagedActor::on_message) handler.
#[derive(Clone, Debug)]
pub struct MessageContext<P> {
    pub(crate) method: String,
    pub(crate) params: P,
    pub(crate) id: Option<RequestId>,
    pub(crate) sender: Option<ActorRef>,
    pub(crate) reply_envelope: ReplyEnvelope,
}

impl<P> MessageContext<P> {
    /// The decoded arguments (or the whole message for raw handlers).
    pub const fn params(&self) -> &P {
        &self.params
    }

    /// The invoked method name. Empty for raw handlers receiving a reply.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Query id, `None` for notifications.
    pub const fn id(&self) -> Option<RequestId> {
        self.id
    }

    /// `true` if the caller waits for a reply.
    pub const fn is_query(&self) -> bool {
        self.id.is_some()
    }

    /// The originating actor, if the message carried one.
    pub const fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    /// Where replies to this message go.
    pub const fn reply_to(&self) -> Option<&ActorRef> {
        self.reply_envelope.reply_to()
    }

    /// A clone of the reply envelope, for moving into the handler's future.
    pub fn reply_envelope(&self) -> ReplyEnvelope {
        self.reply_envelope.clone()
    }
}

assert_impl_all!(MessageContext<u32>: Send);
