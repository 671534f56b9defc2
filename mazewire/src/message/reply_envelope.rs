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

use serde::Serialize;
use serde_json::Value;
use static_assertions::assert_impl_all;
use tokio::runtime::Handle;
use tracing::{instrument, trace, warn};

use crate::common::ActorRef;
use crate::message::{Message, MessageError, RequestId};
use crate::traits::ActorRefInterface;

/// Return address for the reply to a query.
///
/// Built for every dispatched message. For notifications it carries no id, and
/// every send through it is a silent no-op, so handlers can reply
/// unconditionally.
#[derive(Debug, Clone)]
pub struct ReplyEnvelope {
    id: Option<RequestId>,
    reply_to: Option<ActorRef>,
}

assert_impl_all!(ReplyEnvelope: Send, Sync, Clone);

impl ReplyEnvelope {
    pub(crate) const fn new(id: Option<RequestId>, reply_to: Option<ActorRef>) -> Self {
        Self { id, reply_to }
    }

    /// The id of the query being answered.
    pub const fn id(&self) -> Option<RequestId> {
        self.id
    }

    /// Where the reply goes.
    pub const fn reply_to(&self) -> Option<&ActorRef> {
        self.reply_to.as_ref()
    }

    /// `true` if a reply sent through this envelope reaches someone.
    pub const fn can_reply(&self) -> bool {
        self.id.is_some() && self.reply_to.is_some()
    }

    /// Sends `result` as the `Response` to the query.
    ///
    /// A result that fails to serialize is answered with an `Error` instead, so the
    /// caller is never left waiting.
    #[instrument(skip(self, result), level = "trace")]
    pub async fn send<T: Serialize + Send>(&self, result: T) {
        let Some(id) = self.id else {
            trace!("not a query; reply dropped");
            return;
        };
        let message = match serde_json::to_value(result) {
            Ok(value) => Message::response(value, id),
            Err(e) => {
                warn!(id, error = %e, "reply could not be serialized");
                Message::error(
                    MessageError::Malformed(format!("reply could not be serialized: {e}"))
                        .to_value(),
                    Some(id),
                )
            }
        };
        self.deliver(message).await;
    }

    /// Sends `error` as the `Error` reply to the query.
    pub async fn send_error<T: Serialize + Send>(&self, error: T) {
        let Some(id) = self.id else {
            trace!("not a query; error reply dropped");
            return;
        };
        let payload = serde_json::to_value(error)
            .unwrap_or_else(|e| Value::String(format!("error could not be serialized: {e}")));
        self.deliver(Message::error(payload, Some(id))).await;
    }

    /// Sends the structured form of a [`MessageError`] as the reply.
    pub async fn send_failure(&self, error: &MessageError) {
        if let Some(id) = self.id {
            self.deliver(Message::error(error.to_value(), Some(id))).await;
        }
    }

    /// Non-async [`send`](Self::send): spawns the delivery on the current Tokio runtime.
    ///
    /// Outside a runtime the reply is dropped with a warning.
    pub fn reply<T: Serialize + Send + 'static>(&self, result: T) {
        let envelope = self.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { envelope.send(result).await });
            }
            Err(_) => warn!(id = ?self.id, "reply() called outside a Tokio runtime; dropped"),
        }
    }

    async fn deliver(&self, message: Message) {
        match &self.reply_to {
            Some(reply_to) => {
                trace!(to = %reply_to.address(), kind = message.kind(), "sending reply");
                reply_to.put(message).await;
            }
            None => trace!(kind = message.kind(), "query has no return address; reply dropped"),
        }
    }
}
