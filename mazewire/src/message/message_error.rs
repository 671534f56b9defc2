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

use serde_json::{json, Value};

use crate::message::RequestId;

/// Errors raised while decoding, routing or dispatching messages.
///
/// When one of these has to travel back to a caller it is carried in the
/// `error` field of a [`Message::Error`](crate::message::Message::Error) as
/// `{"kind": <snake_case kind>, "message": <display text>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The value was not a recognisable message.
    Malformed(String),
    /// No handler is exposed under the method name.
    UnknownMethod(String),
    /// The arguments did not decode into the handler's parameter type.
    InvalidParams {
        /// Method being invoked.
        method: String,
        /// Decoder error text.
        reason: String,
    },
    /// No actor is registered under the address.
    ActorNotFound(String),
    /// The actor stopped before the message could be processed.
    ActorStopped(String),
    /// A query id was registered twice.
    DuplicateRequestId(RequestId),
    /// The handler failed while processing the query.
    HandlerFault(String),
    /// The connection carrying the query closed first.
    ConnectionClosed(String),
}

impl MessageError {
    /// Stable snake_case name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnknownMethod(_) => "unknown_method",
            Self::InvalidParams { .. } => "invalid_params",
            Self::ActorNotFound(_) => "actor_not_found",
            Self::ActorStopped(_) => "actor_stopped",
            Self::DuplicateRequestId(_) => "duplicate_request_id",
            Self::HandlerFault(_) => "handler_fault",
            Self::ConnectionClosed(_) => "connection_closed",
        }
    }

    /// Payload for the `error` field of an error message.
    pub fn to_value(&self) -> Value {
        json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed message: {reason}"),
            Self::UnknownMethod(method) => write!(f, "unknown method '{method}'"),
            Self::InvalidParams { method, reason } => {
                write!(f, "invalid params for '{method}': {reason}")
            }
            Self::ActorNotFound(address) => write!(f, "no actor registered as '{address}'"),
            Self::ActorStopped(address) => write!(f, "actor {address} has stopped"),
            Self::DuplicateRequestId(id) => write!(f, "request id {id} is already pending"),
            Self::HandlerFault(reason) => write!(f, "handler fault: {reason}"),
            Self::ConnectionClosed(peer) => write!(f, "connection to {peer} closed"),
        }
    }
}

impl std::error::Error for MessageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_carries_kind_and_text() {
        let payload = MessageError::UnknownMethod("divide".into()).to_value();
        assert_eq!(payload["kind"], "unknown_method");
        assert_eq!(payload["message"], "unknown method 'divide'");
    }
}
