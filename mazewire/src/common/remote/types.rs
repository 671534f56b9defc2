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

//! Transport errors and the addressing envelope carried on the wire.

use std::fmt;
use std::io;

use serde_json::{Map, Value};

use crate::message::{value_kind, Message, MessageError};

/// Errors raised by connections, mailboxes and listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The peer closed the connection or the socket failed.
    DeadConnection,

    /// The mailbox was stopped before the operation could run.
    ConnectionClosed,

    /// An encoded payload contained the frame terminator.
    ///
    /// Nothing was written; the connection is still usable.
    TerminatorInPayload,

    /// More bytes than the configured limit arrived without a terminator.
    FrameTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Configured `max_frame_size`.
        limit: usize,
    },

    /// A frame did not decode into a value or an envelope.
    ///
    /// The offending frame has been consumed; the stream stays usable.
    Protocol(String),

    /// A value could not be serialized.
    Serialization(String),

    /// Socket or I/O error other than a disconnect.
    Io(String),

    /// An operation did not finish in time.
    Timeout,
}

impl RemoteError {
    /// `true` for errors after which the connection cannot be used.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::TerminatorInPayload | Self::Protocol(_) | Self::Serialization(_)
        )
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadConnection => write!(f, "Dead connection"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::TerminatorInPayload => write!(f, "Payload contains the frame terminator"),
            Self::FrameTooLarge { size, limit } => {
                write!(f, "Frame too large: {size} bytes buffered, limit {limit}")
            }
            Self::Protocol(e) => write!(f, "Protocol error: {e}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<io::Error> for RemoteError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::DeadConnection,
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<MessageError> for RemoteError {
    fn from(err: MessageError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// The addressing envelope wrapped around every message on a connection.
///
/// ```json
/// { "actor": "multiplier", "message": { "method": "mult", "params": [2, 3, 4], "id": 1 }, "sender": "00c0ffee00c0ffee" }
/// ```
///
/// `actor` selects the destination (a registered name or an actor id) and is
/// absent for replies addressed to the connection itself. `sender`, when
/// present, is the identity replies should be addressed to.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEnvelope {
    /// Destination name or id.
    pub actor: Option<String>,
    /// The wrapped message.
    pub message: Message,
    /// Identity of the originating actor.
    pub sender: Option<String>,
}

impl WireEnvelope {
    /// Wraps `message` for `actor`.
    pub fn new(actor: Option<String>, message: Message) -> Self {
        Self {
            actor,
            message,
            sender: None,
        }
    }

    /// Sets the sender identity.
    #[must_use]
    pub fn with_sender(mut self, sender: Option<String>) -> Self {
        self.sender = sender;
        self
    }

    /// The structured form written to the wire. Absent fields are omitted.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(actor) = &self.actor {
            map.insert("actor".into(), Value::String(actor.clone()));
        }
        map.insert("message".into(), self.message.to_value());
        if let Some(sender) = &self.sender {
            map.insert("sender".into(), Value::String(sender.clone()));
        }
        Value::Object(map)
    }

    /// Decodes an envelope read off the wire.
    ///
    /// # Errors
    ///
    /// [`MessageError::Malformed`] when the value is not an object, has no
    /// decodable `message`, or carries a non-string `actor` or `sender`.
    pub fn from_value(value: &Value) -> Result<Self, MessageError> {
        let Value::Object(map) = value else {
            return Err(MessageError::Malformed(format!(
                "expected an envelope object, got {}",
                value_kind(value)
            )));
        };
        let message = map
            .get("message")
            .ok_or_else(|| MessageError::Malformed("envelope has no message".into()))
            .and_then(Message::from_value)?;
        Ok(Self {
            actor: optional_string(map, "actor")?,
            message,
            sender: optional_string(map, "sender")?,
        })
    }
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>, MessageError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(MessageError::Malformed(format!(
            "envelope field '{key}' must be a string, got {}",
            value_kind(other)
        ))),
    }
}
