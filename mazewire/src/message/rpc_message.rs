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

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use static_assertions::assert_impl_all;

use crate::message::MessageError;

/// Correlation identifier carried by queries and their replies.
pub type RequestId = u64;

/// Positional or named arguments of a [`Message::Notification`] or [`Message::Query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// The message carried no `params` field.
    #[default]
    None,
    /// A sequence of argument values.
    Positional(Vec<Value>),
    /// A mapping of argument names to values.
    Named(Map<String, Value>),
}

impl Params {
    /// Returns `true` if no parameters were supplied.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of supplied arguments.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(items) => items.len(),
            Self::Named(map) => map.len(),
        }
    }

    /// Returns `true` if there are no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value written to the `params` field, or `None` when the field is omitted.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Positional(items) => Some(Value::Array(items.clone())),
            Self::Named(map) => Some(Value::Object(map.clone())),
        }
    }

    /// Decodes the arguments into a typed parameter value.
    ///
    /// Absent parameters decode as `null` first and then as an empty sequence,
    /// so both `()` and collection types accept a message without `params`.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error when the arguments do not fit `P`.
    pub fn decode<P: DeserializeOwned>(&self) -> Result<P, serde_json::Error> {
        match self {
            Self::None => serde_json::from_value(Value::Null)
                .or_else(|_| serde_json::from_value(Value::Array(Vec::new()))),
            Self::Positional(items) => serde_json::from_value(Value::Array(items.clone())),
            Self::Named(map) => serde_json::from_value(Value::Object(map.clone())),
        }
    }

    fn from_field(field: Option<&Value>) -> Result<Self, MessageError> {
        match field {
            None | Some(Value::Null) => Ok(Self::None),
            Some(Value::Array(items)) => Ok(Self::Positional(items.clone())),
            Some(Value::Object(map)) => Ok(Self::Named(map.clone())),
            Some(other) => Err(MessageError::Malformed(format!(
                "params must be a sequence or a mapping, got {}",
                value_kind(other)
            ))),
        }
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Array(items) => Self::Positional(items),
            Value::Object(map) => Self::Named(map),
            scalar => Self::Positional(vec![scalar]),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Self::Positional(items)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self::Named(map)
    }
}

/// One unit of the wire protocol.
///
/// Every message is a mapping. The variant is recognised by the fields present,
/// tried in the order query, notification, response, error:
///
/// | variant | fields |
/// |---------|--------|
/// | `Query` | `method`, optional `params`, `id` |
/// | `Notification` | `method`, optional `params`, no `id` |
/// | `Response` | `result`, `id` |
/// | `Error` | `error`, `id` (possibly null) |
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Fire-and-forget method invocation.
    Notification {
        /// Method name.
        method: String,
        /// Arguments.
        params: Params,
    },
    /// Method invocation expecting exactly one `Response` or `Error` with the same id.
    Query {
        /// Method name.
        method: String,
        /// Arguments.
        params: Params,
        /// Correlation id.
        id: RequestId,
    },
    /// Successful reply to a query.
    Response {
        /// Handler result.
        result: Value,
        /// Id of the query being answered.
        id: RequestId,
    },
    /// Failed reply to a query, or an uncorrelated error report when `id` is `None`.
    Error {
        /// Error payload, usually `{"kind": .., "message": ..}`.
        error: Value,
        /// Id of the query being answered, if any.
        id: Option<RequestId>,
    },
}

assert_impl_all!(Message: Send, Sync, Clone);

impl Message {
    /// Builds a [`Message::Notification`].
    pub fn notification(method: impl Into<String>, params: impl Into<Params>) -> Self {
        Self::Notification {
            method: method.into(),
            params: params.into(),
        }
    }

    /// Builds a [`Message::Query`].
    pub fn query(method: impl Into<String>, params: impl Into<Params>, id: RequestId) -> Self {
        Self::Query {
            method: method.into(),
            params: params.into(),
            id,
        }
    }

    /// Builds a [`Message::Response`].
    pub const fn response(result: Value, id: RequestId) -> Self {
        Self::Response { result, id }
    }

    /// Builds a [`Message::Error`].
    pub const fn error(error: Value, id: Option<RequestId>) -> Self {
        Self::Error { error, id }
    }

    /// The id of a query or of the reply correlated with one.
    pub const fn id(&self) -> Option<RequestId> {
        match self {
            Self::Notification { .. } => None,
            Self::Query { id, .. } | Self::Response { id, .. } => Some(*id),
            Self::Error { id, .. } => *id,
        }
    }

    /// The id a reply resolves, `None` for invocations and uncorrelated errors.
    pub const fn reply_id(&self) -> Option<RequestId> {
        match self {
            Self::Response { id, .. } => Some(*id),
            Self::Error { id, .. } => *id,
            _ => None,
        }
    }

    /// Method name of an invocation.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Notification { method, .. } | Self::Query { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Arguments of an invocation.
    pub const fn params(&self) -> Option<&Params> {
        match self {
            Self::Notification { params, .. } | Self::Query { params, .. } => Some(params),
            _ => None,
        }
    }

    /// `true` for queries.
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// `true` for responses and errors.
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Response { .. } | Self::Error { .. })
    }

    /// Lower-case variant name, used in log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Notification { .. } => "notification",
            Self::Query { .. } => "query",
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
        }
    }

    /// Encodes the message as its structural mapping.
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        match self {
            Self::Notification { method, params } => {
                fields.insert("method".into(), Value::String(method.clone()));
                if let Some(params) = params.to_value() {
                    fields.insert("params".into(), params);
                }
            }
            Self::Query { method, params, id } => {
                fields.insert("method".into(), Value::String(method.clone()));
                if let Some(params) = params.to_value() {
                    fields.insert("params".into(), params);
                }
                fields.insert("id".into(), Value::from(*id));
            }
            Self::Response { result, id } => {
                fields.insert("result".into(), result.clone());
                fields.insert("id".into(), Value::from(*id));
            }
            Self::Error { error, id } => {
                fields.insert("error".into(), error.clone());
                fields.insert("id".into(), id.map_or(Value::Null, Value::from));
            }
        }
        Value::Object(fields)
    }

    /// Recognises a message from its structural mapping.
    ///
    /// # Errors
    ///
    /// [`MessageError::Malformed`] when the value is not a mapping, matches no
    /// variant, or carries `params` of the wrong shape.
    pub fn from_value(value: &Value) -> Result<Self, MessageError> {
        let Value::Object(fields) = value else {
            return Err(MessageError::Malformed(format!(
                "a message must be a mapping, got {}",
                value_kind(value)
            )));
        };
        let decoders: [fn(&Map<String, Value>) -> Option<Result<Self, MessageError>>; 4] =
            [decode_query, decode_notification, decode_response, decode_error];
        for decode in decoders {
            if let Some(decoded) = decode(fields) {
                return decoded;
            }
        }
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        Err(MessageError::Malformed(format!(
            "no message variant has the fields {keys:?}"
        )))
    }
}

fn decode_query(fields: &Map<String, Value>) -> Option<Result<Message, MessageError>> {
    let method = fields.get("method")?.as_str()?;
    let id = fields.get("id")?.as_u64()?;
    Some(Params::from_field(fields.get("params")).map(|params| Message::Query {
        method: method.to_owned(),
        params,
        id,
    }))
}

fn decode_notification(fields: &Map<String, Value>) -> Option<Result<Message, MessageError>> {
    let method = fields.get("method")?.as_str()?;
    if fields.contains_key("id") {
        return None;
    }
    Some(Params::from_field(fields.get("params")).map(|params| Message::Notification {
        method: method.to_owned(),
        params,
    }))
}

fn decode_response(fields: &Map<String, Value>) -> Option<Result<Message, MessageError>> {
    let result = fields.get("result")?;
    let id = fields.get("id")?.as_u64()?;
    Some(Ok(Message::Response {
        result: result.clone(),
        id,
    }))
}

fn decode_error(fields: &Map<String, Value>) -> Option<Result<Message, MessageError>> {
    let error = fields.get("error")?;
    let id = match fields.get("id") {
        None | Some(Value::Null) => None,
        Some(id) => Some(id.as_u64()?),
    };
    Some(Ok(Message::Error {
        error: error.clone(),
        id,
    }))
}

pub(crate) const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}
