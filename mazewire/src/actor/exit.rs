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

//! Exit reasons and the exit signals linked actors exchange.
//!
//! When an actor stops, every actor linked to it receives an [`ExitSignal`]
//! naming the stopped actor and the [`ExitReason`]. A receiver that traps exits
//! gets the signal as an `exit` notification; otherwise a normal exit is
//! ignored and any other exit stops the receiver too.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{Message, Params};

/// Method name under which trapped exit signals are delivered.
pub const EXIT_METHOD: &str = "exit";

/// Why an actor stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExitReason {
    /// Requested stop, terminate signal, or inbox closed.
    Normal,
    /// A handler or lifecycle hook failed; carries the failure text.
    Fault(String),
    /// A linked actor exited abnormally; carries its address.
    Linked(String),
    /// The connection owning the actor was lost; carries the peer address.
    ConnectionLost(String),
}

impl ExitReason {
    /// `true` only for [`ExitReason::Normal`].
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string());
        Self::Fault(text)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Fault(reason) => write!(f, "fault: {reason}"),
            Self::Linked(from) => write!(f, "linked actor {from} exited"),
            Self::ConnectionLost(peer) => write!(f, "connection to {peer} lost"),
        }
    }
}

/// Notification that a linked actor (or an owning connection) has stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSignal {
    /// Address of the actor or connection that exited.
    pub from: String,
    /// Why it exited.
    pub reason: ExitReason,
}

impl ExitSignal {
    /// Builds a signal.
    pub fn new(from: impl Into<String>, reason: ExitReason) -> Self {
        Self {
            from: from.into(),
            reason,
        }
    }

    /// The `exit` notification a trapping actor receives.
    pub(crate) fn into_message(self) -> Message {
        let mut params = Map::new();
        let reason = serde_json::to_value(&self.reason)
            .unwrap_or_else(|_| Value::String(self.reason.to_string()));
        params.insert("from".into(), Value::String(self.from));
        params.insert("reason".into(), reason);
        Message::notification(EXIT_METHOD, Params::Named(params))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn exit_reason_display_and_normality() {
        assert!(ExitReason::Normal.is_normal());
        assert!(!ExitReason::Fault("boom".into()).is_normal());
        assert_eq!(ExitReason::Fault("boom".into()).to_string(), "fault: boom");
        assert_eq!(
            ExitReason::Linked("00000000000000aa".into()).to_string(),
            "linked actor 00000000000000aa exited"
        );
    }

    #[test]
    fn trapped_exit_becomes_a_named_notification() {
        let message = ExitSignal::new("a", ExitReason::Fault("boom".into())).into_message();
        assert_eq!(
            message.to_value(),
            json!({
                "method": "exit",
                "params": {"from": "a", "reason": {"kind": "fault", "detail": "boom"}}
            })
        );
        let decoded: ExitSignal = message
            .params()
            .expect("notification has params")
            .decode()
            .expect("decodes back into a signal");
        assert_eq!(decoded.reason, ExitReason::Fault("boom".into()));
    }

    #[test]
    fn panic_payloads_become_fault_text() {
        let payload: Box<dyn Any + Send> = Box::new("went sideways");
        assert_eq!(
            ExitReason::from_panic(payload.as_ref()),
            ExitReason::Fault("went sideways".into())
        );
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(
            ExitReason::from_panic(payload.as_ref()),
            ExitReason::Fault("owned".into())
        );
    }
}
