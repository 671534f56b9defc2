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

//! Shared type aliases for handler futures and type-erased handlers, plus [`ActorId`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::actor::{ManagedActor, Started};
use crate::message::{Envelope, MessageError};

/// What every handler and lifecycle hook resolves to. An `Err` is a fault.
pub type HandlerResult = anyhow::Result<()>;

/// A pinned, boxed, `Send` future returned by handlers and lifecycle hooks.
pub type FutureBox = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Crate-internal: a handler registered with `expose`, after parameter decoding
/// has been folded in. Decoding failures are reported before any future exists.
pub(crate) type MethodHandler<State> = dyn for<'a, 'b> Fn(
        &'a mut ManagedActor<Started, State>,
        &'b mut Envelope,
    ) -> Result<FutureBox, MessageError>
    + Send
    + Sync
    + 'static;

/// Crate-internal: the catch-all handler registered with `on_message`.
pub(crate) type RawHandler<State> = dyn for<'a, 'b> Fn(&'a mut ManagedActor<Started, State>, &'b mut Envelope) -> FutureBox
    + Send
    + Sync
    + 'static;

/// Crate-internal: an `on_start`/`on_stop` hook.
pub(crate) type LifecycleHook<State> =
    Box<dyn Fn(&ManagedActor<Started, State>) -> FutureBox + Send + Sync + 'static>;

/// Process-unique actor identity, written as 16 lower-case hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub(crate) fn random() -> Self {
        Self(rand::random())
    }

    /// Wraps a raw identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({self})")
    }
}

impl FromStr for ActorId {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(MessageError::Malformed(format!(
                "actor id '{s}' is not 16 hex digits"
            )));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| MessageError::Malformed(format!("actor id '{s}': {e}")))
    }
}

impl Serialize for ActorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
