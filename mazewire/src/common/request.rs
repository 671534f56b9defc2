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

//! Correlation of queries with their replies.
//!
//! A [`RequestRegistry`] hands out ids and keeps a weak reference to the result
//! slot of every outstanding [`Request`]. Resolving an id removes its entry, so a
//! request is resolved at most once. A caller that drops its `Request` releases
//! the entry, and a reply arriving afterwards is dropped as stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use static_assertions::assert_impl_all;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::message::{Message, MessageError, RequestId};

#[derive(Debug)]
struct ResultSlot {
    sender: Mutex<Option<oneshot::Sender<Message>>>,
}

#[derive(Debug)]
struct RegistryTable {
    next_id: RequestId,
    pending: HashMap<RequestId, Weak<ResultSlot>>,
}

impl Default for RegistryTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }
}

impl RegistryTable {
    fn purge(&mut self) {
        self.pending.retain(|_, slot| slot.strong_count() > 0);
    }

    fn is_live(&self, id: RequestId) -> bool {
        self.pending
            .get(&id)
            .is_some_and(|slot| slot.strong_count() > 0)
    }
}

/// Table of outstanding queries for one actor or one connection.
///
/// Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    table: Arc<Mutex<RegistryTable>>,
}

assert_impl_all!(RequestRegistry: Send, Sync, Clone);

impl RequestRegistry {
    /// An empty registry whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh id and registers a pending request for it.
    pub fn register(&self) -> Request {
        let mut table = self.table.lock();
        table.purge();
        let mut id = table.next_id;
        while table.pending.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        table.next_id = id.wrapping_add(1);
        let (request, slot) = Request::pending(id, Arc::downgrade(&self.table));
        table.pending.insert(id, slot);
        trace!(id, "registered request");
        request
    }

    /// Registers a pending request under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// [`MessageError::DuplicateRequestId`] if `id` is already pending.
    pub fn register_with_id(&self, id: RequestId) -> Result<Request, MessageError> {
        let mut table = self.table.lock();
        table.purge();
        if table.is_live(id) {
            return Err(MessageError::DuplicateRequestId(id));
        }
        if id >= table.next_id {
            table.next_id = id.wrapping_add(1);
        }
        let (request, slot) = Request::pending(id, Arc::downgrade(&self.table));
        table.pending.insert(id, slot);
        Ok(request)
    }

    /// Delivers `message` to the request registered under `id`.
    ///
    /// Returns `false` when nothing is pending for `id`; the message is dropped.
    pub fn resolve(&self, id: RequestId, message: Message) -> bool {
        let entry = self.table.lock().pending.remove(&id);
        let Some(slot) = entry.and_then(|slot| slot.upgrade()) else {
            debug!(id, kind = message.kind(), "no pending request; dropping stale reply");
            return false;
        };
        let Some(sender) = slot.sender.lock().take() else {
            return false;
        };
        if sender.send(message).is_err() {
            debug!(id, "requester stopped waiting; reply dropped");
            return false;
        }
        trace!(id, "resolved request");
        true
    }

    /// Forgets the request registered under `id`. Returns `true` if it was pending.
    pub fn deregister(&self, id: RequestId) -> bool {
        self.table.lock().pending.remove(&id).is_some()
    }

    /// `true` while a live request is registered under `id`.
    pub fn contains(&self, id: RequestId) -> bool {
        self.table.lock().is_live(id)
    }

    /// Number of live outstanding requests.
    pub fn pending(&self) -> usize {
        self.table
            .lock()
            .pending
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Resolves every outstanding request with an `Error` carrying `error`.
    pub fn fail_all(&self, error: &MessageError) {
        let drained: Vec<(RequestId, Weak<ResultSlot>)> =
            self.table.lock().pending.drain().collect();
        let payload = error.to_value();
        for (id, slot) in drained {
            let Some(slot) = slot.upgrade() else { continue };
            let sender = slot.sender.lock().take();
            if let Some(sender) = sender {
                let _ = sender.send(Message::error(payload.clone(), Some(id)));
            }
        }
    }
}

/// Why waiting on a [`Request`] produced no result value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No reply arrived within the given time.
    Timeout(Duration),
    /// The reply was an `Error`; carries its payload.
    Remote(Value),
    /// The reply slot was abandoned without a reply.
    Disconnected,
}

impl QueryError {
    /// The `kind` field of a remote error payload, when it has one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Remote(payload) => payload.get("kind").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "no reply within {after:?}"),
            Self::Remote(payload) => write!(f, "query failed: {payload}"),
            Self::Disconnected => write!(f, "reply slot closed without a reply"),
        }
    }
}

impl std::error::Error for QueryError {}

/// A pending query result.
///
/// Holding the request keeps its registry entry alive; dropping it (or timing
/// out in [`wait`](Self::wait)) releases the entry.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    receiver: Option<oneshot::Receiver<Message>>,
    outcome: Option<Message>,
    slot: Option<Arc<ResultSlot>>,
    registry: Weak<Mutex<RegistryTable>>,
}

assert_impl_all!(Request: Send);

impl Request {
    fn pending(id: RequestId, registry: Weak<Mutex<RegistryTable>>) -> (Self, Weak<ResultSlot>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(ResultSlot {
            sender: Mutex::new(Some(sender)),
        });
        let weak = Arc::downgrade(&slot);
        let request = Self {
            id,
            receiver: Some(receiver),
            outcome: None,
            slot: Some(slot),
            registry,
        };
        (request, weak)
    }

    /// A request that is already resolved with an `Error` carrying `error`.
    pub fn failed(id: RequestId, error: &MessageError) -> Self {
        Self {
            id,
            receiver: None,
            outcome: Some(Message::error(error.to_value(), Some(id))),
            slot: None,
            registry: Weak::new(),
        }
    }

    /// The correlation id.
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// `true` once a reply has arrived. Never blocks.
    pub fn is_resolved(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return false;
        };
        match receiver.try_recv() {
            Ok(message) => {
                self.receiver = None;
                self.outcome = Some(message);
                self.release();
                true
            }
            Err(_) => false,
        }
    }

    /// Waits up to `timeout` for the reply message.
    ///
    /// A timed-out request is deregistered, so a late reply is dropped. Once a
    /// reply has arrived, later calls return it again.
    ///
    /// # Errors
    ///
    /// [`QueryError::Timeout`] or [`QueryError::Disconnected`].
    pub async fn wait(&mut self, timeout: Duration) -> Result<Message, QueryError> {
        if let Some(message) = &self.outcome {
            return Ok(message.clone());
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(QueryError::Disconnected);
        };
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(message)) => {
                self.receiver = None;
                self.outcome = Some(message.clone());
                self.release();
                Ok(message)
            }
            Ok(Err(_)) => {
                self.receiver = None;
                self.release();
                Err(QueryError::Disconnected)
            }
            Err(_) => {
                debug!(id = self.id, ?timeout, "query timed out");
                self.release();
                Err(QueryError::Timeout(timeout))
            }
        }
    }

    /// Waits up to `timeout` for the result value.
    ///
    /// # Errors
    ///
    /// [`QueryError::Remote`] carrying the payload when the reply was an `Error`,
    /// otherwise as for [`wait`](Self::wait).
    pub async fn get(&mut self, timeout: Duration) -> Result<Value, QueryError> {
        match self.wait(timeout).await? {
            Message::Response { result, .. } => Ok(result),
            Message::Error { error, .. } => Err(QueryError::Remote(error)),
            other => Err(QueryError::Remote(
                MessageError::Malformed(format!("a {} cannot answer a query", other.kind()))
                    .to_value(),
            )),
        }
    }

    fn release(&mut self) {
        if let Some(table) = self.registry.upgrade() {
            let mut table = table.lock();
            let own_entry = match (table.pending.get(&self.id), self.slot.as_ref()) {
                (Some(entry), Some(slot)) => entry.ptr_eq(&Arc::downgrade(slot)),
                _ => false,
            };
            if own_entry {
                table.pending.remove(&self.id);
            }
        }
        self.registry = Weak::new();
        self.slot = None;
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        self.release();
    }
}
