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

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::common::{ActorRef, QueryError};
use crate::message::Message;
use crate::traits::ActorRefInterface;

/// Forwards messages to a fixed destination.
///
/// Notifications and replies pass straight through. A query is re-issued to
/// the destination and its outcome is sent back to `reply_to` under the
/// original id, so the caller never sees the relay's own correlation id.
#[derive(Debug, Clone)]
pub struct Relay {
    destination: ActorRef,
    timeout: Duration,
}

impl Relay {
    /// A relay to `destination` that waits up to `timeout` for query results.
    pub const fn new(destination: ActorRef, timeout: Duration) -> Self {
        Self {
            destination,
            timeout,
        }
    }

    /// Where messages are forwarded.
    pub const fn destination(&self) -> &ActorRef {
        &self.destination
    }

    /// Forwards one message.
    ///
    /// For a query this returns once the query has been sent; the outcome is
    /// delivered to `reply_to` from a separate task. A query that times out or
    /// whose reply slot closes is dropped and the caller runs into its own timeout.
    pub async fn forward(&self, message: Message, reply_to: Option<ActorRef>) {
        match message {
            Message::Notification { method, params } => {
                trace!(%method, to = %self.destination.address(), "relaying notification");
                self.destination.notify(&method, params).await;
            }
            Message::Query { method, params, id } => {
                let mut request = self.destination.query(&method, params).await;
                let timeout = self.timeout;
                tokio::spawn(async move {
                    let reply = match request.wait(timeout).await {
                        Ok(Message::Response { result, .. }) => Message::response(result, id),
                        Ok(Message::Error { error, .. }) => Message::error(error, Some(id)),
                        Ok(other) => {
                            warn!(kind = other.kind(), "relay dropped a non-reply answer");
                            return;
                        }
                        Err(error @ (QueryError::Timeout(_) | QueryError::Disconnected)) => {
                            debug!(%method, id, %error, "relayed query got no reply");
                            return;
                        }
                        Err(QueryError::Remote(error)) => Message::error(error, Some(id)),
                    };
                    match reply_to {
                        Some(reply_to) => reply_to.put(reply).await,
                        None => debug!(%method, id, "relayed query has nobody to answer"),
                    }
                });
            }
            reply => self.destination.put(reply).await,
        }
    }
}
