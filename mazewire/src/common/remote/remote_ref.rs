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
use std::net::SocketAddr;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{Mailbox, WireEnvelope};
use crate::common::{ActorId, Request};
use crate::message::{Message, MessageError, Params, RequestId};
use crate::traits::ActorRefInterface;

/// Reference to an actor on the far side of a [`Mailbox`].
///
/// Messages are wrapped in a [`WireEnvelope`] addressed to `target` and queued
/// on the connection. Queries are correlated in the mailbox's registry.
#[derive(Clone)]
pub struct RemoteRef {
    mailbox: Mailbox,
    target: Option<String>,
    sender: Option<ActorId>,
}

impl RemoteRef {
    pub(crate) const fn new(mailbox: Mailbox, target: Option<String>) -> Self {
        Self {
            mailbox,
            target,
            sender: None,
        }
    }

    /// The name or id this reference addresses; `None` for the connection itself.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Address of the peer runtime.
    pub fn peer(&self) -> SocketAddr {
        self.mailbox.peer()
    }

    /// The connection this reference writes to.
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// A copy whose envelopes name `sender` as the actor to reply to.
    #[must_use]
    pub fn with_sender(&self, sender: Option<ActorId>) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            target: self.target.clone(),
            sender,
        }
    }

    fn envelope(&self, message: Message) -> WireEnvelope {
        WireEnvelope::new(self.target.clone(), message)
            .with_sender(self.sender.map(|id| id.to_string()))
    }

    fn send_query(&self, message: Message, request: Request) -> Request {
        let id = request.id();
        if let Err(error) = self.mailbox.push(self.envelope(message)) {
            debug!(peer = %self.peer(), id, %error, "query on a closed connection");
            let failure = MessageError::ConnectionClosed(self.peer().to_string());
            self.mailbox
                .requests()
                .resolve(id, Message::error(failure.to_value(), Some(id)));
        }
        request
    }
}

impl fmt::Debug for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRef")
            .field("target", &self.target)
            .field("peer", &self.peer())
            .field("sender", &self.sender)
            .finish()
    }
}

#[async_trait]
impl ActorRefInterface for RemoteRef {
    fn address(&self) -> String {
        match &self.target {
            Some(target) => format!("{target}@{}", self.peer()),
            None => self.peer().to_string(),
        }
    }

    fn is_alive(&self) -> bool {
        self.mailbox.is_alive()
    }

    #[instrument(skip(self, params), fields(to = %self.address()))]
    async fn notify(&self, method: &str, params: Params) {
        if let Err(error) = self
            .mailbox
            .push(self.envelope(Message::notification(method, params)))
        {
            warn!(method, %error, "notification dropped");
        }
    }

    #[instrument(skip(self, params), fields(to = %self.address()))]
    async fn query(&self, method: &str, params: Params) -> Request {
        let request = self.mailbox.requests().register();
        let message = Message::query(method, params, request.id());
        self.send_query(message, request)
    }

    async fn query_with_id(&self, method: &str, params: Params, id: RequestId) -> Request {
        match self.mailbox.requests().register_with_id(id) {
            Ok(request) => self.send_query(Message::query(method, params, id), request),
            Err(error) => Request::failed(id, &error),
        }
    }

    async fn put(&self, message: Message) {
        let kind = message.kind();
        if let Err(error) = self.mailbox.push(self.envelope(message)) {
            debug!(to = %self.address(), kind, %error, "message dropped");
        }
    }
}
