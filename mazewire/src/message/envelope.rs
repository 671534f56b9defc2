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

use crate::actor::ExitSignal;
use crate::common::ActorRef;
use crate::message::{Message, SystemSignal};

/// A message on its way into an actor's inbox.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) message: Message,
    /// Where a `Response`/`Error` for a query should go.
    pub(crate) reply_to: Option<ActorRef>,
    /// The actor that originated the message, when known.
    pub(crate) sender: Option<ActorRef>,
}

impl Envelope {
    pub(crate) const fn new(message: Message) -> Self {
        Self {
            message,
            reply_to: None,
            sender: None,
        }
    }

    pub(crate) fn with_reply_to(mut self, reply_to: Option<ActorRef>) -> Self {
        self.reply_to = reply_to;
        self
    }

    pub(crate) fn with_sender(mut self, sender: Option<ActorRef>) -> Self {
        self.sender = sender;
        self
    }
}

/// Everything an actor's processing loop can dequeue.
#[derive(Debug)]
pub(crate) enum Inbound {
    Message(Envelope),
    Exit(ExitSignal),
    Signal(SystemSignal),
}
