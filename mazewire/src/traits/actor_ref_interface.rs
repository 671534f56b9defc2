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

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{QueryError, Request};
use crate::message::{Message, Params, RequestId};

/// Messaging operations shared by local and remote actor references.
///
/// Implemented by [`LocalRef`](crate::common::LocalRef),
/// [`RemoteRef`](crate::remote::RemoteRef) and the [`ActorRef`](crate::common::ActorRef)
/// enum that wraps both, so callers never need to know where an actor lives.
#[async_trait]
pub trait ActorRefInterface: Send + Sync + Debug + Clone + 'static {
    /// Text address: the actor id for local actors, `name@host:port` for remote ones.
    fn address(&self) -> String;

    /// `false` once the actor (or the connection to it) is known to be gone.
    fn is_alive(&self) -> bool;

    /// Sends a notification. Delivery failures are logged, never reported.
    async fn notify(&self, method: &str, params: Params);

    /// Sends a query and returns the pending [`Request`] for its result.
    ///
    /// If the query cannot be delivered the request is resolved with an `Error`
    /// at once, so waiting on it never hangs on a dead target.
    async fn query(&self, method: &str, params: Params) -> Request;

    /// As [`query`](Self::query), correlated under a caller-chosen id.
    ///
    /// An id that is already pending yields a request resolved with a
    /// `duplicate_request_id` error.
    async fn query_with_id(&self, method: &str, params: Params, id: RequestId) -> Request;

    /// Enqueues a prebuilt message without registering anything.
    async fn put(&self, message: Message);

    /// Sends a query and waits up to `timeout` for its result value.
    ///
    /// # Errors
    ///
    /// See [`Request::get`].
    async fn call(&self, method: &str, params: Params, timeout: Duration) -> Result<Value, QueryError> {
        let mut request = self.query(method, params).await;
        request.get(timeout).await
    }
}
