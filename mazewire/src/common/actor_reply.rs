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

//! Helpers for building the [`FutureBox`] every handler returns.
//!
//! ```ignore
//! // Answer a query with a value
//! actor.expose::<(i64, i64), _>("add", |_actor, ctx| {
//!     let (a, b) = *ctx.params();
//!     Reply::respond(ctx.reply_envelope(), a + b)
//! });
//!
//! // Mutate state, nothing to send back
//! actor.expose::<(), _>("tick", |actor, _ctx| {
//!     actor.model.ticks += 1;
//!     Reply::ready()
//! });
//!
//! // Fail the handler; the actor stops with a fault
//! actor.expose::<(), _>("explode", |_actor, _ctx| Reply::fail(anyhow::anyhow!("boom")));
//! ```

use std::future::Future;

use serde::Serialize;

use crate::common::FutureBox;
use crate::message::ReplyEnvelope;

/// Namespace for handler return values.
pub struct Reply;

impl Reply {
    /// A handler that has nothing left to do.
    #[inline]
    #[must_use]
    pub fn ready() -> FutureBox {
        Box::pin(async { Ok(()) })
    }

    /// Runs `future` as the rest of the handler.
    #[inline]
    pub fn pending<F>(future: F) -> FutureBox
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Box::pin(async move {
            future.await;
            Ok(())
        })
    }

    /// Runs a fallible `future` as the rest of the handler. An `Err` is a fault.
    #[inline]
    pub fn try_pending<F>(future: F) -> FutureBox
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Box::pin(future)
    }

    /// Sends `value` as the response (a no-op for notifications) and finishes.
    #[inline]
    pub fn respond<T>(reply: ReplyEnvelope, value: T) -> FutureBox
    where
        T: Serialize + Send + 'static,
    {
        Box::pin(async move {
            reply.send(value).await;
            Ok(())
        })
    }

    /// A handler that has failed.
    #[inline]
    pub fn fail(error: impl Into<anyhow::Error>) -> FutureBox {
        let error = error.into();
        Box::pin(async move { Err(error) })
    }
}
