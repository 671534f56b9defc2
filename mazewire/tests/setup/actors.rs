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

//! Actor state types shared by the integration tests.

use mazewire::prelude::*;

/// Multiplies three integers and counts how often it was asked.
#[mazewire_actor]
pub struct Multiplier {
    pub calls: usize,
}

/// Starts a [`Multiplier`] registered under `name`.
///
/// Methods: `mult(a, b, c)`, `calls()`, `explode()` (fails the handler).
pub async fn spawn_multiplier(runtime: &ActorRuntime, name: &str) -> ActorRef {
    let mut actor = runtime.new_actor_with_name::<Multiplier>(name);
    actor
        .expose::<(i64, i64, i64), _>("mult", |actor, ctx| {
            actor.model.calls += 1;
            let (a, b, c) = *ctx.params();
            Reply::respond(ctx.reply_envelope(), a * b * c)
        })
        .describe("mult", "Multiplies three integers")
        .expose::<(), _>("calls", |actor, ctx| {
            Reply::respond(ctx.reply_envelope(), actor.model.calls)
        })
        .expose::<(), _>("explode", |_actor, _ctx| {
            Reply::fail(anyhow::anyhow!("boom"))
        });
    actor.start().await
}

/// Remembers what it is told, and every exit signal it traps.
#[mazewire_actor]
pub struct Recorder {
    pub seen: Vec<i64>,
    pub exits: Vec<ExitSignal>,
}

/// Starts a [`Recorder`].
///
/// Methods: `record(n)`, `seen()`, `exits()`, `explode()`, plus `exit` for
/// trapped exit signals.
pub async fn spawn_recorder(runtime: &ActorRuntime, config: ActorConfig) -> ActorRef {
    let mut actor = runtime.new_actor_with_config::<Recorder>(config);
    actor
        .expose::<(i64,), _>("record", |actor, ctx| {
            actor.model.seen.push(ctx.params().0);
            Reply::ready()
        })
        .expose::<(), _>("seen", |actor, ctx| {
            Reply::respond(ctx.reply_envelope(), actor.model.seen.clone())
        })
        .expose::<ExitSignal, _>(EXIT_METHOD, |actor, ctx| {
            actor.model.exits.push(ctx.params().clone());
            Reply::ready()
        })
        .expose::<(), _>("exits", |actor, ctx| {
            Reply::respond(ctx.reply_envelope(), actor.model.exits.clone())
        })
        .expose::<(), _>("explode", |_actor, _ctx| {
            Reply::fail(anyhow::anyhow!("recorder exploded"))
        });
    actor.start().await
}
