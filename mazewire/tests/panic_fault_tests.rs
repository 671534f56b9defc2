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
#![allow(dead_code, unused_doc_comments)]

// Panicking handlers live in their own test binary: `#[mazewire_test]` fails
// any test that observes a panic, and its hook is process-wide.

use mazewire::prelude::*;

use crate::setup::actors::spawn_recorder;
use crate::setup::{eventually, initialize_tracing, runtime};

mod setup;

const WAIT: Duration = Duration::from_secs(3);

#[mazewire_actor]
struct Fragile;

async fn spawn_fragile(runtime: &ActorRuntime) -> ActorRef {
    let mut actor = runtime.new_actor_with_name::<Fragile>("fragile");
    actor
        .expose::<(), _>("panic_now", |_actor, _ctx| panic!("handler blew up"))
        .expose::<(), _>("panic_later", |_actor, _ctx| {
            Reply::pending(async {
                panic!("future blew up");
            })
        });
    actor.start().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panic_in_handler_answers_handler_fault() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let fragile = spawn_fragile(&runtime).await;

    match fragile.call("panic_now", Params::None, WAIT).await {
        Err(error) => {
            assert_eq!(error.kind(), Some("handler_fault"));
            assert!(error.to_string().contains("handler blew up"));
        }
        Ok(value) => panic!("a panicking handler answered {value}"),
    }
    assert!(eventually(WAIT, || fragile.state() == Some(ActorState::Stopped)).await);
    runtime.shutdown_all().await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panic_in_handler_future_stops_linked_actors() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let fragile = spawn_fragile(&runtime).await;
    let partner = spawn_recorder(&runtime, ActorConfig::new()).await;
    fragile.link(&partner)?;

    match fragile.call("panic_later", Params::None, WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("handler_fault")),
        Ok(value) => panic!("a panicking future answered {value}"),
    }
    assert!(eventually(WAIT, || partner.state() == Some(ActorState::Stopped)).await);
    assert_eq!(runtime.actor_count(), 0);
    runtime.shutdown_all().await
}
