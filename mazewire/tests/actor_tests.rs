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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mazewire::prelude::*;
use mazewire_test::prelude::*;
use tokio::sync::Notify;

use crate::setup::actors::{spawn_multiplier, spawn_recorder};
use crate::setup::{eventually, initialize_tracing, runtime};

mod setup;

const WAIT: Duration = Duration::from_secs(3);

/// A local query is answered with the handler's value, and the handler sees
/// the actor's own state.
#[mazewire_test]
async fn test_local_query_round_trip() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let multiplier = spawn_multiplier(&runtime, "multiplier").await;

    let product = multiplier
        .call("mult", json!([2, 3, 4]).into(), WAIT)
        .await?;
    assert_eq!(product, json!(24));
    let product = multiplier
        .call("mult", json!([-1, 5, 7]).into(), WAIT)
        .await?;
    assert_eq!(product, json!(-35));
    assert_eq!(multiplier.call("calls", Params::None, WAIT).await?, json!(2));

    runtime.shutdown_all().await
}

/// A reply reaches the caller as soon as the handler sends it, not when the
/// handler's future completes.
#[mazewire_test]
async fn test_local_reply_is_not_held_by_the_handler() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let mut actor = runtime.new_actor_with_name::<()>("eager");
    actor.expose::<(), _>("answer", |_actor, ctx| {
        let reply = ctx.reply_envelope();
        Reply::pending(async move {
            reply.send(42).await;
            tokio::time::sleep(Duration::from_millis(1500)).await;
        })
    });
    let eager = actor.start().await;

    let mut request = eager.query("answer", Params::None).await;
    assert_eq!(request.get(Duration::from_millis(500)).await?, json!(42));
    assert_eq!(eager.as_local().map(LocalRef::pending_queries), Some(0));

    runtime.shutdown_all().await
}

/// Unknown methods and undecodable params produce Error replies and leave the
/// actor running.
#[mazewire_test]
async fn test_dispatch_errors_are_replies() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let multiplier = spawn_multiplier(&runtime, "multiplier").await;

    let unknown = multiplier.call("divide", json!([1, 2]).into(), WAIT).await;
    match unknown {
        Err(error) => assert_eq!(error.kind(), Some("unknown_method")),
        Ok(value) => panic!("divide should not succeed, got {value}"),
    }

    let invalid = multiplier.call("mult", json!(["two", 3, 4]).into(), WAIT).await;
    match invalid {
        Err(error) => assert_eq!(error.kind(), Some("invalid_params")),
        Ok(value) => panic!("string factors should not decode, got {value}"),
    }

    // A notification with bad params is dropped without a reply.
    multiplier.notify("mult", json!({"a": 1}).into()).await;

    assert!(multiplier.is_alive());
    assert_eq!(multiplier.call("calls", Params::None, WAIT).await?, json!(0));
    runtime.shutdown_all().await
}

/// Messages from one sender are processed in the order they were sent, even
/// while other senders interleave with it.
#[mazewire_test]
async fn test_fifo_per_sender() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let recorder = spawn_recorder(&runtime, ActorConfig::new()).await;

    let senders = (0..4_i64).map(|sender| {
        let recorder = recorder.clone();
        tokio::spawn(async move {
            for n in 0..25_i64 {
                recorder.notify("record", json!([sender * 100 + n]).into()).await;
            }
        })
    });
    for sender in futures::future::join_all(senders).await {
        sender?;
    }

    let seen: Vec<i64> = serde_json::from_value(recorder.call("seen", Params::None, WAIT).await?)?;
    assert_eq!(seen.len(), 100);
    for sender in 0..4_i64 {
        let own: Vec<i64> = seen
            .iter()
            .copied()
            .filter(|n| n / 100 == sender)
            .collect();
        let expected: Vec<i64> = (0..25).map(|n| sender * 100 + n).collect();
        assert_eq!(own, expected, "sender {sender} was reordered");
    }
    runtime.shutdown_all().await
}

/// `introspect` lists every exposed method with its documentation.
#[mazewire_test]
async fn test_introspection() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let multiplier = spawn_multiplier(&runtime, "multiplier").await;

    let listing = multiplier.call(INTROSPECT_METHOD, Params::None, WAIT).await?;
    assert_eq!(
        listing,
        json!({"calls": null, "explode": null, "mult": "Multiplies three integers"})
    );
    let doc = multiplier.call("introspect:mult", Params::None, WAIT).await?;
    assert_eq!(doc, json!("Multiplies three integers"));

    match multiplier.call("introspect:divide", Params::None, WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("unknown_method")),
        Ok(value) => panic!("divide is not exposed, got {value}"),
    }
    runtime.shutdown_all().await
}

/// A handler that returns `Err` answers its query with `handler_fault` and
/// stops the actor.
#[mazewire_test]
async fn test_handler_error_is_a_fault() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let multiplier = spawn_multiplier(&runtime, "multiplier").await;
    assert_eq!(runtime.actor_count(), 1);

    match multiplier.call("explode", Params::None, WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("handler_fault")),
        Ok(value) => panic!("explode should fault, got {value}"),
    }
    assert!(eventually(WAIT, || multiplier.state() == Some(ActorState::Stopped)).await);
    assert_eq!(runtime.actor_count(), 0);
    assert!(runtime.lookup("multiplier").is_none());

    match multiplier.call("mult", json!([1, 2, 3]).into(), WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("actor_stopped")),
        Ok(value) => panic!("a stopped actor answered with {value}"),
    }
    runtime.shutdown_all().await
}

/// Stopping lets the running handler finish, answers everything still queued
/// with `actor_stopped`, then runs `on_stop`.
#[mazewire_test]
async fn test_stop_drains_the_inbox() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let started = Arc::new(Notify::new());
    let stopped = Arc::new(AtomicBool::new(false));

    let mut actor = runtime.new_actor_with_name::<()>("sleeper");
    let signal = started.clone();
    let flag = stopped.clone();
    actor
        .expose::<(), _>("slow", move |_actor, ctx| {
            signal.notify_one();
            let reply = ctx.reply_envelope();
            Reply::pending(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                reply.send("done").await;
            })
        })
        .on_stop(move |_actor| {
            flag.store(true, Ordering::SeqCst);
            Reply::ready()
        });
    let sleeper = actor.start().await;

    let mut first = sleeper.query("slow", Params::None).await;
    started.notified().await;
    let mut second = sleeper.query("slow", Params::None).await;
    let mut third = sleeper.query("slow", Params::None).await;

    sleeper.stop().await?;
    assert_eq!(sleeper.state(), Some(ActorState::Stopped));
    assert!(stopped.load(Ordering::SeqCst));
    assert!(runtime.lookup("sleeper").is_none());

    assert_eq!(first.get(WAIT).await?, json!("done"));
    for pending in [&mut second, &mut third] {
        match pending.get(WAIT).await {
            Err(error) => assert_eq!(error.kind(), Some("actor_stopped")),
            Ok(value) => panic!("queued query should have been refused, got {value}"),
        }
    }
    runtime.shutdown_all().await
}

/// `terminate` lets everything already queued run first.
#[mazewire_test]
async fn test_terminate_processes_queued_messages() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let recorder = spawn_recorder(&runtime, ActorConfig::new()).await;
    let mut seen = recorder.query("seen", Params::None).await;
    for n in 1..=3 {
        recorder.notify("record", json!([n]).into()).await;
    }
    let mut after = recorder.query("seen", Params::None).await;

    recorder.terminate().await?;
    assert_eq!(seen.get(WAIT).await?, json!([]));
    assert_eq!(after.get(WAIT).await?, json!([1, 2, 3]));
    assert!(!recorder.is_alive());
    runtime.shutdown_all().await
}

/// A suspended actor queues messages and processes them after `resume`.
#[mazewire_test]
async fn test_suspend_and_resume() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let recorder = spawn_recorder(&runtime, ActorConfig::new()).await;

    recorder.suspend()?;
    assert!(eventually(WAIT, || recorder.state() == Some(ActorState::Paused)).await);
    recorder.notify("record", json!([7]).into()).await;

    let mut waiting = recorder.query("seen", Params::None).await;
    assert!(matches!(
        waiting.wait(Duration::from_millis(100)).await,
        Err(QueryError::Timeout(_))
    ));

    recorder.resume()?;
    assert_eq!(recorder.call("seen", Params::None, WAIT).await?, json!([7]));
    assert_eq!(recorder.state(), Some(ActorState::Running));
    runtime.shutdown_all().await
}

/// Names resolve to live local actors; re-registration moves the name.
#[mazewire_test]
async fn test_name_table() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let first = spawn_multiplier(&runtime, "multiplier").await;
    let recorder = spawn_recorder(&runtime, ActorConfig::named("recorder")).await;

    assert_eq!(runtime.lookup("multiplier"), Some(first.clone()));
    let id = first.id().expect("local actor has an id");
    assert_eq!(runtime.lookup(&id.to_string()), Some(first.clone()));

    runtime.register("alias", &recorder)?;
    assert_eq!(runtime.lookup("alias"), Some(recorder.clone()));
    runtime.register("alias", &first)?;
    assert_eq!(runtime.lookup("alias"), Some(first.clone()));
    assert_eq!(runtime.unregister("alias"), Some(id));
    assert!(runtime.lookup("alias").is_none());
    assert!(runtime.lookup("nobody").is_none());

    recorder.stop().await?;
    assert!(runtime.lookup("recorder").is_none());
    runtime.shutdown_all().await
}

/// `shutdown_all` stops every actor.
#[mazewire_test]
async fn test_shutdown_all_stops_everything() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let actors = vec![
        spawn_multiplier(&runtime, "one").await,
        spawn_multiplier(&runtime, "two").await,
        spawn_recorder(&runtime, ActorConfig::new()).await,
    ];
    assert_eq!(runtime.actor_count(), 3);

    runtime.shutdown_all().await?;
    assert_eq!(runtime.actor_count(), 0);
    for actor in actors {
        assert_eq!(actor.state(), Some(ActorState::Stopped));
    }
    Ok(())
}

/// A relay forwards queries and notifications and answers under the caller's id.
#[mazewire_test]
async fn test_relay_forwards_to_destination() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let multiplier = spawn_multiplier(&runtime, "multiplier").await;
    let relay = runtime.spawn_relay(multiplier.clone()).await;

    assert_eq!(relay.call("mult", json!([3, 3, 3]).into(), WAIT).await?, json!(27));
    match relay.call("divide", Params::None, WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("unknown_method")),
        Ok(value) => panic!("divide should not succeed through a relay, got {value}"),
    }

    let mut chosen = relay.query_with_id("mult", json!([1, 2, 3]).into(), 4_242).await;
    assert_eq!(chosen.id(), 4_242);
    assert_eq!(chosen.get(WAIT).await?, json!(6));

    assert_eq!(multiplier.call("calls", Params::None, WAIT).await?, json!(2));
    runtime.shutdown_all().await
}
