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

use mazewire::prelude::*;
use mazewire_test::prelude::*;

use crate::setup::actors::spawn_recorder;
use crate::setup::{eventually, initialize_tracing, runtime};

mod setup;

const WAIT: Duration = Duration::from_secs(3);

/// A → B → C: A faults, B (not trapping) stops with it, C (trapping) receives
/// B's exit as a message and keeps running.
#[mazewire_test]
async fn test_abnormal_exit_propagates_along_links() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let a = spawn_recorder(&runtime, ActorConfig::named("a")).await;
    let b = spawn_recorder(&runtime, ActorConfig::named("b")).await;
    let c = spawn_recorder(&runtime, ActorConfig::named("c").with_trap_exit(true)).await;
    a.link(&b)?;
    b.link(&c)?;

    let a_id = a.id().expect("local").to_string();
    let b_id = b.id().expect("local").to_string();

    a.notify("explode", Params::None).await;

    assert!(eventually(WAIT, || a.state() == Some(ActorState::Stopped)).await);
    assert!(eventually(WAIT, || b.state() == Some(ActorState::Stopped)).await);
    assert!(c.is_alive());

    let exits: Vec<ExitSignal> =
        serde_json::from_value(c.call("exits", Params::None, WAIT).await?)?;
    assert_eq!(exits, vec![ExitSignal::new(b_id, ExitReason::Linked(a_id))]);
    assert!(c.as_local().expect("local").links().is_empty());

    runtime.shutdown_all().await
}

/// A normal stop does not take linked actors down; trapping actors still hear
/// about it.
#[mazewire_test]
async fn test_normal_exit_only_reaches_trapping_links() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let leaving = spawn_recorder(&runtime, ActorConfig::new()).await;
    let plain = spawn_recorder(&runtime, ActorConfig::new()).await;
    let trapping = spawn_recorder(&runtime, ActorConfig::new().with_trap_exit(true)).await;
    leaving.link(&plain)?;
    leaving.link(&trapping)?;

    leaving.stop().await?;

    assert!(plain.is_alive());
    assert_eq!(plain.call("exits", Params::None, WAIT).await?, json!([]));
    let exits: Vec<ExitSignal> =
        serde_json::from_value(trapping.call("exits", Params::None, WAIT).await?)?;
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].reason, ExitReason::Normal);
    runtime.shutdown_all().await
}

/// Trapping can be switched on after start, and an unlinked actor is left alone.
#[mazewire_test]
async fn test_trap_exit_and_unlink() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = runtime().await;
    let faulty = spawn_recorder(&runtime, ActorConfig::new()).await;
    let watcher = spawn_recorder(&runtime, ActorConfig::new()).await;
    let bystander = spawn_recorder(&runtime, ActorConfig::new()).await;

    faulty.link(&watcher)?;
    faulty.link(&bystander)?;
    faulty.unlink(&bystander)?;
    watcher.set_trap_exit(true)?;
    assert!(faulty.link(&faulty).is_err());

    match faulty.call("explode", Params::None, WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("handler_fault")),
        Ok(value) => panic!("explode should fault, got {value}"),
    }
    assert!(eventually(WAIT, || faulty.state() == Some(ActorState::Stopped)).await);

    let exits: Vec<ExitSignal> =
        serde_json::from_value(watcher.call("exits", Params::None, WAIT).await?)?;
    assert_eq!(exits.len(), 1);
    assert!(matches!(&exits[0].reason, ExitReason::Fault(text) if text.contains("recorder exploded")));
    assert!(bystander.is_alive());
    assert_eq!(bystander.call("exits", Params::None, WAIT).await?, json!([]));

    assert!(faulty.link(&watcher).is_err());
    runtime.shutdown_all().await
}
