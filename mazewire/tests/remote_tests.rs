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

use futures::future::join_all;
use mazewire::prelude::*;
use mazewire::remote::wire::Connection;
use mazewire_test::prelude::*;
use tokio::net::TcpStream;

use crate::setup::actors::{spawn_multiplier, spawn_recorder};
use crate::setup::{eventually, initialize_tracing, runtime, within};

mod setup;

const WAIT: Duration = Duration::from_secs(3);
const HOST: &str = "127.0.0.1";

/// A server runtime with a `multiplier` and a listener on an ephemeral port.
async fn serve() -> anyhow::Result<(ActorRuntime, ListenerHandle)> {
    let server = runtime().await;
    spawn_multiplier(&server, "multiplier").await;
    let listener = server.start_listener(HOST, 0).await?;
    assert_ne!(listener.local_addr().port(), 0);
    Ok((server, listener))
}

/// Client A asks the remote multiplier for 2·3·4 over TCP.
#[mazewire_test]
async fn test_remote_query_end_to_end() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let multiplier = client.actor_for("multiplier", HOST, port).await?;
    assert!(!multiplier.is_local());
    assert_eq!(multiplier.address(), format!("multiplier@{HOST}:{port}"));

    let product = multiplier.call("mult", json!([2, 3, 4]).into(), WAIT).await?;
    assert_eq!(product, json!(24));

    assert!(multiplier.stop().await.is_err());
    assert!(multiplier.suspend().is_err());

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// Two clients query concurrently; each gets its own answers.
#[mazewire_test]
async fn test_concurrent_clients_do_not_cross_talk() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client_a = runtime().await;
    let client_b = runtime().await;
    let a = client_a.actor_for("multiplier", HOST, port).await?;
    let b = client_b.actor_for("multiplier", HOST, port).await?;

    let queries_a = join_all((1..=20_i64).map(|n| {
        let a = a.clone();
        async move { (n * 6, a.call("mult", json!([n, 2, 3]).into(), WAIT).await) }
    }));
    let queries_b = join_all((1..=20_i64).map(|n| {
        let b = b.clone();
        async move { (n * 35, b.call("mult", json!([n, 5, 7]).into(), WAIT).await) }
    }));
    let (answers_a, answers_b) = tokio::join!(queries_a, queries_b);

    for (expected, answer) in answers_a.into_iter().chain(answers_b) {
        assert_eq!(answer?, json!(expected));
    }

    let stats = listener.stats();
    assert_eq!(stats.connections_accepted(), 2);
    assert_eq!(stats.connections_active(), 2);
    assert!(stats.frames_routed() >= 40);
    assert_eq!(listener.registry().peer_count(), 2);
    assert!(listener.registry().names().contains(&"multiplier".to_string()));

    client_a.shutdown_all().await?;
    client_b.shutdown_all().await?;
    assert!(
        eventually(WAIT, || {
            listener.registry().peer_count() == 0 && listener.stats().connections_active() == 0
        })
        .await
    );
    server.shutdown_all().await
}

/// References to the same `host:port` share one connection.
#[mazewire_test]
async fn test_connections_are_reused() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let first = client.actor_for("multiplier", HOST, port).await?;
    let second = client.actor_for("multiplier", HOST, port).await?;
    let first = first.as_remote().expect("remote");
    let second = second.as_remote().expect("remote");
    assert_eq!(first.mailbox().local_addr(), second.mailbox().local_addr());
    assert_eq!(first.peer(), listener.local_addr());

    assert_eq!(first.call("mult", json!([1, 1, 1]).into(), WAIT).await?, json!(1));
    assert_eq!(listener.stats().connections_accepted(), 1);

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// Concurrent first contacts to one `host:port` open a single connection, and
/// shutting the client down closes it on both ends.
#[mazewire_test]
async fn test_concurrent_actor_for_shares_one_connection() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let (first, second) = tokio::join!(
        client.actor_for("multiplier", HOST, port),
        client.actor_for("multiplier", HOST, port)
    );
    let (first, second) = (first?, second?);
    let first_mailbox = first.as_remote().expect("remote").mailbox().clone();
    let second_mailbox = second.as_remote().expect("remote").mailbox().clone();
    assert_eq!(first_mailbox.local_addr(), second_mailbox.local_addr());
    assert_eq!(listener.stats().connections_accepted(), 1);

    assert_eq!(first.call("mult", json!([1, 2, 3]).into(), WAIT).await?, json!(6));
    assert_eq!(second.call("mult", json!([2, 3, 4]).into(), WAIT).await?, json!(24));

    client.shutdown_all().await?;
    assert!(!first_mailbox.is_alive());
    assert!(eventually(WAIT, || listener.stats().connections_active() == 0).await);
    server.shutdown_all().await
}

/// A query for a name nobody registered comes back as an error, not a hang.
#[mazewire_test]
async fn test_unknown_destination_is_an_error() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let nobody = client.actor_for("nobody", HOST, port).await?;
    let answer = within(WAIT, nobody.call("mult", json!([1, 2, 3]).into(), WAIT)).await?;
    match answer {
        Err(error) => assert_eq!(error.kind(), Some("actor_not_found")),
        Ok(value) => panic!("nobody answered with {value}"),
    }

    // The connection survives and still reaches registered actors.
    let multiplier = client.actor_for("multiplier", HOST, port).await?;
    assert_eq!(multiplier.call("mult", json!([2, 2, 2]).into(), WAIT).await?, json!(8));

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// Once the listener has stopped, the client's next query fails fast.
#[mazewire_test]
async fn test_query_fails_fast_after_listener_stops() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let multiplier = client.actor_for("multiplier", HOST, port).await?;
    assert_eq!(multiplier.call("mult", json!([2, 3, 4]).into(), WAIT).await?, json!(24));

    listener.stop().await;
    assert!(!listener.is_running());

    let answer = within(WAIT, multiplier.call("mult", json!([2, 3, 4]).into(), WAIT)).await?;
    match answer {
        Err(error) => assert_eq!(error.kind(), Some("connection_closed")),
        Ok(value) => panic!("a stopped listener answered with {value}"),
    }
    assert!(eventually(WAIT, || !multiplier.is_alive()).await);
    assert!(client.actor_for("multiplier", HOST, port).await.is_err());

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// A lost connection sends `connection_lost` to its owner: a trapping owner
/// records it, a non-trapping owner stops.
#[mazewire_test]
async fn test_connection_loss_reaches_the_owner() -> anyhow::Result<()> {
    initialize_tracing();
    let (trapping_server, trapping_listener) = serve().await?;
    let (plain_server, plain_listener) = serve().await?;

    let client = runtime().await;
    let trapping_owner = spawn_recorder(&client, ActorConfig::new().with_trap_exit(true)).await;
    let plain_owner = spawn_recorder(&client, ActorConfig::new()).await;

    let to_trapping = client
        .actor_for("multiplier", HOST, trapping_listener.local_addr().port())
        .await?;
    let to_plain = client
        .actor_for("multiplier", HOST, plain_listener.local_addr().port())
        .await?;
    let trapping_mailbox = to_trapping.as_remote().expect("remote").mailbox().clone();
    let plain_mailbox = to_plain.as_remote().expect("remote").mailbox().clone();
    trapping_mailbox.set_owner(trapping_owner.clone());
    plain_mailbox.set_owner(plain_owner.clone());

    trapping_listener.stop().await;
    plain_listener.stop().await;

    let peer = trapping_mailbox.peer().to_string();
    let expected = json!([ExitSignal::new(
        peer.clone(),
        ExitReason::ConnectionLost(peer)
    )]);
    let recorded = within(WAIT, async {
        loop {
            let exits = trapping_owner.call("exits", Params::None, WAIT).await?;
            if exits != json!([]) {
                return anyhow::Ok(exits);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await??;
    assert_eq!(recorded, expected);
    assert_eq!(recorded[0]["reason"]["kind"], json!("connection_lost"));
    assert!(trapping_owner.is_alive());

    assert!(eventually(WAIT, || plain_owner.state() == Some(ActorState::Stopped)).await);

    client.shutdown_all().await?;
    trapping_server.shutdown_all().await?;
    plain_server.shutdown_all().await
}

/// Notifications, names registered after start, introspection and sender
/// identity all work across the connection.
#[mazewire_test]
async fn test_notifications_and_registered_names() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();
    let recorder = spawn_recorder(&server, ActorConfig::new()).await;
    server.register("recorder", &recorder)?;

    let client = runtime().await;
    let remote = client.actor_for("recorder", HOST, port).await?;
    for n in [3, 1, 2] {
        remote.notify("record", json!([n]).into()).await;
    }
    assert_eq!(remote.call("seen", Params::None, WAIT).await?, json!([3, 1, 2]));

    let local_sender = spawn_recorder(&client, ActorConfig::new()).await;
    let stamped = remote.with_sender(&local_sender);
    assert_eq!(stamped.call("seen", Params::None, WAIT).await?, json!([3, 1, 2]));

    let multiplier = client.actor_for("multiplier", HOST, port).await?;
    let listing = multiplier.call(INTROSPECT_METHOD, Params::None, WAIT).await?;
    assert_eq!(listing["mult"], json!("Multiplies three integers"));

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// A local relay in front of a remote actor.
#[mazewire_test]
async fn test_relay_to_remote_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;
    let port = listener.local_addr().port();

    let client = runtime().await;
    let remote = client.actor_for("multiplier", HOST, port).await?;
    let relay = client.spawn_relay(remote).await;
    assert!(relay.is_local());

    assert_eq!(relay.call("mult", json!([4, 5, 6]).into(), WAIT).await?, json!(120));
    match relay.call("mult", json!(["x"]).into(), WAIT).await {
        Err(error) => assert_eq!(error.kind(), Some("invalid_params")),
        Ok(value) => panic!("bad params relayed into {value}"),
    }

    client.shutdown_all().await?;
    server.shutdown_all().await
}

/// A malformed frame is answered with an uncorrelated error; the connection stays up.
#[mazewire_test]
async fn test_malformed_frames_are_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let (server, listener) = serve().await?;

    let stream = TcpStream::connect(listener.local_addr()).await?;
    let mut connection = Connection::from_tcp(stream);

    connection.send(&json!({"actor": "multiplier", "message": {"id": 1}})).await?;
    let report = within(WAIT, connection.read()).await??;
    assert_eq!(report["message"]["id"], Value::Null);
    assert_eq!(report["message"]["error"]["kind"], json!("malformed"));

    connection
        .send(&json!({
            "actor": "multiplier",
            "message": {"method": "mult", "params": [1, 2, 5], "id": 9}
        }))
        .await?;
    let reply = within(WAIT, connection.read()).await??;
    assert_eq!(reply["message"], json!({"result": 10, "id": 9}));

    assert!(listener.stats().errors() >= 1);
    connection.close().await?;
    server.shutdown_all().await
}
