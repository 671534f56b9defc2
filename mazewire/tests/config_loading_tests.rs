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

use std::io::Write;

use mazewire::config::{DefaultsConfig, LimitsConfig, TimeoutConfig};
use mazewire::prelude::*;
use mazewire_test::prelude::*;
use tempfile::NamedTempFile;

use crate::setup::actors::spawn_multiplier;
use crate::setup::{eventually, initialize_tracing, runtime, within};

mod setup;

const WAIT: Duration = Duration::from_secs(3);

fn config_file(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Values from a partial file override defaults; the runtime carries them.
#[mazewire_test]
async fn test_runtime_uses_loaded_config() -> anyhow::Result<()> {
    initialize_tracing();
    let file = config_file(
        r#"
        [timeouts]
        query_ms = 1234
        actor_shutdown_ms = 2000

        [limits]
        actor_inbox_capacity = 8

        [defaults]
        actor_name = "worker"

        [remote.timeouts]
        connect_ms = 750

        [remote.tcp]
        nodelay = false
        "#,
    )?;
    let config = MazewireConfig::load_from(file.path());
    let runtime = MazewireApp::launch_with_config(config).await;

    let loaded = runtime.config();
    assert_eq!(loaded.query_timeout(), Duration::from_millis(1234));
    assert_eq!(loaded.actor_shutdown_timeout(), Duration::from_secs(2));
    assert_eq!(loaded.system_shutdown_timeout(), Duration::from_secs(30));
    assert_eq!(loaded.limits.actor_inbox_capacity, 8);
    assert_eq!(loaded.remote.connect_timeout(), Duration::from_millis(750));
    assert_eq!(loaded.remote.write_timeout(), Duration::from_secs(30));
    assert!(!loaded.remote.tcp.nodelay);

    let actor = runtime.new_actor::<()>();
    assert_eq!(actor.name(), "worker");
    let named = runtime.new_actor_with_name::<()>("named");
    assert_eq!(named.name(), "named");
    runtime.shutdown_all().await
}

/// A malformed file falls back to defaults instead of failing the launch.
#[mazewire_test]
async fn test_malformed_file_falls_back_to_defaults() -> anyhow::Result<()> {
    initialize_tracing();
    let file = config_file("[timeouts\nquery_ms = ")?;
    let config = MazewireConfig::load_from(file.path());
    assert_eq!(config.timeouts.query_ms, 5_000);
    assert_eq!(config.remote.limits.max_connections, 100);
    assert_eq!(config.remote.limits.max_frame_size, None);
    Ok(())
}

/// A config assembled in code from its sections drives the runtime.
#[mazewire_test]
async fn test_config_built_from_sections() -> anyhow::Result<()> {
    initialize_tracing();
    let config = MazewireConfig {
        timeouts: TimeoutConfig {
            query_ms: 250,
            ..TimeoutConfig::default()
        },
        limits: LimitsConfig {
            actor_inbox_capacity: 4,
        },
        defaults: DefaultsConfig {
            actor_name: "section".to_string(),
        },
        ..MazewireConfig::default()
    };
    let runtime = MazewireApp::launch_with_config(config).await;
    assert_eq!(runtime.config().query_timeout(), Duration::from_millis(250));
    assert_eq!(runtime.config().limits.actor_inbox_capacity, 4);
    assert_eq!(runtime.new_actor::<()>().name(), "section");
    runtime.shutdown_all().await
}

/// Connections beyond `max_connections` are turned away and their queries
/// fail instead of hanging.
#[mazewire_test]
async fn test_connection_limit() -> anyhow::Result<()> {
    initialize_tracing();
    let file = config_file("[remote.limits]\nmax_connections = 1\n")?;
    let server = MazewireApp::launch_with_config(MazewireConfig::load_from(file.path())).await;
    spawn_multiplier(&server, "multiplier").await;
    let listener = server.start_listener("127.0.0.1", 0).await?;
    let port = listener.local_addr().port();

    let first_client = runtime().await;
    let first = first_client.actor_for("multiplier", "127.0.0.1", port).await?;
    assert_eq!(first.call("mult", json!([1, 2, 3]).into(), WAIT).await?, json!(6));

    let second_client = runtime().await;
    let second = second_client.actor_for("multiplier", "127.0.0.1", port).await?;
    let answer = within(WAIT, second.call("mult", json!([1, 2, 3]).into(), WAIT)).await?;
    match answer {
        Err(error) => assert_eq!(error.kind(), Some("connection_closed")),
        Ok(value) => panic!("a connection over the limit was served: {value}"),
    }
    assert!(eventually(WAIT, || listener.stats().connections_rejected() == 1).await);
    assert_eq!(listener.stats().connections_active(), 1);

    // The first connection is unaffected.
    assert_eq!(first.call("mult", json!([2, 2, 2]).into(), WAIT).await?, json!(8));

    first_client.shutdown_all().await?;
    second_client.shutdown_all().await?;
    server.shutdown_all().await
}
