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

//! A multiplication service reachable over TCP.
//!
//! One runtime exposes a `multiplier` actor behind a listener; a second
//! runtime in the same process connects to it, asks for a few products and
//! shows what an unknown destination looks like.
//!
//! ```sh
//! RUST_LOG=mazewire=debug cargo run --example mult_service
//! ```

use mazewire::prelude::*;
use tracing_subscriber::EnvFilter;

#[mazewire_actor]
struct Multiplier {
    calls: usize,
}

#[mazewire_params]
struct Factors(i64, i64, i64);

#[mazewire_main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = MazewireApp::launch_async().await;
    let mut multiplier = server.new_actor_with_name::<Multiplier>("multiplier");
    multiplier
        .expose::<Factors, _>("mult", |actor, ctx| {
            actor.model.calls += 1;
            let Factors(a, b, c) = ctx.params().clone();
            Reply::respond(ctx.reply_envelope(), a * b * c)
        })
        .describe("mult", "Multiplies three integers")
        .on_stop(|actor| {
            println!("multiplier answered {} queries", actor.model.calls);
            Reply::ready()
        });
    multiplier.start().await;

    let listener = server.start_listener("127.0.0.1", 0).await?;
    let port = listener.local_addr().port();
    println!("listening on {}", listener.local_addr());

    let client = MazewireApp::launch_async().await;
    let remote = client.actor_for("multiplier", "127.0.0.1", port).await?;
    let timeout = Duration::from_secs(3);

    println!("methods: {}", remote.call(INTROSPECT_METHOD, Params::None, timeout).await?);
    for factors in [[2, 3, 4], [5, 6, 7], [-1, 8, 9]] {
        let product = remote.call("mult", json!(factors).into(), timeout).await?;
        println!("mult{factors:?} = {product}");
    }

    let nobody = client.actor_for("nobody", "127.0.0.1", port).await?;
    match nobody.call("mult", json!([1, 2, 3]).into(), timeout).await {
        Ok(value) => println!("unexpected answer from nobody: {value}"),
        Err(error) => println!("nobody: {error}"),
    }

    client.shutdown_all().await?;
    server.shutdown_all().await
}
