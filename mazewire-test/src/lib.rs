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

//! Test support for Mazewire actors.
//!
//! The [`mazewire_test`] attribute turns an `async fn` into a regular test that
//! runs on its own multi-threaded tokio runtime. Panics raised anywhere during the
//! test, including inside spawned actor tasks that would otherwise be swallowed by
//! the runtime, are recorded and re-raised once the body completes.

pub use mazewire_test_macro::mazewire_test;

/// Items the generated test code refers to by path.
#[doc(hidden)]
pub mod __private {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;
}

/// Commonly used items for writing Mazewire tests.
pub mod prelude {
    pub use crate::mazewire_test;
}
