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

/// Per-actor settings supplied when creating an actor.
///
/// A named actor is entered in the runtime's name table when it starts, which
/// makes it reachable by remote peers under that name.
#[derive(Default, Debug, Clone)]
pub struct ActorConfig {
    name: Option<String>,
    trap_exit: bool,
    /// Overrides the runtime's default inbox capacity when set.
    inbox_capacity: Option<usize>,
}

impl ActorConfig {
    /// A configuration for an unnamed actor with runtime defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration for an actor registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets a custom inbox capacity for this actor.
    #[must_use]
    pub const fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = Some(capacity);
        self
    }

    /// Starts the actor with exit trapping enabled.
    #[must_use]
    pub const fn with_trap_exit(mut self, trap_exit: bool) -> Self {
        self.trap_exit = trap_exit;
        self
    }

    /// The registered name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether exit signals arrive as `exit` notifications.
    pub const fn trap_exit(&self) -> bool {
        self.trap_exit
    }

    /// The custom inbox capacity, if set.
    pub const fn inbox_capacity(&self) -> Option<usize> {
        self.inbox_capacity
    }
}
