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

use std::fmt;

/// Lifecycle position of an actor.
///
/// `Created → Started → Running ⇄ Paused → Stopping → Stopped`. An actor never
/// leaves `Stopping` or `Stopped` for an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActorState {
    /// Constructed and configured, not yet scheduled.
    #[default]
    Created,
    /// Scheduled; the `on_start` hook has run.
    Started,
    /// Processing its inbox.
    Running,
    /// Suspended; messages are queued but not processed.
    Paused,
    /// Draining its inbox and running `on_stop`.
    Stopping,
    /// Finished. Links have been notified.
    Stopped,
}

impl ActorState {
    /// `true` for `Stopping` and `Stopped`.
    pub const fn is_terminating(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }

    pub(crate) const fn can_become(self, next: Self) -> bool {
        match self {
            Self::Stopped => false,
            Self::Stopping => matches!(next, Self::Stopped),
            _ => true,
        }
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(text)
    }
}
