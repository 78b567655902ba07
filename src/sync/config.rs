// clinic-inbox - Conversation synchronization core and terminal inbox view
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REMOTE_TYPING_EXPIRY: Duration = Duration::from_secs(6);
pub const DEFAULT_LOCAL_TYPING_QUIET: Duration = Duration::from_secs(3);
pub const DEFAULT_NEAR_BOTTOM_THRESHOLD: usize = 3;
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Tunables for one conversation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Fixed period of the polling fallback while push is down.
    pub poll_interval: Duration,
    /// How long a remote typing signal stays visible without a refresh.
    pub remote_typing_expiry: Duration,
    /// Quiet period for outbound typing: one "start" per period, and the
    /// trailing "stop" after this long without keystrokes.
    pub local_typing_quiet: Duration,
    /// Rows from the bottom that still count as "at the bottom".
    pub near_bottom_threshold: usize,
    /// Upper bound on an outbound send before it is marked FAILED.
    pub send_timeout: Duration,
    /// Upper bound on every other HTTP call.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            remote_typing_expiry: DEFAULT_REMOTE_TYPING_EXPIRY,
            local_typing_quiet: DEFAULT_LOCAL_TYPING_QUIET,
            near_bottom_threshold: DEFAULT_NEAR_BOTTOM_THRESHOLD,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // A zero period would spin the fallback loop.
        self.poll_interval = interval.max(Duration::from_millis(250));
        self
    }
}
