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

//! Push-or-poll supervision.
//!
//! [`ActiveTransport`] is the single source of truth for which delivery path
//! is live. Polling runs only while push is down, and the only way to arm or
//! disarm it is [`TransportSupervisor::on_connectivity`].

use super::events::SyncEvent;
use super::scheduler::{Scheduler, TaskHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    PushConnected,
    PushDisconnected,
}

#[derive(Debug)]
enum ActiveTransport {
    Push,
    Polling(TaskHandle),
    /// Torn down; nothing may be armed again.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportTransition {
    ArmedPolling,
    DisarmedPolling,
    NoChange,
}

#[derive(Debug)]
pub struct TransportSupervisor {
    active: ActiveTransport,
    interval: Duration,
    poll_in_flight: bool,
    arm_count: u32,
    disarm_count: u32,
}

impl TransportSupervisor {
    /// Connectivity is unknown at open, so polling starts armed.
    pub fn start(scheduler: &mut Scheduler, interval: Duration) -> Self {
        let handle = scheduler.every(interval, || SyncEvent::PollTick);
        tracing::debug!(interval_ms = interval.as_millis(), "polling armed at open");
        Self {
            active: ActiveTransport::Polling(handle),
            interval,
            poll_in_flight: false,
            arm_count: 1,
            disarm_count: 0,
        }
    }

    pub fn on_connectivity(
        &mut self,
        scheduler: &mut Scheduler,
        connected: bool,
    ) -> TransportTransition {
        let active = std::mem::replace(&mut self.active, ActiveTransport::Closed);
        let (next, transition) = match (active, connected) {
            (ActiveTransport::Polling(handle), true) => {
                scheduler.cancel(handle);
                self.disarm_count += 1;
                tracing::info!("push connected; polling disarmed");
                (ActiveTransport::Push, TransportTransition::DisarmedPolling)
            }
            (ActiveTransport::Push, false) => {
                let handle = scheduler.every(self.interval, || SyncEvent::PollTick);
                self.arm_count += 1;
                tracing::info!("push disconnected; polling armed");
                (ActiveTransport::Polling(handle), TransportTransition::ArmedPolling)
            }
            (same, _) => (same, TransportTransition::NoChange),
        };
        self.active = next;
        transition
    }

    /// Claim the poll slot for a tick. Returns `false` when push is live, a
    /// fetch is still outstanding, or the supervisor is closed.
    pub fn begin_poll(&mut self) -> bool {
        if !self.is_polling() {
            // Tick queued before the timer was cancelled.
            return false;
        }
        if self.poll_in_flight {
            tracing::debug!("poll tick skipped; previous fetch outstanding");
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    /// Claim the poll slot for a one-off fetch after push comes up.
    pub fn begin_catch_up(&mut self) -> bool {
        if matches!(self.active, ActiveTransport::Closed) || self.poll_in_flight {
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    pub fn poll_finished(&mut self) {
        self.poll_in_flight = false;
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.active {
            ActiveTransport::Push => ConnectionState::PushConnected,
            ActiveTransport::Polling(_) | ActiveTransport::Closed => {
                ConnectionState::PushDisconnected
            }
        }
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        matches!(self.active, ActiveTransport::Polling(_))
    }

    #[must_use]
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }

    #[must_use]
    pub fn disarm_count(&self) -> u32 {
        self.disarm_count
    }

    pub fn shutdown(&mut self, scheduler: &mut Scheduler) {
        if let ActiveTransport::Polling(handle) =
            std::mem::replace(&mut self.active, ActiveTransport::Closed)
        {
            scheduler.cancel(handle);
        }
        self.poll_in_flight = false;
    }
}
