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

//! Scheduled tasks for a single conversation view.
//!
//! Every timer and background request a view starts goes through its
//! [`Scheduler`]. Tasks never touch view state directly: their only output is
//! a [`SyncEvent`] posted to the view's channel. Each timer hands back a
//! [`TaskHandle`] that must be cancelled through the scheduler, and
//! [`Scheduler::shutdown`] cancels whatever is still live when the view closes.

use super::events::SyncEvent;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TaskId(u64);

/// Cancel handle for a scheduled timer.
#[must_use = "a timer handle must be kept so the timer can be cancelled"]
#[derive(Debug, PartialEq, Eq)]
pub struct TaskHandle {
    id: TaskId,
}

pub struct Scheduler {
    tx: mpsc::UnboundedSender<SyncEvent>,
    live: HashMap<TaskId, AbortHandle>,
    next_id: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { tx, live: HashMap::new(), next_id: 0 }
    }

    /// Post `event` once after `delay`.
    pub fn after(&mut self, delay: Duration, event: SyncEvent) -> TaskHandle {
        let tx = self.tx.clone();
        self.register(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }))
    }

    /// Post `make()` every `period`, first tick one period from now.
    pub fn every<F>(&mut self, period: Duration, make: F) -> TaskHandle
    where
        F: Fn() -> SyncEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        self.register(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        }))
    }

    /// Run a background request and post its result. In-flight requests are
    /// aborted by [`Scheduler::shutdown`].
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = SyncEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let _request = self.register(tokio::spawn(async move {
            let event = task.await;
            let _ = tx.send(event);
        }));
    }

    /// Cancel a timer. Returns `true` if it had not fired/finished yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let Some(abort) = self.live.remove(&handle.id) else {
            return false;
        };
        let was_running = !abort.is_finished();
        abort.abort();
        was_running
    }

    #[must_use]
    pub fn is_live(&self, handle: &TaskHandle) -> bool {
        self.live.get(&handle.id).is_some_and(|abort| !abort.is_finished())
    }

    pub fn live_count(&mut self) -> usize {
        self.prune();
        self.live.len()
    }

    /// Cancel every task still registered. Returns how many were still running.
    pub fn shutdown(&mut self) -> usize {
        let mut cancelled = 0;
        for (_, abort) in self.live.drain() {
            if !abort.is_finished() {
                cancelled += 1;
            }
            abort.abort();
        }
        cancelled
    }

    fn register(&mut self, handle: JoinHandle<()>) -> TaskHandle {
        self.prune();
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, handle.abort_handle());
        TaskHandle { id }
    }

    fn prune(&mut self) {
        self.live.retain(|_, abort| !abort.is_finished());
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let leaked = self.shutdown();
        if leaked > 0 {
            tracing::warn!(leaked, "scheduler dropped without shutdown; cancelled live tasks");
        }
    }
}
