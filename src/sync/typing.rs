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

//! Typing indicators in both directions.
//!
//! Outbound, [`TypingDebouncer`] turns keystrokes into at most one "start" per
//! quiet period plus a "stop" when the draft is cleared, sent, or left idle.
//! Inbound, [`TypingTracker`] keeps one expiry timer per remote participant.
//! Both tag their timers with a generation so a superseded timer that still
//! fires is recognised and ignored.

use super::events::SyncEvent;
use super::scheduler::{Scheduler, TaskHandle};
use crate::api::model::TypingState;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct TypingDebouncer {
    quiet: Duration,
    last_start: Option<Instant>,
    idle_timer: Option<TaskHandle>,
    generation: u64,
}

impl TypingDebouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, last_start: None, idle_timer: None, generation: 0 }
    }

    /// Feed the current draft. Returns the signal to send, if any.
    pub fn on_input(
        &mut self,
        draft: &str,
        now: Instant,
        scheduler: &mut Scheduler,
    ) -> Option<TypingState> {
        if draft.trim().is_empty() {
            return self.stop(scheduler);
        }

        self.cancel_idle(scheduler);
        self.generation += 1;
        self.idle_timer = Some(
            scheduler.after(self.quiet, SyncEvent::LocalTypingIdle { generation: self.generation }),
        );

        match self.last_start {
            Some(sent) if now.duration_since(sent) < self.quiet => None,
            _ => {
                self.last_start = Some(now);
                Some(TypingState::Start)
            }
        }
    }

    /// Trailing idle timer fired.
    pub fn on_idle(&mut self, generation: u64, scheduler: &mut Scheduler) -> Option<TypingState> {
        if generation != self.generation {
            return None;
        }
        self.stop(scheduler)
    }

    /// The draft was sent.
    pub fn on_sent(&mut self, scheduler: &mut Scheduler) -> Option<TypingState> {
        self.stop(scheduler)
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.last_start.is_some()
    }

    pub fn shutdown(&mut self, scheduler: &mut Scheduler) {
        self.cancel_idle(scheduler);
        self.last_start = None;
    }

    fn stop(&mut self, scheduler: &mut Scheduler) -> Option<TypingState> {
        self.cancel_idle(scheduler);
        self.last_start.take().map(|_| TypingState::Stop)
    }

    fn cancel_idle(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.idle_timer.take() {
            scheduler.cancel(handle);
        }
    }
}

#[derive(Debug)]
struct RemoteTyping {
    generation: u64,
    expiry: TaskHandle,
}

/// Remote participants currently typing.
#[derive(Debug)]
pub struct TypingTracker {
    expiry: Duration,
    active: HashMap<String, RemoteTyping>,
    next_generation: u64,
}

impl TypingTracker {
    #[must_use]
    pub fn new(expiry: Duration) -> Self {
        Self { expiry, active: HashMap::new(), next_generation: 0 }
    }

    /// Apply a typing signal. Returns `true` if the visible set changed.
    pub fn on_signal(
        &mut self,
        participant: &str,
        state: TypingState,
        scheduler: &mut Scheduler,
    ) -> bool {
        match state {
            TypingState::Stop => self.clear(participant, scheduler),
            TypingState::Start => {
                self.next_generation += 1;
                let generation = self.next_generation;
                let expiry = scheduler.after(
                    self.expiry,
                    SyncEvent::RemoteTypingExpired {
                        participant: participant.to_owned(),
                        generation,
                    },
                );
                let previous = self
                    .active
                    .insert(participant.to_owned(), RemoteTyping { generation, expiry });
                match previous {
                    Some(old) => {
                        scheduler.cancel(old.expiry);
                        false
                    }
                    None => true,
                }
            }
        }
    }

    /// Expiry timer fired. Ignored if the participant signalled again since.
    pub fn on_expired(
        &mut self,
        participant: &str,
        generation: u64,
        scheduler: &mut Scheduler,
    ) -> bool {
        if self.active.get(participant).is_some_and(|entry| entry.generation == generation) {
            return self.clear(participant, scheduler);
        }
        false
    }

    pub fn clear(&mut self, participant: &str, scheduler: &mut Scheduler) -> bool {
        match self.active.remove(participant) {
            Some(entry) => {
                scheduler.cancel(entry.expiry);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn participants(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.active.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn shutdown(&mut self, scheduler: &mut Scheduler) {
        for (_, entry) in self.active.drain() {
            scheduler.cancel(entry.expiry);
        }
    }
}
