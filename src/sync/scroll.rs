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

use super::store::StoreChange;

/// Viewport geometry in rows, measured before a mutation is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First visible row.
    pub offset: usize,
    pub content_height: usize,
    pub viewport_height: usize,
}

impl Viewport {
    #[must_use]
    pub fn distance_from_bottom(self) -> usize {
        self.content_height.saturating_sub(self.offset + self.viewport_height)
    }

    #[must_use]
    pub fn is_near_bottom(self, threshold: usize) -> bool {
        self.distance_from_bottom() <= threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDecision {
    ScrollToBottom,
    ShowNewMessages,
    Keep,
}

#[derive(Debug)]
pub struct ScrollAnchorPolicy {
    threshold: usize,
    new_messages: bool,
}

impl ScrollAnchorPolicy {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self { threshold, new_messages: false }
    }

    /// Decide what a store mutation does to the viewport. `before` is the
    /// viewport as the user last saw it.
    pub fn on_mutation(&mut self, change: &StoreChange, before: Viewport) -> ScrollDecision {
        if change.inserted == 0 {
            return ScrollDecision::Keep;
        }
        if change.was_empty || change.own_inserted || before.is_near_bottom(self.threshold) {
            self.new_messages = false;
            return ScrollDecision::ScrollToBottom;
        }
        self.new_messages = true;
        ScrollDecision::ShowNewMessages
    }

    pub fn on_user_scroll(&mut self, now: Viewport) {
        if now.is_near_bottom(self.threshold) {
            self.new_messages = false;
        }
    }

    pub fn jump_to_bottom(&mut self) {
        self.new_messages = false;
    }

    #[must_use]
    pub fn has_new_messages(&self) -> bool {
        self.new_messages
    }
}
