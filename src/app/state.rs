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

use super::InputState;
use crate::error::AppError;
use crate::sync::{ConversationView, ScrollDecision, SyncEvent, Viewport};
use tokio::sync::mpsc;

pub struct App {
    pub view: ConversationView,
    pub event_rx: mpsc::UnboundedReceiver<SyncEvent>,
    pub input: InputState,
    pub should_quit: bool,
    /// Fatal error to report after the terminal is restored.
    pub exit_error: Option<AppError>,
    /// First visible chat row.
    pub scroll_offset: usize,
    /// Pin the chat to its last row on the next render.
    pub follow_bottom: bool,
    /// Chat geometry from the last render.
    pub content_height: usize,
    pub viewport_height: usize,
    /// Local status line (key feedback), shown above the view's own notice.
    pub status: Option<String>,
}

impl App {
    #[must_use]
    pub fn new(view: ConversationView, event_rx: mpsc::UnboundedReceiver<SyncEvent>) -> Self {
        Self {
            view,
            event_rx,
            input: InputState::new(),
            should_quit: false,
            exit_error: None,
            scroll_offset: 0,
            follow_bottom: true,
            content_height: 0,
            viewport_height: 0,
            status: None,
        }
    }

    #[must_use]
    /// The chat viewport as the next frame will draw it.
    pub fn viewport(&self) -> Viewport {
        Viewport {
            offset: if self.follow_bottom { self.max_scroll() } else { self.scroll_offset },
            content_height: self.content_height,
            viewport_height: self.viewport_height,
        }
    }

    pub fn apply_scroll(&mut self, decision: ScrollDecision) {
        if decision == ScrollDecision::ScrollToBottom {
            self.follow_bottom = true;
            self.scroll_offset = self.max_scroll();
        }
    }

    #[must_use]
    pub fn max_scroll(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Scroll by `delta` rows (negative is up) and report it to the view.
    pub fn scroll_by(&mut self, delta: isize) {
        let current = if self.follow_bottom { self.max_scroll() } else { self.scroll_offset };
        let target = current.saturating_add_signed(delta).min(self.max_scroll());
        self.scroll_offset = target;
        self.follow_bottom = target >= self.max_scroll();
        self.view.user_scrolled(self.viewport());
    }

    pub fn jump_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll_offset = self.max_scroll();
        self.view.jump_to_bottom();
    }

    /// Tear down the conversation view. Returns the number of tasks cancelled.
    pub fn close(self) -> usize {
        self.view.close()
    }
}
