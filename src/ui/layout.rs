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

use ratatui::layout::{Constraint, Layout, Rect};

pub struct InboxLayout {
    pub header: Rect,
    pub header_sep: Rect,
    pub body: Rect,
    /// One row for "X is typing…" (zero-height when nobody is).
    pub typing: Rect,
    pub input_sep: Rect,
    pub input: Rect,
    pub footer: Rect,
}

pub fn compute(area: Rect, input_lines: u16, typing: bool) -> InboxLayout {
    let input_height = input_lines.max(1);
    let typing_height = u16::from(typing);
    let zero = Rect::new(area.x, area.y, area.width, 0);

    if area.height < 8 {
        // Compact: chat and input only
        let [body, typing, input] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(typing_height),
            Constraint::Length(input_height),
        ])
        .areas(area);
        InboxLayout {
            header: zero,
            header_sep: zero,
            body,
            typing,
            input_sep: Rect::new(area.x, input.y, area.width, 0),
            input,
            footer: Rect::new(area.x, area.bottom(), area.width, 0),
        }
    } else {
        let [header, header_sep, body, typing, input_sep, input, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(typing_height),
            Constraint::Length(1),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .areas(area);
        InboxLayout { header, header_sep, body, typing, input_sep, input, footer }
    }
}
