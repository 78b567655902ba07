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

use crate::app::App;
use crate::ui::chat::wrap_text;
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

/// Horizontal padding to match header inset.
const INPUT_PAD: u16 = 2;

/// Prompt prefix width: "❯ " = 2 columns
const PROMPT_WIDTH: u16 = 2;

/// Maximum input area height (lines) to prevent the input from consuming the entire screen.
pub const MAX_INPUT_HEIGHT: u16 = 8;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + INPUT_PAD,
        y: area.y,
        width: area.width.saturating_sub(INPUT_PAD * 2),
        height: area.height,
    };
    let prompt = Span::styled(format!("{} ", theme::PROMPT_CHAR), Style::default().fg(theme::ACCENT));

    if app.input.is_empty() {
        let line = Line::from(vec![
            prompt,
            Span::styled("Type a message...", Style::default().fg(theme::DIM)),
        ]);
        frame.render_widget(Paragraph::new(line), padded);
        frame.set_cursor_position((padded.x + PROMPT_WIDTH, padded.y));
        return;
    }

    let text_width = usize::from(padded.width.saturating_sub(PROMPT_WIDTH)).max(1);
    let (rows, cursor) = layout_rows(app.input.text(), app.input.cursor(), text_width);
    let skip = (cursor.0 + 1).saturating_sub(usize::from(padded.height));

    let lines: Vec<Line<'static>> = rows
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(i, row)| {
            let lead = if i == 0 { prompt.clone() } else { Span::raw("  ") };
            Line::from(vec![lead, Span::raw(row)])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), padded);

    let cursor_row = u16::try_from(cursor.0.saturating_sub(skip)).unwrap_or(0);
    let cursor_col = u16::try_from(cursor.1).unwrap_or(0);
    frame.set_cursor_position((padded.x + PROMPT_WIDTH + cursor_col, padded.y + cursor_row));
}

/// Visual rows the draft needs at `width`, clamped to the input area maximum.
pub fn visual_line_count(app: &App, width: u16) -> u16 {
    let text_width = usize::from(width.saturating_sub(INPUT_PAD * 2 + PROMPT_WIDTH)).max(1);
    let (rows, _) = layout_rows(app.input.text(), app.input.cursor(), text_width);
    u16::try_from(rows.len()).unwrap_or(MAX_INPUT_HEIGHT).clamp(1, MAX_INPUT_HEIGHT)
}

/// Wrapped rows of the draft plus the cursor's (row, display column).
fn layout_rows(text: &str, cursor: usize, width: usize) -> (Vec<String>, (usize, usize)) {
    let mut rows = Vec::new();
    let mut cursor_at = (0, 0);
    let mut consumed = 0;
    for line in text.split('\n') {
        let line_len = line.chars().count();
        let wrapped = wrap_text(line, width);
        if cursor >= consumed && cursor <= consumed + line_len {
            let mut remaining = cursor - consumed;
            for (i, row) in wrapped.iter().enumerate() {
                let len = row.chars().count();
                let last = i + 1 == wrapped.len();
                if remaining < len || last {
                    let prefix: String = row.chars().take(remaining).collect();
                    cursor_at = (rows.len() + i, prefix.width());
                    break;
                }
                remaining -= len;
            }
        }
        consumed += line_len + 1;
        rows.extend(wrapped);
    }
    (rows, cursor_at)
}
