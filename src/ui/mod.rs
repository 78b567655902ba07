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

mod chat;
mod header;
mod input;
mod layout;
pub mod theme;

use crate::app::App;
use crate::sync::ConnectionState;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

const FOOTER_PAD: u16 = 2;

pub fn render(frame: &mut Frame, app: &mut App) {
    let frame_area = frame.area();
    let typing = !app.view.typing_participants().is_empty();
    let input_lines = input::visual_line_count(app, frame_area.width);
    let areas = layout::compute(frame_area, input_lines, typing);

    if areas.header.height > 0 {
        header::render(frame, areas.header, app);
        render_separator(frame, areas.header_sep);
    }

    chat::render(frame, areas.body, app);

    if areas.typing.height > 0 {
        render_typing(frame, areas.typing, app);
    }

    render_separator(frame, areas.input_sep);
    input::render(frame, areas.input, app);

    if areas.footer.height > 0 {
        render_footer(frame, areas.footer, app);
    }
}

fn render_separator(frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let line = theme::SEPARATOR_CHAR.repeat(usize::from(area.width));
    frame.render_widget(Paragraph::new(Span::styled(line, Style::default().fg(theme::DIM))), area);
}

fn render_typing(frame: &mut Frame, area: Rect, app: &App) {
    let text = typing_text(&app.view.typing_participants());
    let padded = Rect { x: area.x + FOOTER_PAD, width: area.width.saturating_sub(FOOTER_PAD * 2), ..area };
    frame.render_widget(
        Paragraph::new(Span::styled(
            text,
            Style::default().fg(theme::DIM).add_modifier(Modifier::ITALIC),
        )),
        padded,
    );
}

pub(crate) fn typing_text(participants: &[&str]) -> String {
    match participants {
        [] => String::new(),
        [one] => format!("{one} is typing…"),
        [first, second] => format!("{first} and {second} are typing…"),
        [first, rest @ ..] => format!("{first} and {} others are typing…", rest.len()),
    }
}

/// Key feedback or the view's notice on the left, transport hint on the right.
fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect { x: area.x + FOOTER_PAD, width: area.width.saturating_sub(FOOTER_PAD * 2), ..area };

    let left = match app.status.as_deref().or_else(|| app.view.notice()) {
        Some(message) => Line::from(Span::styled(message.to_owned(), Style::default().fg(theme::STATUS_ERROR))),
        None => Line::from(vec![
            Span::styled("Enter", Style::default().fg(theme::ACCENT)),
            Span::styled(" send  ", Style::default().fg(theme::DIM)),
            Span::styled("Ctrl+A", Style::default().fg(theme::ACCENT)),
            Span::styled(" toggle AI  ", Style::default().fg(theme::DIM)),
            Span::styled("Ctrl+C", Style::default().fg(theme::ACCENT)),
            Span::styled(" quit", Style::default().fg(theme::DIM)),
        ]),
    };
    frame.render_widget(Paragraph::new(left), padded);

    let hint = match app.view.connection_state() {
        ConnectionState::PushConnected => None,
        ConnectionState::PushDisconnected if app.view.is_polling() => {
            Some(("live updates unavailable, polling", theme::POLLING))
        }
        ConnectionState::PushDisconnected => Some(("reconnecting", theme::POLLING)),
    };
    let sending = app.view.in_flight_sends();
    let right = match (hint, sending) {
        (Some((text, color)), 0) => Some(Span::styled(text.to_owned(), Style::default().fg(color))),
        (Some((text, color)), n) => {
            Some(Span::styled(format!("sending {n} · {text}"), Style::default().fg(color)))
        }
        (None, 0) => None,
        (None, n) => Some(Span::styled(format!("sending {n}"), Style::default().fg(theme::DIM))),
    };
    if let Some(span) = right {
        frame.render_widget(Paragraph::new(Line::from(span).right_aligned()), padded);
    }
}
