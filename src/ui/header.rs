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
use crate::sync::ConnectionState;
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

const HEADER_PAD: u16 = 2;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + HEADER_PAD,
        y: area.y,
        width: area.width.saturating_sub(HEADER_PAD * 2),
        height: area.height,
    };
    frame.render_widget(Paragraph::new(header_line(app)), padded);
}

pub(crate) fn header_line(app: &App) -> Line<'static> {
    let conversation = app.view.conversation();
    let sep = || Span::styled("  \u{2502}  ", Style::default().fg(theme::DIM));

    let name = conversation
        .contact_name
        .clone()
        .or_else(|| conversation.contact_phone.clone())
        .unwrap_or_else(|| conversation.id.clone());
    let mut spans = vec![Span::styled(
        name,
        Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
    )];
    if conversation.contact_name.is_some()
        && let Some(phone) = &conversation.contact_phone
    {
        spans.push(Span::styled(format!(" {phone}"), Style::default().fg(theme::DIM)));
    }

    // Lead annotations are display-only.
    if let Some(temperature) = conversation.temperature {
        let (label, color) = theme::temperature_label(temperature);
        spans.push(sep());
        spans.push(Span::styled(label, Style::default().fg(color)));
        if let Some(score) = conversation.score {
            spans.push(Span::styled(format!(" {score}"), Style::default().fg(theme::DIM)));
        }
    }

    spans.push(sep());
    spans.push(Span::styled("AI ", Style::default().fg(theme::DIM)));
    spans.push(if conversation.ai_enabled {
        Span::styled("on", Style::default().fg(theme::SENDER_AI))
    } else {
        Span::styled("off", Style::default().fg(theme::DIM))
    });

    if conversation.unread_count > 0 {
        spans.push(sep());
        spans.push(Span::styled(
            format!("{} unread", conversation.unread_count),
            Style::default().fg(theme::POLLING),
        ));
    }

    spans.push(sep());
    spans.push(match app.view.connection_state() {
        ConnectionState::PushConnected => {
            Span::styled("● live", Style::default().fg(theme::CONNECTED))
        }
        ConnectionState::PushDisconnected => {
            Span::styled("○ polling", Style::default().fg(theme::POLLING))
        }
    });

    Line::from(spans)
}
