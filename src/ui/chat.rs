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

use crate::api::model::{Conversation, Message, MessageStatus, SenderKind};
use crate::app::App;
use crate::sync::HistoryState;
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthChar;

const CHAT_PAD: u16 = 2;
const BODY_INDENT: &str = "  ";
const NEW_MESSAGES_LABEL: &str = " ↓ new messages ";

pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
    let padded = Rect {
        x: area.x + CHAT_PAD,
        y: area.y,
        width: area.width.saturating_sub(CHAT_PAD * 2),
        height: area.height,
    };

    let rows = if app.view.messages().is_empty() {
        placeholder_rows(app.view.history())
    } else {
        message_rows(app, usize::from(padded.width))
    };

    app.content_height = rows.len();
    app.viewport_height = usize::from(padded.height);
    app.scroll_offset =
        if app.follow_bottom { app.max_scroll() } else { app.scroll_offset.min(app.max_scroll()) };

    let visible: Vec<Line<'static>> =
        rows.into_iter().skip(app.scroll_offset).take(app.viewport_height).collect();
    frame.render_widget(Paragraph::new(visible), padded);

    if app.view.has_new_messages() && padded.height > 0 {
        let width = u16::try_from(NEW_MESSAGES_LABEL.chars().count()).unwrap_or(u16::MAX);
        let pill = Rect {
            x: padded.right().saturating_sub(width),
            y: padded.bottom().saturating_sub(1),
            width: width.min(padded.width),
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                NEW_MESSAGES_LABEL,
                Style::default().bg(theme::NEW_MESSAGES_BG).add_modifier(Modifier::BOLD),
            )),
            pill,
        );
    }
}

fn placeholder_rows(history: &HistoryState) -> Vec<Line<'static>> {
    let text = match history {
        HistoryState::Loading => "Loading conversation…".to_owned(),
        HistoryState::Loaded => "No messages yet.".to_owned(),
        HistoryState::Failed(err) => format!("Could not load messages ({err}). Retrying…"),
    };
    vec![Line::from(Span::styled(text, Style::default().fg(theme::DIM)))]
}

fn message_rows(app: &App, width: usize) -> Vec<Line<'static>> {
    let conversation = app.view.conversation();
    let body_width = width.saturating_sub(BODY_INDENT.len()).max(1);
    let mut rows = Vec::new();
    for message in app.view.messages() {
        rows.push(message_header(app, conversation, message));
        for line in message.content.split('\n') {
            for chunk in wrap_text(line, body_width) {
                rows.push(Line::from(format!("{BODY_INDENT}{chunk}")));
            }
        }
        rows.push(Line::default());
    }
    rows
}

fn message_header(app: &App, conversation: &Conversation, message: &Message) -> Line<'static> {
    let sender = sender_label(conversation, message);
    let time = message.created_at.with_timezone(&chrono::Local).format("%H:%M").to_string();
    let mut spans = vec![
        Span::styled(
            sender,
            Style::default()
                .fg(theme::sender_color(message.sender_kind))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {time}"), Style::default().fg(theme::DIM)),
    ];

    if !message.is_inbound() {
        let (glyph, color) = theme::status_glyph(message.status);
        spans.push(Span::styled(format!("  {glyph}"), Style::default().fg(color)));
    }

    if message.status == MessageStatus::Failed
        && let Some(temp_id) = message.id.temporary_uuid()
    {
        let reason = app.view.failure(temp_id).map_or("not sent", |failure| failure.label());
        spans.push(Span::styled(
            format!("  {reason} · Ctrl+R retry · Ctrl+E edit · Ctrl+D discard"),
            Style::default().fg(theme::STATUS_ERROR),
        ));
    }
    Line::from(spans)
}

fn sender_label(conversation: &Conversation, message: &Message) -> String {
    if let Some(name) = &message.sender_name {
        return name.clone();
    }
    match message.sender_kind {
        SenderKind::Client => conversation
            .contact_name
            .clone()
            .or_else(|| conversation.contact_phone.clone())
            .unwrap_or_else(|| "Client".to_owned()),
        SenderKind::Ai => "AI assistant".to_owned(),
        SenderKind::Human => "You".to_owned(),
    }
}

/// Hard-wrap `text` to `width` display columns. Empty input yields one
/// empty row so blank lines survive.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut rows = vec![String::new()];
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width && used > 0 {
            rows.push(String::new());
            used = 0;
        }
        if let Some(row) = rows.last_mut() {
            row.push(c);
        }
        used += w;
    }
    rows
}
