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

use crate::api::model::{LeadTemperature, MessageStatus, SenderKind};
use ratatui::style::Color;

// Accent
pub const ACCENT: Color = Color::Rgb(0, 150, 136);

// UI chrome
pub const DIM: Color = Color::DarkGray;
pub const PROMPT_CHAR: &str = "❯";
pub const SEPARATOR_CHAR: &str = "─";

// Sender colors
pub const SENDER_CLIENT: Color = Color::White;
pub const SENDER_AI: Color = Color::Magenta;
pub const SENDER_HUMAN: Color = ACCENT;

// Connection
pub const CONNECTED: Color = Color::Green;
pub const POLLING: Color = Color::Yellow;

pub const NEW_MESSAGES_BG: Color = Color::Rgb(0, 95, 135);
pub const STATUS_ERROR: Color = Color::Red;

// Delivery glyphs
pub const ICON_PENDING: &str = "◌";
pub const ICON_SENT: &str = "✓";
pub const ICON_DELIVERED: &str = "✓✓";
pub const ICON_FAILED: &str = "✗";

pub fn sender_color(kind: SenderKind) -> Color {
    match kind {
        SenderKind::Client => SENDER_CLIENT,
        SenderKind::Ai => SENDER_AI,
        SenderKind::Human => SENDER_HUMAN,
    }
}

/// Glyph and color for an outbound message's delivery state.
pub fn status_glyph(status: MessageStatus) -> (&'static str, Color) {
    match status {
        MessageStatus::Pending => (ICON_PENDING, DIM),
        MessageStatus::Sent => (ICON_SENT, DIM),
        MessageStatus::Delivered => (ICON_DELIVERED, DIM),
        MessageStatus::Read => (ICON_DELIVERED, Color::Cyan),
        MessageStatus::Failed => (ICON_FAILED, STATUS_ERROR),
    }
}

pub fn temperature_label(temperature: LeadTemperature) -> (&'static str, Color) {
    match temperature {
        LeadTemperature::Cold => ("cold", Color::Blue),
        LeadTemperature::Warm => ("warm", Color::Yellow),
        LeadTemperature::Hot => ("hot", Color::Red),
    }
}
