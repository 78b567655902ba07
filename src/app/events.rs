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

use super::App;
use crate::error::AppError;
use crate::sync::SyncEvent;
use crate::sync::outbox::SendError;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

const MOUSE_SCROLL_LINES: isize = 3;

pub fn handle_sync_event(app: &mut App, event: SyncEvent) {
    let viewport = app.viewport();
    let decision = app.view.handle_event(event, viewport);
    app.apply_scroll(decision);

    if app.exit_error.is_none()
        && let Some(fatal) = app.view.startup_error().and_then(AppError::from_startup)
    {
        tracing::error!("conversation cannot be opened: {fatal}");
        app.exit_error = Some(fatal);
        app.should_quit = true;
    }
}

pub fn handle_terminal_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_by(-MOUSE_SCROLL_LINES),
            MouseEventKind::ScrollDown => app.scroll_by(MOUSE_SCROLL_LINES),
            _ => {}
        },
        Event::Paste(text) => {
            app.input.insert_str(&text);
            app.view.input_changed(app.input.text());
        }
        Event::FocusGained => app.view.set_visible(true),
        Event::FocusLost => app.view.set_visible(false),
        // Resize is handled automatically by ratatui
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page = isize::try_from(app.viewport_height.max(1)).unwrap_or(isize::MAX);
    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        // Enter sends; Shift/Alt+Enter breaks the line
        KeyCode::Enter
            if !key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            submit(app);
        }
        KeyCode::Enter => edit(app, |input| input.insert_char('\n')),
        KeyCode::Char('r') if ctrl => retry_latest_failed(app),
        KeyCode::Char('e') if ctrl => replace_latest_failed(app),
        KeyCode::Char('d') if ctrl => discard_latest_failed(app),
        KeyCode::Char('a') if ctrl => {
            if !app.view.toggle_ai() {
                app.status = Some("AI setting is still being saved.".to_owned());
            }
        }
        KeyCode::Up if ctrl => app.scroll_by(-1),
        KeyCode::Down if ctrl => app.scroll_by(1),
        KeyCode::PageUp => app.scroll_by(-page),
        KeyCode::PageDown => app.scroll_by(page),
        KeyCode::End if ctrl => app.jump_to_bottom(),
        KeyCode::Esc => {
            app.jump_to_bottom();
            app.status = None;
            app.view.dismiss_notice();
        }
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        KeyCode::Backspace => edit(app, |input| {
            input.backspace();
        }),
        KeyCode::Delete => edit(app, |input| {
            input.delete();
        }),
        KeyCode::Char(c) if !ctrl => edit(app, |input| input.insert_char(c)),
        _ => {}
    }
}

/// Apply a draft edit and feed the result to the typing debouncer.
fn edit(app: &mut App, change: impl FnOnce(&mut super::InputState)) {
    change(&mut app.input);
    app.view.input_changed(app.input.text());
}

fn submit(app: &mut App) {
    let viewport = app.viewport();
    match app.view.submit(app.input.text(), viewport) {
        Ok(decision) => {
            app.input.clear();
            app.status = None;
            app.apply_scroll(decision);
        }
        Err(SendError::EmptyContent) => {}
        Err(err) => app.status = Some(err.to_string()),
    }
}

fn retry_latest_failed(app: &mut App) {
    let Some(temp_id) = app.view.latest_failed() else {
        app.status = Some("Nothing to retry.".to_owned());
        return;
    };
    match app.view.retry(temp_id) {
        Ok(()) => {
            app.status = None;
            app.view.dismiss_notice();
        }
        Err(err) => app.status = Some(err.to_string()),
    }
}

/// Swap the draft in as the new content of the latest failed message.
fn replace_latest_failed(app: &mut App) {
    let Some(temp_id) = app.view.latest_failed() else {
        app.status = Some("No failed message to edit.".to_owned());
        return;
    };
    match app.view.edit_failed(temp_id, app.input.text()) {
        Ok(()) => {
            app.input.clear();
            app.view.input_changed("");
            app.status = Some("Message updated. Ctrl+R to send it.".to_owned());
        }
        Err(err) => app.status = Some(err.to_string()),
    }
}

fn discard_latest_failed(app: &mut App) {
    let Some(temp_id) = app.view.latest_failed() else {
        return;
    };
    match app.view.discard(temp_id) {
        Ok(()) => {
            app.status = None;
            app.view.dismiss_notice();
        }
        Err(err) => app.status = Some(err.to_string()),
    }
}
