// =====
// TESTS: 7
// =====
//
// Terminal-side wiring: key handling drives the view, fatal startup errors end
// the session, and closing the view cancels everything it scheduled.

use clinic_inbox::api::model::{Conversation, MessageStatus, TypingState};
use clinic_inbox::app::App;
use clinic_inbox::app::events::{handle_sync_event, handle_terminal_event};
use clinic_inbox::error::AppError;
use clinic_inbox::sync::SyncEvent;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use std::sync::Arc;

use crate::helpers::{FakeApi, Harness, at_bottom, conversation, inbound, server_error, settle};

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn ctrl(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

fn into_app(h: Harness) -> App {
    App::new(h.view, h.rx)
}

async fn drain(app: &mut App) {
    loop {
        settle().await;
        let mut applied = false;
        while let Ok(event) = app.event_rx.try_recv() {
            handle_sync_event(app, event);
            applied = true;
        }
        if !applied {
            return;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn typing_and_enter_sends_the_draft() {
    let h = Harness::open(FakeApi::new());
    let api = Arc::clone(&h.api);
    let mut app = into_app(h);
    drain(&mut app).await;

    for c in "oi".chars() {
        handle_terminal_event(&mut app, key(KeyCode::Char(c)));
    }
    assert_eq!(app.input.text(), "oi");
    handle_terminal_event(&mut app, key(KeyCode::Enter));

    assert!(app.input.is_empty());
    assert_eq!(app.view.messages()[0].status, MessageStatus::Pending);
    drain(&mut app).await;

    assert_eq!(api.sent_contents(), vec!["oi"]);
    assert_eq!(app.view.messages()[0].status, MessageStatus::Sent);
    assert_eq!(api.typing_notices(), vec![TypingState::Start, TypingState::Stop]);
}

#[tokio::test(start_paused = true)]
async fn ctrl_r_retries_latest_failed() {
    let api = FakeApi::new();
    api.queue_send(Err(server_error(503)));
    let h = Harness::open(api);
    let api = Arc::clone(&h.api);
    let mut app = into_app(h);
    drain(&mut app).await;

    app.input.set("oi");
    handle_terminal_event(&mut app, key(KeyCode::Enter));
    drain(&mut app).await;
    assert_eq!(app.view.messages()[0].status, MessageStatus::Failed);

    handle_terminal_event(&mut app, ctrl('r'));
    drain(&mut app).await;
    assert_eq!(app.view.messages()[0].status, MessageStatus::Sent);
    assert_eq!(api.sent_contents(), vec!["oi", "oi"]);
}

#[tokio::test(start_paused = true)]
async fn ctrl_a_toggles_ai_and_rolls_back_on_failure() {
    let api = FakeApi::new();
    api.queue_patch(Err(server_error(500)));
    let mut app = into_app(Harness::open(api));
    drain(&mut app).await;
    assert!(app.view.conversation().ai_enabled);

    handle_terminal_event(&mut app, ctrl('a'));
    assert!(!app.view.conversation().ai_enabled);
    // A second toggle waits for the first to settle.
    handle_terminal_event(&mut app, ctrl('a'));
    assert!(app.status.is_some());

    drain(&mut app).await;
    assert!(app.view.conversation().ai_enabled);
    assert!(app.view.notice().is_some());

    handle_terminal_event(&mut app, ctrl('a'));
    drain(&mut app).await;
    assert!(!app.view.conversation().ai_enabled);
}

#[tokio::test(start_paused = true)]
async fn header_load_keeps_a_settling_ai_toggle() {
    let mut h = Harness::open(FakeApi::new());
    assert!(h.view.set_ai_enabled(true));

    let stale = Conversation { ai_enabled: false, ..conversation() };
    h.view.handle_event(SyncEvent::ConversationLoaded(Ok(stale)), at_bottom());
    assert!(h.view.conversation().ai_enabled);
    assert_eq!(h.view.conversation().contact_name.as_deref(), Some("Ana"));

    h.pump().await;
    assert!(h.view.conversation().ai_enabled);
    assert!(h.view.notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn own_send_follows_bottom_for_inbound_in_the_same_drain() {
    let h = Harness::open(FakeApi::new());
    let push = Arc::clone(&h.push);
    let mut app = into_app(h);
    drain(&mut app).await;

    app.content_height = 200;
    app.viewport_height = 20;
    app.follow_bottom = false;
    app.scroll_offset = 0;

    handle_terminal_event(&mut app, key(KeyCode::Char('x')));
    handle_terminal_event(&mut app, key(KeyCode::Enter));
    assert!(app.follow_bottom);
    assert_eq!(app.viewport().offset, 180);

    push.message(inbound("m-99", 1, "oi"));
    drain(&mut app).await;

    assert!(!app.view.has_new_messages());
    assert!(app.follow_bottom);
}

#[tokio::test(start_paused = true)]
async fn missing_conversation_ends_the_session() {
    let api = FakeApi::new();
    *api.conversation_error.lock().unwrap() = Some(server_error(404));
    let mut app = into_app(Harness::open(api));
    drain(&mut app).await;

    assert!(app.should_quit);
    assert_eq!(app.exit_error, Some(AppError::ConversationNotFound));
}

#[tokio::test(start_paused = true)]
async fn close_cancels_scheduled_work() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.typing("Ana", TypingState::Start);
    h.pump().await;
    h.view.input_changed("digitando");
    h.pump().await;

    let Harness { view, mut rx, api, config, .. } = h;
    let fetches = api.fetch_count();
    // Poll ticker, remote typing expiry and local idle timer.
    assert_eq!(view.close(), 3);

    tokio::time::advance(config.poll_interval * 3).await;
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(api.fetch_count(), fetches);
}
