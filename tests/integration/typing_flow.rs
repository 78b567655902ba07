// =====
// TESTS: 4
// =====
//
// Typing indicators: remote signals expire on their own, local keystrokes are
// debounced into start/stop notices.

use clinic_inbox::api::model::TypingState;
use pretty_assertions::assert_eq;
use std::time::Duration;

use crate::helpers::{FakeApi, Harness, at_bottom, inbound};

#[tokio::test(start_paused = true)]
async fn remote_typing_expires_without_follow_up() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.typing("Ana", TypingState::Start);
    h.pump().await;
    assert_eq!(h.view.typing_participants(), vec!["Ana"]);

    h.advance(h.config.remote_typing_expiry - Duration::from_millis(1)).await;
    assert_eq!(h.view.typing_participants(), vec!["Ana"]);

    h.advance(Duration::from_millis(1)).await;
    assert!(h.view.typing_participants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn refreshed_signal_extends_expiry() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.typing("Ana", TypingState::Start);
    h.pump().await;
    h.advance(h.config.remote_typing_expiry / 2).await;
    h.push.typing("Ana", TypingState::Start);
    h.pump().await;

    // The first timer's deadline passes; the refreshed one keeps it alive.
    h.advance(h.config.remote_typing_expiry / 2 + Duration::from_millis(10)).await;
    assert_eq!(h.view.typing_participants(), vec!["Ana"]);

    h.push.typing("Ana", TypingState::Stop);
    h.pump().await;
    assert!(h.view.typing_participants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn inbound_message_clears_its_author() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.typing("Ana", TypingState::Start);
    h.push.typing("Bia", TypingState::Start);
    h.pump().await;
    assert_eq!(h.view.typing_participants(), vec!["Ana", "Bia"]);

    h.push.message(inbound("m-1", 0, "cheguei"));
    h.pump().await;
    assert_eq!(h.view.typing_participants(), vec!["Bia"]);
}

#[tokio::test(start_paused = true)]
async fn local_typing_is_debounced() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.view.input_changed("o");
    h.view.input_changed("ol");
    h.view.input_changed("olá");
    h.pump().await;
    assert_eq!(h.api.typing_notices(), vec![TypingState::Start]);

    h.advance(h.config.local_typing_quiet).await;
    assert_eq!(h.api.typing_notices(), vec![TypingState::Start, TypingState::Stop]);

    // Typing again starts a new burst; sending ends it.
    h.view.input_changed("olá!");
    h.view.submit("olá!", at_bottom()).unwrap();
    h.pump().await;
    assert_eq!(
        h.api.typing_notices(),
        vec![TypingState::Start, TypingState::Stop, TypingState::Start, TypingState::Stop]
    );

    // The cancelled idle timer never produces a second stop.
    h.advance(h.config.local_typing_quiet * 2).await;
    assert_eq!(h.api.typing_notices().len(), 4);
}
