// =====
// TESTS: 5
// =====
//
// Message store behaviour as seen through an open view: idempotent upserts,
// ordering, and rejection of malformed or foreign payloads.

use clinic_inbox::api::types::WireMessage;
use clinic_inbox::sync::HistoryState;
use pretty_assertions::assert_eq;

use crate::helpers::{CONVERSATION, FakeApi, Harness, inbound, outbound};

#[tokio::test(start_paused = true)]
async fn initial_history_lands_in_order() {
    let history = (0..5).map(|i| inbound(&format!("m-{i}"), i, "oi")).collect();
    let mut h = Harness::open(FakeApi::new().with_messages(history));
    assert_eq!(h.view.history(), &HistoryState::Loading);

    h.pump().await;

    assert_eq!(h.view.history(), &HistoryState::Loaded);
    assert_eq!(h.ids(), vec!["m-0", "m-1", "m-2", "m-3", "m-4"]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_delivery_keeps_length() {
    let mut h = Harness::open(FakeApi::new().with_messages(vec![inbound("m-1", 0, "olá")]));
    h.pump().await;

    // Same message again through push and through a poll.
    h.push.message(inbound("m-1", 0, "olá"));
    h.pump().await;
    h.advance(h.config.poll_interval).await;

    assert_eq!(h.ids(), vec!["m-1"]);
}

#[tokio::test(start_paused = true)]
async fn out_of_order_arrivals_are_sorted() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.message(outbound("m-4", 4, "d"));
    h.push.message(inbound("m-3", 3, "c"));
    h.push.message(inbound("m-1", 1, "a"));
    h.push.message(inbound("m-2", 2, "b"));
    // Same timestamp: the id breaks the tie.
    h.push.message(inbound("m-0b", 1, "a2"));
    h.pump().await;

    assert_eq!(h.ids(), vec!["m-0b", "m-1", "m-2", "m-3", "m-4"]);
}

#[tokio::test(start_paused = true)]
async fn later_copy_updates_in_place() {
    let mut h = Harness::open(FakeApi::new().with_messages(vec![inbound("m-1", 0, "olá")]));
    h.pump().await;

    let mut edited = inbound("m-1", 0, "olá, tudo bem?");
    edited.status = Some("READ".to_owned());
    h.push.message(edited);
    h.pump().await;

    let messages = h.view.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "olá, tudo bem?");
}

#[tokio::test(start_paused = true)]
async fn malformed_and_foreign_payloads_are_dropped() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.message(WireMessage { created_at: None, ..inbound("m-1", 0, "x") });
    h.push.message(WireMessage {
        conversation_id: Some(format!("{CONVERSATION}-other")),
        ..inbound("m-2", 1, "x")
    });
    h.push.message(inbound("m-3", 2, "ok"));
    h.pump().await;

    assert_eq!(h.ids(), vec!["m-3"]);
}
