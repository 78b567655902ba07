// =====
// TESTS: 5
// =====
//
// Push preferred, polling fallback: exactly one delivery path is live at a
// time and connectivity flips are the only thing that switches it.

use clinic_inbox::sync::{ConnectionState, HistoryState};
use pretty_assertions::assert_eq;

use crate::helpers::{FakeApi, Harness, inbound, server_error};

#[tokio::test(start_paused = true)]
async fn polls_until_push_connects() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;
    assert_eq!(h.view.connection_state(), ConnectionState::PushDisconnected);
    assert!(h.view.is_polling());
    assert_eq!(h.api.fetch_count(), 1);

    h.advance(h.config.poll_interval).await;
    h.advance(h.config.poll_interval).await;
    assert_eq!(h.api.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn push_connect_disarms_polling_once() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    h.push.connect(true);
    h.pump().await;
    assert_eq!(h.view.connection_state(), ConnectionState::PushConnected);
    assert!(!h.view.is_polling());
    // One catch-up fetch covers the gap before the stream came up.
    assert_eq!(h.api.fetch_count(), 2);

    // A repeated "connected" is not a transition.
    h.push.connect(true);
    h.pump().await;
    for _ in 0..5 {
        h.advance(h.config.poll_interval).await;
    }
    assert_eq!(h.api.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn push_drop_rearms_polling() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;
    h.push.connect(true);
    h.pump().await;
    let before = h.api.fetch_count();

    h.push.connect(false);
    h.pump().await;
    assert!(h.view.is_polling());
    assert_eq!(h.view.connection_state(), ConnectionState::PushDisconnected);

    h.api.messages.lock().unwrap().push(inbound("m-1", 0, "alguém aí?"));
    h.advance(h.config.poll_interval).await;
    assert_eq!(h.api.fetch_count(), before + 1);
    assert_eq!(h.ids(), vec!["m-1"]);
}

#[tokio::test(start_paused = true)]
async fn failed_history_is_retried() {
    let api = FakeApi::new().with_messages(vec![inbound("m-1", 0, "oi")]);
    api.queue_history(Err(server_error(503)));
    let mut h = Harness::open(api);
    h.push.connect(true);
    h.pump().await;
    assert!(matches!(h.view.history(), HistoryState::Failed(_)));
    assert!(h.view.messages().is_empty());

    h.advance(h.config.poll_interval).await;
    assert_eq!(h.view.history(), &HistoryState::Loaded);
    assert_eq!(h.ids(), vec!["m-1"]);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_keep_existing_messages() {
    let api = FakeApi::new().with_messages(vec![inbound("m-1", 0, "oi")]);
    let mut h = Harness::open(api);
    h.pump().await;

    h.api.queue_history(Err(server_error(502)));
    h.advance(h.config.poll_interval).await;
    assert_eq!(h.ids(), vec!["m-1"]);

    h.api.messages.lock().unwrap().push(inbound("m-2", 1, "de novo"));
    h.advance(h.config.poll_interval).await;
    assert_eq!(h.ids(), vec!["m-1", "m-2"]);
}
