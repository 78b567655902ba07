// =====
// TESTS: 7
// =====
//
// Optimistic send lifecycle: PENDING on submit, promotion on acknowledgement,
// FAILED with a reason on error, retry/edit/discard of failed messages.

use chrono::Utc;
use clinic_inbox::api::SendFailure;
use clinic_inbox::api::model::{MessageId, MessageStatus};
use clinic_inbox::api::types::{SendMessageRequest, WireMessage};
use clinic_inbox::sync::outbox::SendError;
use pretty_assertions::assert_eq;
use std::time::Duration;

use crate::helpers::{FakeApi, Harness, ack, at_bottom, inbound, server_error, settle};

#[tokio::test(start_paused = true)]
async fn oi_is_promoted_to_confirmed_id() {
    let api = FakeApi::new();
    let request = |content: &str| SendMessageRequest {
        content: content.to_owned(),
        client_message_id: String::new(),
    };
    api.queue_send(Ok(ack("m-42", &request("oi"), Utc::now())));
    let mut h = Harness::open(api);
    h.pump().await;

    h.view.submit("oi", at_bottom()).unwrap();
    let pending = &h.view.messages()[0];
    assert!(pending.id.is_temporary());
    assert_eq!(pending.status, MessageStatus::Pending);
    assert_eq!(h.view.in_flight_sends(), 1);

    h.pump().await;

    let messages = h.view.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, MessageId::confirmed("m-42"));
    assert_eq!(messages[0].status, MessageStatus::Sent);
    assert!(messages.iter().all(|message| !message.id.is_temporary()));
    assert_eq!(h.view.in_flight_sends(), 0);
}

#[tokio::test(start_paused = true)]
async fn promotion_keeps_index_after_history() {
    let history = (0..3).map(|i| inbound(&format!("m-{i}"), i, "oi")).collect();
    let mut h = Harness::open(FakeApi::new().with_messages(history));
    h.pump().await;

    h.view.submit("bom dia", at_bottom()).unwrap();
    assert_eq!(h.view.messages().len(), 4);
    assert!(h.view.messages()[3].id.is_temporary());

    h.pump().await;

    assert_eq!(h.ids(), vec!["m-0", "m-1", "m-2", "sent-1"]);
    assert_eq!(h.view.messages()[3].status, MessageStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn push_echo_before_ack_leaves_one_entry() {
    let api = FakeApi::new();
    *api.send_delay.lock().unwrap() = Duration::from_secs(2);
    let mut h = Harness::open(api);
    h.pump().await;

    h.view.submit("oi", at_bottom()).unwrap();
    settle().await;
    let sent = h.api.sends.lock().unwrap()[0].clone();
    h.api.queue_send(Ok(ack("m-1", &sent, Utc::now())));

    // The transport delivers the confirmed copy before the send call returns.
    let echo: WireMessage = serde_json::from_value(ack("m-1", &sent, Utc::now())).unwrap();
    h.push.message(echo);
    h.pump().await;
    assert_eq!(h.ids(), vec!["m-1"]);

    h.advance(Duration::from_secs(2)).await;
    assert_eq!(h.ids(), vec!["m-1"]);
    assert_eq!(h.view.messages()[0].status, MessageStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn failed_send_flips_only_that_message() {
    let api = FakeApi::new();
    api.queue_send(Err(server_error(500)));
    let mut h = Harness::open(api);
    h.pump().await;

    h.view.submit("primeira", at_bottom()).unwrap();
    h.view.submit("segunda", at_bottom()).unwrap();
    h.pump().await;

    let messages = h.view.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "primeira");
    assert_eq!(messages[0].status, MessageStatus::Failed);
    assert!(messages[0].id.is_temporary());
    assert_eq!(messages[1].status, MessageStatus::Sent);
    assert!(!messages[1].id.is_temporary());

    let failed = h.view.latest_failed().unwrap();
    assert_eq!(h.view.failure(failed), Some(SendFailure::Server { status: 500 }));
    assert!(h.view.notice().is_some());
}

#[tokio::test(start_paused = true)]
async fn send_timeout_marks_failed_and_retry_recovers() {
    let api = FakeApi::new();
    *api.send_delay.lock().unwrap() = Duration::from_secs(60);
    let mut h = Harness::open(api);
    h.pump().await;

    h.view.submit("oi", at_bottom()).unwrap();
    settle().await;
    h.advance(h.config.send_timeout + Duration::from_millis(1)).await;

    let failed = h.view.latest_failed().unwrap();
    assert_eq!(h.view.failure(failed), Some(SendFailure::Timeout));

    *h.api.send_delay.lock().unwrap() = Duration::ZERO;
    h.view.retry(failed).unwrap();
    assert_eq!(h.view.messages()[0].status, MessageStatus::Pending);
    h.pump().await;

    assert_eq!(h.view.messages().len(), 1);
    assert_eq!(h.view.messages()[0].status, MessageStatus::Sent);
    assert_eq!(h.view.latest_failed(), None);
    // Both attempts carried the same client message id.
    let sends = h.api.sends.lock().unwrap();
    assert_eq!(sends[0].client_message_id, sends[1].client_message_id);
}

#[tokio::test(start_paused = true)]
async fn failed_message_can_be_edited_or_discarded() {
    let api = FakeApi::new();
    api.queue_send(Err(server_error(422)));
    api.queue_send(Err(server_error(422)));
    let mut h = Harness::open(api);
    h.pump().await;

    h.view.submit("errado", at_bottom()).unwrap();
    h.view.submit("outro", at_bottom()).unwrap();
    h.pump().await;
    let first = h.view.messages()[0].id.temporary_uuid().unwrap();
    let second = h.view.messages()[1].id.temporary_uuid().unwrap();
    assert_eq!(h.view.failure(first), Some(SendFailure::Rejected { status: 422 }));

    h.view.edit_failed(first, "certo").unwrap();
    h.view.retry(first).unwrap();
    h.view.discard(second).unwrap();
    h.pump().await;

    assert_eq!(h.api.sent_contents(), vec!["errado", "outro", "certo"]);
    assert_eq!(h.view.messages().len(), 1);
    assert_eq!(h.view.messages()[0].content, "certo");
    assert_eq!(h.view.messages()[0].status, MessageStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn invalid_operations_are_rejected() {
    let mut h = Harness::open(FakeApi::new());
    h.pump().await;

    assert_eq!(h.view.submit("   ", at_bottom()), Err(SendError::EmptyContent));
    assert!(h.view.messages().is_empty());

    h.view.submit("oi", at_bottom()).unwrap();
    let temp = h.view.messages()[0].id.temporary_uuid().unwrap();
    assert_eq!(h.view.retry(temp), Err(SendError::AlreadyInFlight(temp)));
    assert_eq!(h.view.discard(temp), Err(SendError::NotFailed(temp)));

    let unknown = uuid::Uuid::new_v4();
    assert_eq!(h.view.discard(unknown), Err(SendError::UnknownMessage(unknown)));
}
