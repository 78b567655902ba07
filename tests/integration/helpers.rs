use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_inbox::api::model::{Conversation, ConversationPatch, TypingState};
use clinic_inbox::api::types::{PushEvent, SendMessageRequest, WireMessage};
use clinic_inbox::api::{ApiError, InboxApi, PushChannel, Subscription};
use clinic_inbox::sync::{ConversationView, PushSink, ScrollDecision, SyncConfig, SyncEvent, Viewport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const CONVERSATION: &str = "c1";

/// Recording [`InboxApi`]. Queued results are consumed in call order; when a
/// queue is empty the fake answers like a well-behaved server.
#[derive(Default)]
pub struct FakeApi {
    pub conversation: Mutex<Option<Conversation>>,
    pub conversation_error: Mutex<Option<ApiError>>,
    pub history: Mutex<VecDeque<Result<Vec<WireMessage>, ApiError>>>,
    pub messages: Mutex<Vec<WireMessage>>,
    pub send_results: Mutex<VecDeque<Result<serde_json::Value, ApiError>>>,
    pub send_delay: Mutex<Duration>,
    pub patch_results: Mutex<VecDeque<Result<Conversation, ApiError>>>,
    pub sends: Mutex<Vec<SendMessageRequest>>,
    pub patches: Mutex<Vec<ConversationPatch>>,
    pub typing: Mutex<Vec<TypingState>>,
    pub fetches: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        *api.conversation.lock().unwrap() = Some(conversation());
        api
    }

    pub fn with_messages(self, messages: Vec<WireMessage>) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    pub fn with_unread(self, unread: u32) -> Self {
        if let Some(conversation) = self.conversation.lock().unwrap().as_mut() {
            conversation.unread_count = unread;
        }
        self
    }

    pub fn queue_history(&self, result: Result<Vec<WireMessage>, ApiError>) {
        self.history.lock().unwrap().push_back(result);
    }

    pub fn queue_send(&self, result: Result<serde_json::Value, ApiError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn queue_patch(&self, result: Result<Conversation, ApiError>) {
        self.patch_results.lock().unwrap().push_back(result);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.sends.lock().unwrap().iter().map(|send| send.content.clone()).collect()
    }

    /// Message ids of every mark-as-read patch, in call order.
    pub fn read_batches(&self) -> Vec<Vec<String>> {
        self.patches
            .lock()
            .unwrap()
            .iter()
            .filter(|patch| patch.mark_as_read == Some(true))
            .map(|patch| patch.message_ids.clone().unwrap_or_default())
            .collect()
    }

    pub fn typing_notices(&self) -> Vec<TypingState> {
        self.typing.lock().unwrap().clone()
    }
}

#[async_trait]
impl InboxApi for FakeApi {
    async fn fetch_conversation(&self, _conversation_id: &str) -> Result<Conversation, ApiError> {
        if let Some(err) = self.conversation_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.conversation.lock().unwrap().clone().unwrap_or_else(conversation))
    }

    async fn fetch_messages(&self, _conversation_id: &str) -> Result<Vec<WireMessage>, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.history.lock().unwrap().pop_front() {
            return result;
        }
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn send_message(
        &self,
        _conversation_id: &str,
        request: &SendMessageRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let n = {
            let mut sends = self.sends.lock().unwrap();
            sends.push(request.clone());
            sends.len()
        };
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(result) = self.send_results.lock().unwrap().pop_front() {
            return result;
        }
        Ok(ack(&format!("sent-{n}"), request, Utc::now()))
    }

    async fn patch_conversation(
        &self,
        _conversation_id: &str,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError> {
        self.patches.lock().unwrap().push(patch.clone());
        if let Some(result) = self.patch_results.lock().unwrap().pop_front() {
            return result;
        }
        let mut guard = self.conversation.lock().unwrap();
        let current = guard.get_or_insert_with(conversation);
        if patch.mark_as_read == Some(true) {
            current.unread_count = 0;
        }
        if let Some(enabled) = patch.ai_enabled {
            current.ai_enabled = enabled;
        }
        Ok(current.clone())
    }

    async fn notify_typing(&self, _conversation_id: &str, state: TypingState) -> Result<(), ApiError> {
        self.typing.lock().unwrap().push(state);
        Ok(())
    }
}

/// [`PushChannel`] driven by hand from the test body.
#[derive(Default)]
pub struct ManualPush {
    sink: Mutex<Option<PushSink>>,
}

impl ManualPush {
    pub fn connect(&self, connected: bool) {
        let sink = self.sink.lock().unwrap();
        assert!(sink.as_ref().expect("subscribed").connectivity(connected));
    }

    pub fn deliver(&self, event: PushEvent) {
        let sink = self.sink.lock().unwrap();
        assert!(sink.as_ref().expect("subscribed").event(event));
    }

    pub fn message(&self, payload: WireMessage) {
        self.deliver(PushEvent::Message { payload });
    }

    pub fn typing(&self, participant: &str, state: TypingState) {
        self.deliver(PushEvent::Typing { participant: participant.to_owned(), state });
    }
}

impl PushChannel for ManualPush {
    fn subscribe(&self, conversation_id: &str, sink: PushSink) -> Subscription {
        assert_eq!(conversation_id, CONVERSATION);
        *self.sink.lock().unwrap() = Some(sink);
        Subscription::inert()
    }
}

/// An open view plus the fakes behind it.
pub struct Harness {
    pub view: ConversationView,
    pub rx: mpsc::UnboundedReceiver<SyncEvent>,
    pub api: Arc<FakeApi>,
    pub push: Arc<ManualPush>,
    pub viewport: Viewport,
    pub config: SyncConfig,
}

impl Harness {
    pub fn open(api: FakeApi) -> Self {
        Self::open_with(api, SyncConfig::default())
    }

    pub fn open_with(api: FakeApi, config: SyncConfig) -> Self {
        let api = Arc::new(api);
        let push = Arc::new(ManualPush::default());
        let (view, rx) = ConversationView::open(
            CONVERSATION,
            Arc::clone(&api) as Arc<dyn InboxApi>,
            Some(push.as_ref() as &dyn PushChannel),
            config,
        );
        Self { view, rx, api, push, viewport: at_bottom(), config }
    }

    /// Let background tasks run and apply every event they post, until the
    /// queue stays empty. Returns the scroll decisions in order.
    pub async fn pump(&mut self) -> Vec<ScrollDecision> {
        let mut decisions = Vec::new();
        loop {
            settle().await;
            let mut applied = false;
            while let Ok(event) = self.rx.try_recv() {
                decisions.push(self.view.handle_event(event, self.viewport));
                applied = true;
            }
            if !applied {
                return decisions;
            }
        }
    }

    /// Move the paused clock forward, then pump.
    pub async fn advance(&mut self, by: Duration) -> Vec<ScrollDecision> {
        tokio::time::advance(by).await;
        self.pump().await
    }

    pub fn ids(&self) -> Vec<String> {
        self.view.messages().iter().map(|message| message.id.to_string()).collect()
    }
}

/// Yield enough times for spawned tasks to run to completion.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Viewport pinned to the bottom of a short chat.
pub fn at_bottom() -> Viewport {
    Viewport { offset: 0, content_height: 10, viewport_height: 20 }
}

/// Viewport scrolled to the top of a long chat.
pub fn scrolled_up() -> Viewport {
    Viewport { offset: 0, content_height: 200, viewport_height: 20 }
}

pub fn conversation() -> Conversation {
    Conversation {
        contact_name: Some("Ana".to_owned()),
        contact_phone: Some("5511999".to_owned()),
        ai_enabled: true,
        ..Conversation::placeholder(CONVERSATION)
    }
}

pub fn at(minute: u32) -> String {
    format!("2025-03-01T12:{minute:02}:00Z")
}

pub fn inbound(id: &str, minute: u32, content: &str) -> WireMessage {
    WireMessage {
        id: Some(id.to_owned()),
        conversation_id: Some(CONVERSATION.to_owned()),
        direction: Some("INBOUND".to_owned()),
        sender_kind: Some("CLIENT".to_owned()),
        sender_name: Some("Ana".to_owned()),
        content: Some(content.to_owned()),
        status: Some("DELIVERED".to_owned()),
        created_at: Some(at(minute)),
        client_message_id: None,
    }
}

pub fn outbound(id: &str, minute: u32, content: &str) -> WireMessage {
    WireMessage {
        direction: Some("OUTBOUND".to_owned()),
        sender_kind: Some("HUMAN".to_owned()),
        sender_name: None,
        status: Some("SENT".to_owned()),
        ..inbound(id, minute, content)
    }
}

/// Server acknowledgement for `request`, echoing its client message id.
pub fn ack(id: &str, request: &SendMessageRequest, created_at: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "conversationId": CONVERSATION,
        "direction": "OUTBOUND",
        "senderKind": "HUMAN",
        "content": request.content,
        "status": "SENT",
        "createdAt": created_at.to_rfc3339(),
        "clientMessageId": request.client_message_id,
    })
}

pub fn server_error(status: u16) -> ApiError {
    ApiError::Status { status, body: "boom".to_owned() }
}
