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

//! One open conversation.
//!
//! [`ConversationView`] owns the store and every component that feeds it. It
//! is the only place the store is mutated: background work reports back as
//! [`SyncEvent`]s on the channel returned by [`ConversationView::open`], and
//! the caller applies them one at a time through
//! [`ConversationView::handle_event`].

use super::config::SyncConfig;
use super::events::{PushSignal, PushSink, SyncEvent};
use super::outbox::{OptimisticSendController, SendError, SendPhase, SendRequest, SendResolution};
use super::receipts::ReadReceiptBatcher;
use super::scheduler::Scheduler;
use super::scroll::{ScrollAnchorPolicy, ScrollDecision, Viewport};
use super::store::{MessageStore, StoreChange, UpsertOutcome};
use super::transport::{ConnectionState, TransportSupervisor, TransportTransition};
use super::typing::{TypingDebouncer, TypingTracker};
use crate::api::client::InboxApi;
use crate::api::error_handling::{ApiError, SendFailure};
use crate::api::model::{
    Conversation, ConversationPatch, Message, MessageId, MessageStatus, TypingState,
};
use crate::api::push::{PushChannel, Subscription};
use crate::api::types::{PushEvent, SendMessageRequest, WireMessage};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    Loading,
    Loaded,
    /// Initial fetch failed; a retry is scheduled.
    Failed(ApiError),
}

pub struct ConversationView {
    conversation: Conversation,
    conversation_loaded: bool,
    startup_error: Option<ApiError>,
    history: HistoryState,
    store: MessageStore,
    outbox: OptimisticSendController,
    transport: TransportSupervisor,
    receipts: ReadReceiptBatcher,
    local_typing: TypingDebouncer,
    remote_typing: TypingTracker,
    scroll: ScrollAnchorPolicy,
    scheduler: Scheduler,
    api: Arc<dyn InboxApi>,
    subscription: Option<Subscription>,
    config: SyncConfig,
    visible: bool,
    /// `ai_enabled` before an optimistic toggle, kept until the patch settles.
    ai_toggle_rollback: Option<bool>,
    notice: Option<String>,
}

impl ConversationView {
    /// Open a conversation: start the initial fetches, arm polling and
    /// subscribe to push. Events for the view arrive on the returned receiver.
    pub fn open(
        conversation_id: &str,
        api: Arc<dyn InboxApi>,
        push: Option<&dyn PushChannel>,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx.clone());
        let transport = TransportSupervisor::start(&mut scheduler, config.poll_interval);
        let subscription = push.map(|channel| channel.subscribe(conversation_id, PushSink::new(tx)));

        let mut view = Self {
            conversation: Conversation::placeholder(conversation_id),
            conversation_loaded: false,
            startup_error: None,
            history: HistoryState::Loading,
            store: MessageStore::new(conversation_id),
            outbox: OptimisticSendController::new(),
            transport,
            receipts: ReadReceiptBatcher::new(),
            local_typing: TypingDebouncer::new(config.local_typing_quiet),
            remote_typing: TypingTracker::new(config.remote_typing_expiry),
            scroll: ScrollAnchorPolicy::new(config.near_bottom_threshold),
            scheduler,
            api,
            subscription,
            config,
            visible: true,
            ai_toggle_rollback: None,
            notice: None,
        };

        let api = Arc::clone(&view.api);
        let id = conversation_id.to_owned();
        view.scheduler.spawn(async move {
            SyncEvent::ConversationLoaded(api.fetch_conversation(&id).await)
        });
        view.fetch_history();
        tracing::info!(conversation = conversation_id, push = push.is_some(), "conversation opened");
        (view, rx)
    }

    /// Apply one event. `viewport` is the chat viewport as last rendered.
    pub fn handle_event(&mut self, event: SyncEvent, viewport: Viewport) -> ScrollDecision {
        match event {
            SyncEvent::ConversationLoaded(Ok(conversation)) => {
                self.conversation = conversation;
                self.keep_settling_toggle();
                self.conversation_loaded = true;
                self.flush_receipts();
                ScrollDecision::Keep
            }
            SyncEvent::ConversationLoaded(Err(err)) => {
                tracing::error!(conversation = %self.conversation.id, "failed to load conversation: {err}");
                self.startup_error = Some(err);
                ScrollDecision::Keep
            }
            SyncEvent::HistoryLoaded(Ok(batch)) => {
                self.history = HistoryState::Loaded;
                self.apply_batch(batch, true, viewport)
            }
            SyncEvent::HistoryLoaded(Err(err)) => {
                tracing::warn!(conversation = %self.conversation.id, "history fetch failed: {err}");
                self.history = HistoryState::Failed(err);
                let _retry = self.scheduler.after(self.config.poll_interval, SyncEvent::RetryHistory);
                ScrollDecision::Keep
            }
            SyncEvent::RetryHistory => {
                if matches!(self.history, HistoryState::Failed(_)) {
                    self.history = HistoryState::Loading;
                    self.fetch_history();
                }
                ScrollDecision::Keep
            }
            SyncEvent::Push(PushSignal::Connectivity(connected)) => {
                self.on_connectivity(connected);
                ScrollDecision::Keep
            }
            SyncEvent::Push(PushSignal::Event(event)) => self.on_push_event(event, viewport),
            SyncEvent::PollTick => {
                if self.transport.begin_poll() {
                    self.spawn_poll();
                }
                ScrollDecision::Keep
            }
            SyncEvent::PollFetched(result) => {
                self.transport.poll_finished();
                match result {
                    Ok(batch) => {
                        // Until history lands, a poll is the history.
                        let initial = self.history != HistoryState::Loaded;
                        self.apply_batch(batch, initial, viewport)
                    }
                    Err(err) => {
                        tracing::warn!(conversation = %self.conversation.id, "poll failed: {err}");
                        ScrollDecision::Keep
                    }
                }
            }
            SyncEvent::SendFinished { temp_id, attempt, result } => {
                self.on_send_finished(temp_id, attempt, result, viewport)
            }
            SyncEvent::ReceiptsFlushed(result) => {
                self.on_receipts_flushed(result);
                ScrollDecision::Keep
            }
            SyncEvent::ConversationPatched(result) => {
                self.on_conversation_patched(result);
                ScrollDecision::Keep
            }
            SyncEvent::RemoteTypingExpired { participant, generation } => {
                self.remote_typing.on_expired(&participant, generation, &mut self.scheduler);
                ScrollDecision::Keep
            }
            SyncEvent::LocalTypingIdle { generation } => {
                if let Some(state) = self.local_typing.on_idle(generation, &mut self.scheduler) {
                    self.notify_typing(state);
                }
                ScrollDecision::Keep
            }
            SyncEvent::TypingNotified(result) => {
                if let Err(err) = result {
                    tracing::debug!(conversation = %self.conversation.id, "typing notice failed: {err}");
                }
                ScrollDecision::Keep
            }
        }
    }

    /// Submit a draft. The PENDING entry is in the store when this returns.
    pub fn submit(&mut self, draft: &str, viewport: Viewport) -> Result<ScrollDecision, SendError> {
        let mut change = StoreChange::begin(&self.store);
        let (request, outcome) = self.outbox.submit(&mut self.store, draft, Utc::now())?;
        change.record(&self.store, outcome);
        self.dispatch(request);
        if let Some(state) = self.local_typing.on_sent(&mut self.scheduler) {
            self.notify_typing(state);
        }
        Ok(self.scroll.on_mutation(&change, viewport))
    }

    pub fn retry(&mut self, temp_id: Uuid) -> Result<(), SendError> {
        let request = self.outbox.retry(&mut self.store, temp_id)?;
        self.dispatch(request);
        Ok(())
    }

    pub fn edit_failed(&mut self, temp_id: Uuid, draft: &str) -> Result<(), SendError> {
        self.outbox.edit(&mut self.store, temp_id, draft)
    }

    pub fn discard(&mut self, temp_id: Uuid) -> Result<(), SendError> {
        self.outbox.discard(&mut self.store, temp_id)
    }

    /// Most recent FAILED message, the target of the retry affordance.
    #[must_use]
    pub fn latest_failed(&self) -> Option<Uuid> {
        self.store.list_ordered().iter().rev().find_map(|message| match message.id {
            MessageId::Temporary(temp)
                if message.status == MessageStatus::Failed && self.outbox.is_outgoing(temp) =>
            {
                Some(temp)
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn failure(&self, temp_id: Uuid) -> Option<SendFailure> {
        match self.outbox.phase(temp_id)? {
            SendPhase::Failed(failure) => Some(failure),
            SendPhase::Pending => None,
        }
    }

    /// The draft changed.
    pub fn input_changed(&mut self, draft: &str) {
        if let Some(state) = self.local_typing.on_input(draft, Instant::now(), &mut self.scheduler)
        {
            self.notify_typing(state);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        let became_visible = visible && !self.visible;
        self.visible = visible;
        if became_visible {
            self.flush_receipts();
        }
    }

    /// Optimistically flip the AI assistant flag. Returns `false` while a
    /// previous toggle is still settling.
    pub fn set_ai_enabled(&mut self, enabled: bool) -> bool {
        if self.ai_toggle_rollback.is_some() {
            return false;
        }
        if self.conversation.ai_enabled == enabled {
            return true;
        }
        self.ai_toggle_rollback = Some(self.conversation.ai_enabled);
        self.conversation.ai_enabled = enabled;
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        self.scheduler.spawn(async move {
            SyncEvent::ConversationPatched(
                api.patch_conversation(&id, &ConversationPatch::ai_enabled(enabled)).await,
            )
        });
        true
    }

    pub fn toggle_ai(&mut self) -> bool {
        self.set_ai_enabled(!self.conversation.ai_enabled)
    }

    pub fn user_scrolled(&mut self, viewport: Viewport) {
        self.scroll.on_user_scroll(viewport);
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll.jump_to_bottom();
    }

    /// Tear the view down. Returns how many scheduled tasks were still live.
    pub fn close(mut self) -> usize {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        let live = self.scheduler.live_count();
        self.local_typing.shutdown(&mut self.scheduler);
        self.remote_typing.shutdown(&mut self.scheduler);
        self.transport.shutdown(&mut self.scheduler);
        self.scheduler.shutdown();
        tracing::info!(conversation = %self.conversation.id, cancelled = live, "conversation closed");
        live
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.store.list_ordered()
    }

    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    #[must_use]
    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    #[must_use]
    pub fn startup_error(&self) -> Option<&ApiError> {
        self.startup_error.as_ref()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.transport.is_polling()
    }

    #[must_use]
    pub fn typing_participants(&self) -> Vec<&str> {
        self.remote_typing.participants()
    }

    #[must_use]
    pub fn has_new_messages(&self) -> bool {
        self.scroll.has_new_messages()
    }

    #[must_use]
    pub fn in_flight_sends(&self) -> usize {
        self.outbox.in_flight()
    }

    /// Last recoverable problem worth showing in the status line.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn fetch_history(&mut self) {
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        self.scheduler.spawn(async move { SyncEvent::HistoryLoaded(api.fetch_messages(&id).await) });
    }

    fn spawn_poll(&mut self) {
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        self.scheduler.spawn(async move { SyncEvent::PollFetched(api.fetch_messages(&id).await) });
    }

    fn on_connectivity(&mut self, connected: bool) {
        let transition = self.transport.on_connectivity(&mut self.scheduler, connected);
        if transition == TransportTransition::DisarmedPolling
            && self.history == HistoryState::Loaded
            && self.transport.begin_catch_up()
        {
            // Close the gap between the last poll and the stream coming up.
            self.spawn_poll();
        }
    }

    fn on_push_event(&mut self, event: PushEvent, viewport: Viewport) -> ScrollDecision {
        match event {
            PushEvent::Message { payload } => self.apply_batch(vec![payload], false, viewport),
            PushEvent::ConversationUpdate { payload } => {
                self.conversation.apply_update(payload);
                self.flush_receipts();
                ScrollDecision::Keep
            }
            PushEvent::Typing { participant, state } => {
                self.remote_typing.on_signal(&participant, state, &mut self.scheduler);
                ScrollDecision::Keep
            }
        }
    }

    /// Upsert a batch from the transport. `initial` marks the history load,
    /// whose unread state comes from the server rather than from arrival.
    fn apply_batch(
        &mut self,
        batch: Vec<WireMessage>,
        initial: bool,
        viewport: Viewport,
    ) -> ScrollDecision {
        let mut change = StoreChange::begin(&self.store);
        for wire in batch {
            let outcome = self.store.upsert_wire(wire);
            change.record(&self.store, outcome);
            if let UpsertOutcome::Promoted { index } = outcome
                && let Some(temp) = self.store.list_ordered().get(index).and_then(|m| m.client_ref)
                && self.outbox.confirm_external(temp)
            {
                tracing::debug!(%temp, "send confirmed by transport before acknowledgement");
            }
        }
        if change.rejected > 0 {
            tracing::warn!(
                conversation = %self.conversation.id,
                rejected = change.rejected,
                "dropped malformed messages"
            );
        }

        let mut unread = Vec::new();
        for id in &change.inbound_inserted {
            let Some(message) = self.store.get(id) else { continue };
            let (sender_name, status) = (message.sender_name.clone(), message.status);
            self.clear_typing_for(sender_name);
            if !initial || status != MessageStatus::Read {
                unread.push(id.clone());
            }
        }
        if !initial && !unread.is_empty() {
            let arrived = u32::try_from(unread.len()).unwrap_or(u32::MAX);
            self.conversation.unread_count = self.conversation.unread_count.saturating_add(arrived);
        }
        self.receipts.track(unread);
        self.flush_receipts();

        self.scroll.on_mutation(&change, viewport)
    }

    /// An inbound message ends its author's typing indicator.
    fn clear_typing_for(&mut self, sender_name: Option<String>) {
        let candidates = [
            sender_name,
            self.conversation.contact_name.clone(),
            self.conversation.contact_phone.clone(),
        ];
        for participant in candidates.into_iter().flatten() {
            self.remote_typing.clear(&participant, &mut self.scheduler);
        }
    }

    fn dispatch(&mut self, request: SendRequest) {
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        let timeout = self.config.send_timeout;
        let body = SendMessageRequest {
            client_message_id: request.client_message_id(),
            content: request.content,
        };
        let (temp_id, attempt) = (request.temp_id, request.attempt);
        self.scheduler.spawn(async move {
            let result = tokio::time::timeout(timeout, api.send_message(&id, &body))
                .await
                .unwrap_or(Err(ApiError::Timeout));
            SyncEvent::SendFinished { temp_id, attempt, result }
        });
    }

    fn on_send_finished(
        &mut self,
        temp_id: Uuid,
        attempt: u32,
        result: Result<serde_json::Value, ApiError>,
        viewport: Viewport,
    ) -> ScrollDecision {
        let mut change = StoreChange::begin(&self.store);
        match self.outbox.resolve(&mut self.store, temp_id, attempt, result) {
            SendResolution::Promoted { index } => {
                change.record(&self.store, UpsertOutcome::Promoted { index });
            }
            SendResolution::DegradedToSent => change.updated += 1,
            SendResolution::Failed(failure) => {
                change.updated += 1;
                self.notice = Some(format!("Message not sent ({}). Ctrl+R to retry.", failure.label()));
            }
            SendResolution::Stale => {}
        }
        self.scroll.on_mutation(&change, viewport)
    }

    fn flush_receipts(&mut self) {
        // The real unread count is unknown until the header has loaded.
        if !self.conversation_loaded {
            return;
        }
        let Some(batch) = self.receipts.take_batch(self.visible, self.conversation.unread_count)
        else {
            return;
        };
        tracing::debug!(conversation = %self.conversation.id, count = batch.len(), "flushing read receipts");
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        let patch = ConversationPatch::mark_as_read(batch.iter().map(MessageId::to_string).collect());
        self.scheduler.spawn(async move {
            SyncEvent::ReceiptsFlushed(api.patch_conversation(&id, &patch).await)
        });
    }

    fn on_receipts_flushed(&mut self, result: Result<Conversation, ApiError>) {
        match result {
            Ok(conversation) => {
                self.receipts.flush_succeeded();
                self.conversation = conversation;
                // Ids that arrived during the flight are still unread.
                let queued = u32::try_from(self.receipts.pending_len()).unwrap_or(u32::MAX);
                self.conversation.unread_count = self.conversation.unread_count.max(queued);
                self.keep_settling_toggle();
                self.flush_receipts();
            }
            Err(err) => {
                tracing::warn!(conversation = %self.conversation.id, "read receipt flush failed: {err}");
                self.receipts.flush_failed();
            }
        }
    }

    /// A toggle whose patch is still outstanding keeps its optimistic value.
    fn keep_settling_toggle(&mut self) {
        if let Some(previous) = self.ai_toggle_rollback {
            self.conversation.ai_enabled = !previous;
        }
    }

    fn on_conversation_patched(&mut self, result: Result<Conversation, ApiError>) {
        let previous = self.ai_toggle_rollback.take();
        match result {
            Ok(conversation) => {
                let unread = self.conversation.unread_count;
                self.conversation = conversation;
                if self.receipts.is_flushing() {
                    self.conversation.unread_count = unread;
                }
            }
            Err(err) => {
                tracing::warn!(conversation = %self.conversation.id, "AI toggle failed: {err}");
                if let Some(previous) = previous {
                    self.conversation.ai_enabled = previous;
                }
                self.notice = Some("Could not change the AI assistant setting.".to_owned());
            }
        }
    }

    fn notify_typing(&mut self, state: TypingState) {
        let api = Arc::clone(&self.api);
        let id = self.conversation.id.clone();
        self.scheduler
            .spawn(async move { SyncEvent::TypingNotified(api.notify_typing(&id, state).await) });
    }
}
