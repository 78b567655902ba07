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

use crate::api::error_handling::ApiError;
use crate::api::model::Conversation;
use crate::api::types::{PushEvent, WireMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Everything that can change a conversation view, posted by background
/// tasks and timers and applied by the event loop in arrival order.
#[derive(Debug)]
pub enum SyncEvent {
    /// Conversation header fetched at open.
    ConversationLoaded(Result<Conversation, ApiError>),
    /// Initial history fetch completed.
    HistoryLoaded(Result<Vec<WireMessage>, ApiError>),
    /// Re-request history after a failed initial load.
    RetryHistory,
    /// Push channel output (connectivity or an event).
    Push(PushSignal),
    /// Polling interval elapsed.
    PollTick,
    /// A poll fetch completed.
    PollFetched(Result<Vec<WireMessage>, ApiError>),
    /// Outbound send completed for one attempt of an optimistic message.
    SendFinished { temp_id: Uuid, attempt: u32, result: Result<serde_json::Value, ApiError> },
    /// Read acknowledgement completed.
    ReceiptsFlushed(Result<Conversation, ApiError>),
    /// A user-initiated conversation patch (AI toggle) completed.
    ConversationPatched(Result<Conversation, ApiError>),
    /// A remote participant's typing signal ran out.
    RemoteTypingExpired { participant: String, generation: u64 },
    /// The local user stopped typing for the quiet period.
    LocalTypingIdle { generation: u64 },
    /// Fire-and-forget typing notification completed.
    TypingNotified(Result<(), ApiError>),
}

#[derive(Debug)]
pub enum PushSignal {
    Connectivity(bool),
    Event(PushEvent),
}

/// Handle given to the push channel so it can feed the view's event loop.
#[derive(Debug, Clone)]
pub struct PushSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl PushSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the view has gone away.
    pub fn connectivity(&self, connected: bool) -> bool {
        self.tx.send(SyncEvent::Push(PushSignal::Connectivity(connected))).is_ok()
    }

    /// Returns `false` once the view has gone away.
    pub fn event(&self, event: PushEvent) -> bool {
        self.tx.send(SyncEvent::Push(PushSignal::Event(event))).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
