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

//! Lifecycle of locally authored messages.
//!
//! `submit` inserts a PENDING entry under a temporary id and hands back the
//! request to dispatch. The acknowledgement either promotes the entry to its
//! confirmed id or flips it to FAILED in place. FAILED entries can be edited,
//! retried under the same temporary id, or discarded.

use super::store::{MessageStore, UpsertOutcome};
use crate::api::error_handling::{ApiError, SendFailure, classify_send_failure};
use crate::api::model::{Message, MessageId, MessageStatus};
use crate::api::types::WireMessage;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Pending,
    Failed(SendFailure),
}

#[derive(Debug)]
struct Outgoing {
    content: String,
    attempt: u32,
    phase: SendPhase,
}

/// One dispatch of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub temp_id: Uuid,
    pub attempt: u32,
    pub content: String,
}

impl SendRequest {
    /// Idempotency key sent to the server and echoed back on the confirmed
    /// message.
    #[must_use]
    pub fn client_message_id(&self) -> String {
        MessageId::Temporary(self.temp_id).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyContent,
    #[error("no outgoing message {0}")]
    UnknownMessage(Uuid),
    #[error("message {0} is already being sent")]
    AlreadyInFlight(Uuid),
    #[error("message {0} has not failed")]
    NotFailed(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResolution {
    /// Swapped in under the confirmed id at `index`.
    Promoted { index: usize },
    /// The acknowledgement was unusable; the entry was marked SENT and keeps
    /// its temporary id.
    DegradedToSent,
    Failed(SendFailure),
    /// Result of an attempt that is no longer current, or for a message that
    /// is no longer outgoing.
    Stale,
}

#[derive(Debug, Default)]
pub struct OptimisticSendController {
    outgoing: HashMap<Uuid, Outgoing>,
}

impl OptimisticSendController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a PENDING entry for `draft` and return the request to dispatch.
    pub fn submit(
        &mut self,
        store: &mut MessageStore,
        draft: &str,
        now: DateTime<Utc>,
    ) -> Result<(SendRequest, UpsertOutcome), SendError> {
        let content = draft.trim();
        if content.is_empty() {
            return Err(SendError::EmptyContent);
        }

        let temp_id = Uuid::new_v4();
        let outcome =
            store.upsert(Message::optimistic(temp_id, store.conversation_id(), content, now));
        self.outgoing.insert(
            temp_id,
            Outgoing { content: content.to_owned(), attempt: 1, phase: SendPhase::Pending },
        );
        tracing::debug!(%temp_id, "optimistic message queued");
        Ok((SendRequest { temp_id, attempt: 1, content: content.to_owned() }, outcome))
    }

    /// Re-dispatch a FAILED message under its existing temporary id.
    pub fn retry(
        &mut self,
        store: &mut MessageStore,
        temp_id: Uuid,
    ) -> Result<SendRequest, SendError> {
        let entry = self.outgoing.get_mut(&temp_id).ok_or(SendError::UnknownMessage(temp_id))?;
        if entry.phase == SendPhase::Pending {
            return Err(SendError::AlreadyInFlight(temp_id));
        }
        entry.attempt += 1;
        entry.phase = SendPhase::Pending;
        store.set_status(&MessageId::Temporary(temp_id), MessageStatus::Pending);
        tracing::debug!(%temp_id, attempt = entry.attempt, "retrying send");
        Ok(SendRequest { temp_id, attempt: entry.attempt, content: entry.content.clone() })
    }

    /// Replace the content of a FAILED message ahead of a retry.
    pub fn edit(
        &mut self,
        store: &mut MessageStore,
        temp_id: Uuid,
        draft: &str,
    ) -> Result<(), SendError> {
        let entry = self.outgoing.get_mut(&temp_id).ok_or(SendError::UnknownMessage(temp_id))?;
        if entry.phase == SendPhase::Pending {
            return Err(SendError::AlreadyInFlight(temp_id));
        }
        let content = draft.trim();
        if content.is_empty() {
            return Err(SendError::EmptyContent);
        }
        content.clone_into(&mut entry.content);
        store.set_content(&MessageId::Temporary(temp_id), content);
        Ok(())
    }

    /// Drop a FAILED message from the timeline.
    pub fn discard(&mut self, store: &mut MessageStore, temp_id: Uuid) -> Result<(), SendError> {
        match self.outgoing.get(&temp_id).map(|entry| entry.phase) {
            None => Err(SendError::UnknownMessage(temp_id)),
            Some(SendPhase::Pending) => Err(SendError::NotFailed(temp_id)),
            Some(SendPhase::Failed(_)) => {
                self.outgoing.remove(&temp_id);
                store.remove(&MessageId::Temporary(temp_id));
                Ok(())
            }
        }
    }

    /// Apply the outcome of one dispatch.
    pub fn resolve(
        &mut self,
        store: &mut MessageStore,
        temp_id: Uuid,
        attempt: u32,
        result: Result<serde_json::Value, ApiError>,
    ) -> SendResolution {
        let ack = match result {
            Ok(ack) => ack,
            Err(err) => return self.fail(store, temp_id, attempt, &err),
        };

        let confirmed = serde_json::from_value::<WireMessage>(ack)
            .map_err(|err| err.to_string())
            .and_then(|wire| {
                wire.into_message(store.conversation_id()).map_err(|err| err.to_string())
            })
            .and_then(|message| {
                if message.id.is_temporary() {
                    Err("acknowledgement carried a temporary id".to_owned())
                } else {
                    Ok(message)
                }
            });

        let Some(entry) = self.outgoing.remove(&temp_id) else {
            // Already promoted by a pushed copy; keep the ack's data anyway.
            if let Ok(mut message) = confirmed {
                message.client_ref = Some(temp_id);
                store.upsert(message);
            }
            return SendResolution::Stale;
        };

        match confirmed {
            Ok(mut message) => {
                message.client_ref = Some(temp_id);
                match store.promote(temp_id, message) {
                    UpsertOutcome::Promoted { index }
                    | UpsertOutcome::Inserted { index }
                    | UpsertOutcome::Updated { index } => {
                        tracing::debug!(%temp_id, index, "send confirmed");
                        SendResolution::Promoted { index }
                    }
                    UpsertOutcome::Unchanged | UpsertOutcome::Rejected => {
                        SendResolution::DegradedToSent
                    }
                }
            }
            Err(reason) => {
                tracing::warn!(%temp_id, attempt = entry.attempt, "unusable send acknowledgement: {reason}");
                store.set_status(&MessageId::Temporary(temp_id), MessageStatus::Sent);
                SendResolution::DegradedToSent
            }
        }
    }

    /// The confirmed copy reached the store through the transport before the
    /// acknowledgement did.
    pub fn confirm_external(&mut self, temp_id: Uuid) -> bool {
        self.outgoing.remove(&temp_id).is_some()
    }

    #[must_use]
    pub fn phase(&self, temp_id: Uuid) -> Option<SendPhase> {
        self.outgoing.get(&temp_id).map(|entry| entry.phase)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.outgoing.values().filter(|entry| entry.phase == SendPhase::Pending).count()
    }

    #[must_use]
    pub fn is_outgoing(&self, temp_id: Uuid) -> bool {
        self.outgoing.contains_key(&temp_id)
    }

    fn fail(
        &mut self,
        store: &mut MessageStore,
        temp_id: Uuid,
        attempt: u32,
        err: &ApiError,
    ) -> SendResolution {
        let Some(entry) = self.outgoing.get_mut(&temp_id) else {
            return SendResolution::Stale;
        };
        if entry.attempt != attempt || entry.phase != SendPhase::Pending {
            tracing::debug!(%temp_id, attempt, current = entry.attempt, "ignoring stale send failure");
            return SendResolution::Stale;
        }
        let failure = classify_send_failure(err);
        entry.phase = SendPhase::Failed(failure);
        store.set_status(&MessageId::Temporary(temp_id), MessageStatus::Failed);
        tracing::warn!(%temp_id, attempt, failure = failure.label(), "send failed: {err}");
        SendResolution::Failed(failure)
    }
}
