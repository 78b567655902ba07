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

//! Ordered, deduplicated message timeline for one conversation.
//!
//! Entries live in a `Vec` kept in `(created_at, id)` order, with an
//! id → position index next to it. Lookups and the common tail append are
//! O(1); an out-of-order insert shifts and reindexes only the entries after
//! the insertion point.

use crate::api::model::{Message, MessageId, MessageStatus};
use crate::api::types::WireMessage;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { index: usize },
    Updated { index: usize },
    /// A temporary entry was replaced by its confirmed counterpart.
    Promoted { index: usize },
    /// Identical to what the store already held.
    Unchanged,
    /// Payload failed validation and was dropped.
    Rejected,
}

/// Summary of one batch of store mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreChange {
    pub was_empty: bool,
    pub inserted: usize,
    pub updated: usize,
    pub promoted: usize,
    pub removed: usize,
    pub rejected: usize,
    /// An optimistic (locally authored) entry was inserted.
    pub own_inserted: bool,
    /// Confirmed inbound messages that were not in the store before.
    pub inbound_inserted: Vec<MessageId>,
}

impl StoreChange {
    #[must_use]
    pub fn begin(store: &MessageStore) -> Self {
        Self { was_empty: store.is_empty(), ..Self::default() }
    }

    /// Fold one upsert result into the summary.
    pub fn record(&mut self, store: &MessageStore, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted { index } => {
                self.inserted += 1;
                if let Some(message) = store.list_ordered().get(index) {
                    if message.id.is_temporary() {
                        self.own_inserted = true;
                    } else if message.is_inbound() {
                        self.inbound_inserted.push(message.id.clone());
                    }
                }
            }
            UpsertOutcome::Updated { .. } => self.updated += 1,
            UpsertOutcome::Promoted { .. } => self.promoted += 1,
            UpsertOutcome::Rejected => self.rejected += 1,
            UpsertOutcome::Unchanged => {}
        }
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.promoted == 0 && self.removed == 0
    }
}

#[derive(Debug)]
pub struct MessageStore {
    conversation_id: String,
    entries: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl MessageStore {
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self { conversation_id: conversation_id.into(), entries: Vec::new(), index: HashMap::new() }
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    #[must_use]
    pub fn list_ordered(&self) -> &[Message] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.position(id).map(|i| &self.entries[i])
    }

    #[must_use]
    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Validate a transport payload and upsert it. Malformed payloads are
    /// logged and dropped.
    pub fn upsert_wire(&mut self, wire: WireMessage) -> UpsertOutcome {
        match wire.into_message(&self.conversation_id) {
            Ok(message) => self.upsert(message),
            Err(err) => {
                tracing::warn!(conversation = %self.conversation_id, "dropping message payload: {err}");
                UpsertOutcome::Rejected
            }
        }
    }

    /// Insert or merge a message. Idempotent for identical input.
    pub fn upsert(&mut self, message: Message) -> UpsertOutcome {
        if message.conversation_id != self.conversation_id {
            tracing::warn!(
                conversation = %self.conversation_id,
                foreign = %message.conversation_id,
                id = %message.id,
                "dropping message for another conversation"
            );
            return UpsertOutcome::Rejected;
        }

        if let Some(i) = self.position(&message.id) {
            // A confirmed copy arrived earlier without the echo; the echo now
            // identifies the optimistic entry it replaces.
            if let Some(temp) = message.client_ref
                && self.remove(&MessageId::Temporary(temp)).is_some()
            {
                let index = self.upsert_existing(message);
                return UpsertOutcome::Promoted { index };
            }
            if self.entries[i] == message {
                return UpsertOutcome::Unchanged;
            }
            let index = self.replace_at(i, message);
            return UpsertOutcome::Updated { index };
        }

        if let Some(temp) = message.client_ref
            && let Some(i) = self.position(&MessageId::Temporary(temp))
        {
            let index = self.replace_at(i, message);
            tracing::debug!(conversation = %self.conversation_id, %temp, index, "promoted via client ref");
            return UpsertOutcome::Promoted { index };
        }

        let index = self.insert_sorted(message);
        UpsertOutcome::Inserted { index }
    }

    /// Replace the temporary entry `temp` with its confirmed counterpart.
    ///
    /// If the confirmed id is already present (the push copy arrived before the
    /// send acknowledgement) the temporary entry is dropped instead, so the
    /// timeline never holds both.
    pub fn promote(&mut self, temp: Uuid, confirmed: Message) -> UpsertOutcome {
        let temp_id = MessageId::Temporary(temp);
        if self.position(&confirmed.id).is_some() {
            self.remove(&temp_id);
            let id = confirmed.id.clone();
            if self.upsert(confirmed) == UpsertOutcome::Rejected {
                return UpsertOutcome::Rejected;
            }
            return self
                .position(&id)
                .map_or(UpsertOutcome::Unchanged, |index| UpsertOutcome::Promoted { index });
        }
        match self.position(&temp_id) {
            Some(i) if confirmed.conversation_id == self.conversation_id => {
                let index = self.replace_at(i, confirmed);
                UpsertOutcome::Promoted { index }
            }
            _ => self.upsert(confirmed),
        }
    }

    /// Flip the status of an entry in place.
    pub fn set_status(&mut self, id: &MessageId, status: MessageStatus) -> bool {
        match self.position(id) {
            Some(i) if self.entries[i].status != status => {
                self.entries[i].status = status;
                true
            }
            _ => false,
        }
    }

    pub fn set_content(&mut self, id: &MessageId, content: &str) -> bool {
        match self.position(id) {
            Some(i) => {
                content.clone_into(&mut self.entries[i].content);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let i = self.index.remove(id)?;
        let removed = self.entries.remove(i);
        self.reindex_from(i);
        Some(removed)
    }

    fn upsert_existing(&mut self, message: Message) -> usize {
        match self.position(&message.id) {
            Some(i) => self.replace_at(i, message),
            None => self.insert_sorted(message),
        }
    }

    /// Write `message` into slot `i`. The slot is kept when the new
    /// `(created_at, id)` key still fits between its neighbours; otherwise the
    /// entry moves.
    fn replace_at(&mut self, i: usize, message: Message) -> usize {
        let key = (message.created_at, &message.id);
        let fits_before =
            i == 0 || (self.entries[i - 1].created_at, &self.entries[i - 1].id) <= key;
        let fits_after = i + 1 >= self.entries.len()
            || key <= (self.entries[i + 1].created_at, &self.entries[i + 1].id);

        let old_id = self.entries[i].id.clone();
        if old_id != message.id {
            self.index.remove(&old_id);
        }

        if fits_before && fits_after {
            self.index.insert(message.id.clone(), i);
            self.entries[i] = message;
            return i;
        }

        self.entries.remove(i);
        self.reindex_from(i);
        self.insert_sorted(message)
    }

    fn insert_sorted(&mut self, message: Message) -> usize {
        let key = (message.created_at, &message.id);
        let pos = self.entries.partition_point(|entry| (entry.created_at, &entry.id) <= key);
        self.entries.insert(pos, message);
        self.reindex_from(pos);
        pos
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, entry) in self.entries[start..].iter().enumerate() {
            self.index.insert(entry.id.clone(), start + offset);
        }
    }
}
