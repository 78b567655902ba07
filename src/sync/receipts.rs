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

use crate::api::model::MessageId;
use std::collections::HashSet;

/// Collects unread inbound ids and releases them as one acknowledgement.
///
/// An id moves `pending → in_flight → acknowledged`; a failed flush moves the
/// batch back to `pending`. Acknowledged ids are never tracked again for the
/// lifetime of the view.
#[derive(Debug, Default)]
pub struct ReadReceiptBatcher {
    pending: Vec<MessageId>,
    in_flight: Vec<MessageId>,
    /// Every id in `pending` or `in_flight`, for constant-time membership.
    queued: HashSet<MessageId>,
    acknowledged: HashSet<MessageId>,
}

impl ReadReceiptBatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue newly arrived inbound ids. Temporary ids are never acknowledged.
    pub fn track<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = MessageId>,
    {
        for id in ids {
            if id.is_temporary() || self.acknowledged.contains(&id) || self.queued.contains(&id) {
                continue;
            }
            self.queued.insert(id.clone());
            self.pending.push(id);
        }
    }

    /// Take the batch for a flush. Returns `None` when the view is hidden, a
    /// flush is already outstanding, or there is nothing unread.
    pub fn take_batch(&mut self, visible: bool, unread_count: u32) -> Option<Vec<MessageId>> {
        if unread_count == 0 && self.in_flight.is_empty() {
            // Nothing is unread server-side; what we collected was read elsewhere.
            for id in self.pending.drain(..) {
                self.queued.remove(&id);
                self.acknowledged.insert(id);
            }
            return None;
        }
        if !visible || !self.in_flight.is_empty() || self.pending.is_empty() {
            return None;
        }
        self.in_flight = std::mem::take(&mut self.pending);
        Some(self.in_flight.clone())
    }

    pub fn flush_succeeded(&mut self) {
        for id in self.in_flight.drain(..) {
            self.queued.remove(&id);
            self.acknowledged.insert(id);
        }
    }

    /// Return the in-flight batch to the front of the pending queue.
    pub fn flush_failed(&mut self) {
        let mut batch = std::mem::take(&mut self.in_flight);
        batch.append(&mut self.pending);
        self.pending = batch;
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        !self.in_flight.is_empty()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_acknowledged(&self, id: &MessageId) -> bool {
        self.acknowledged.contains(id)
    }
}
