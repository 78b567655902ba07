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

//! Domain types shared by the sync core and the UI.
//!
//! Wire payloads live in [`crate::api::types`]; they are converted into these
//! types at the store boundary so nothing downstream has to handle missing
//! fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const TEMPORARY_ID_PREFIX: &str = "tmp-";

/// Message identity. Optimistic entries carry a client-generated temporary id
/// until the server confirms them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageId {
    Temporary(Uuid),
    Confirmed(String),
}

impl MessageId {
    #[must_use]
    pub fn confirmed(id: impl Into<String>) -> Self {
        Self::Confirmed(id.into())
    }

    /// Parse an id string as sent by the server. Strings carrying the
    /// temporary prefix are mapped back to the temporary variant.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match parse_temporary(raw) {
            Some(uuid) => Self::Temporary(uuid),
            None => Self::Confirmed(raw.to_owned()),
        }
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    #[must_use]
    pub fn temporary_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Temporary(uuid) => Some(*uuid),
            Self::Confirmed(_) => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(uuid) => write!(f, "{TEMPORARY_ID_PREFIX}{uuid}"),
            Self::Confirmed(id) => f.write_str(id),
        }
    }
}

/// Parse `tmp-<uuid>` into the uuid.
#[must_use]
pub fn parse_temporary(raw: &str) -> Option<Uuid> {
    raw.strip_prefix(TEMPORARY_ID_PREFIX).and_then(|rest| Uuid::parse_str(rest).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INBOUND" => Some(Self::Inbound),
            "OUTBOUND" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderKind {
    Client,
    Ai,
    Human,
}

impl SenderKind {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CLIENT" => Some(Self::Client),
            "AI" => Some(Self::Ai),
            "HUMAN" => Some(Self::Human),
            _ => None,
        }
    }

    /// Fallback when the payload omits the sender: inbound traffic comes from
    /// the clinic's client, outbound from a staff member.
    #[must_use]
    pub fn default_for(direction: Direction) -> Self {
        match direction {
            Direction::Inbound => Self::Client,
            Direction::Outbound => Self::Human,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "SENT" => Some(Self::Sent),
            "DELIVERED" => Some(Self::Delivered),
            "READ" => Some(Self::Read),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: String,
    pub direction: Direction,
    pub sender_kind: SenderKind,
    pub sender_name: Option<String>,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    /// Temporary id of the optimistic entry this message confirms, when the
    /// server echoes it back.
    pub client_ref: Option<Uuid>,
}

impl Message {
    /// Build the provisional entry inserted when the user submits a draft.
    #[must_use]
    pub fn optimistic(
        temp_id: Uuid,
        conversation_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Temporary(temp_id),
            conversation_id: conversation_id.to_owned(),
            direction: Direction::Outbound,
            sender_kind: SenderKind::Human,
            sender_name: None,
            content: content.to_owned(),
            status: MessageStatus::Pending,
            created_at,
            client_ref: None,
        }
    }

    #[must_use]
    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::Inbound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadTemperature {
    Cold,
    Warm,
    Hot,
}

/// Conversation aggregate as seen by the inbox. `temperature` and `score` are
/// owned by the scoring service and only ever mirrored from server payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub temperature: Option<LeadTemperature>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl Conversation {
    /// Stand-in used until the conversation header has been fetched.
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contact_name: None,
            contact_phone: None,
            unread_count: 0,
            ai_enabled: false,
            temperature: None,
            score: None,
            tags: Vec::new(),
            assigned_to: None,
        }
    }

    /// Merge a partial update received from the push channel.
    pub fn apply_update(&mut self, update: ConversationUpdate) {
        if let Some(name) = update.contact_name {
            self.contact_name = Some(name);
        }
        if let Some(phone) = update.contact_phone {
            self.contact_phone = Some(phone);
        }
        if let Some(unread) = update.unread_count {
            self.unread_count = unread;
        }
        if let Some(ai_enabled) = update.ai_enabled {
            self.ai_enabled = ai_enabled;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(score) = update.score {
            self.score = Some(score);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = Some(assigned_to);
        }
    }
}

/// Partial conversation received from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
    #[serde(default)]
    pub ai_enabled: Option<bool>,
    #[serde(default)]
    pub temperature: Option<LeadTemperature>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Outbound partial update. Scoring fields are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_as_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_enabled: Option<bool>,
}

impl ConversationPatch {
    #[must_use]
    pub fn mark_as_read(message_ids: Vec<String>) -> Self {
        Self { mark_as_read: Some(true), message_ids: Some(message_ids), ai_enabled: None }
    }

    #[must_use]
    pub fn ai_enabled(enabled: bool) -> Self {
        Self { ai_enabled: Some(enabled), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingState {
    Start,
    Stop,
}
