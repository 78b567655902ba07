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

use crate::api::model::{
    ConversationUpdate, Direction, Message, MessageId, MessageStatus, SenderKind, TypingState,
    parse_temporary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message as it travels over the wire. Every field is optional so a
/// malformed payload can be decoded, inspected and rejected instead of
/// failing the whole batch it arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub sender_kind: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub client_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedMessage {
    #[error("message payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("message `{id}` has an invalid createdAt `{raw}`")]
    InvalidTimestamp { id: String, raw: String },
    #[error("message `{id}` has an unknown {field} `{value}`")]
    UnknownValue { id: String, field: &'static str, value: String },
    #[error("message `{id}` belongs to conversation `{actual}`, not `{expected}`")]
    ForeignConversation { id: String, expected: String, actual: String },
}

impl WireMessage {
    /// Validate and convert into a domain message for `conversation_id`.
    pub fn into_message(self, conversation_id: &str) -> Result<Message, MalformedMessage> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(MalformedMessage::MissingField("id"))?;

        let raw_created_at =
            self.created_at.ok_or(MalformedMessage::MissingField("createdAt"))?;
        let created_at = DateTime::parse_from_rfc3339(raw_created_at.trim())
            .map(|at| at.with_timezone(&Utc))
            .map_err(|_| MalformedMessage::InvalidTimestamp {
                id: id.clone(),
                raw: raw_created_at.clone(),
            })?;

        if let Some(actual) = self.conversation_id
            && actual != conversation_id
        {
            return Err(MalformedMessage::ForeignConversation {
                id,
                expected: conversation_id.to_owned(),
                actual,
            });
        }

        let raw_direction = self.direction.ok_or(MalformedMessage::MissingField("direction"))?;
        let direction =
            Direction::parse(&raw_direction).ok_or_else(|| MalformedMessage::UnknownValue {
                id: id.clone(),
                field: "direction",
                value: raw_direction.clone(),
            })?;

        let sender_kind = match self.sender_kind {
            Some(raw) => SenderKind::parse(&raw).ok_or_else(|| MalformedMessage::UnknownValue {
                id: id.clone(),
                field: "senderKind",
                value: raw.clone(),
            })?,
            None => SenderKind::default_for(direction),
        };

        let status = match self.status {
            Some(raw) => {
                MessageStatus::parse(&raw).ok_or_else(|| MalformedMessage::UnknownValue {
                    id: id.clone(),
                    field: "status",
                    value: raw.clone(),
                })?
            }
            None => MessageStatus::Sent,
        };

        let content = self.content.ok_or(MalformedMessage::MissingField("content"))?;

        Ok(Message {
            id: MessageId::parse(&id),
            conversation_id: conversation_id.to_owned(),
            direction,
            sender_kind,
            sender_name: self.sender_name,
            content,
            status,
            created_at,
            client_ref: self.client_message_id.as_deref().and_then(parse_temporary),
        })
    }
}

/// Event delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent {
    Message { payload: WireMessage },
    ConversationUpdate { payload: ConversationUpdate },
    Typing { participant: String, state: TypingState },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub client_message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    pub state: TypingState,
}
