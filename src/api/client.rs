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

use super::error_handling::{ApiError, summarize_error_body};
use super::model::{Conversation, ConversationPatch, TypingState};
use super::types::{SendMessageRequest, TypingNotice, WireMessage};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Request/response half of the inbox backend.
#[async_trait]
pub trait InboxApi: Send + Sync {
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<Conversation, ApiError>;

    /// Messages in server order. Entries that cannot even be decoded as a
    /// message object are dropped here; field validation happens in the store.
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<WireMessage>, ApiError>;

    /// Returns the raw acknowledgement so a malformed ack can still settle
    /// the optimistic entry.
    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> Result<serde_json::Value, ApiError>;

    async fn patch_conversation(
        &self,
        conversation_id: &str,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError>;

    async fn notify_typing(&self, conversation_id: &str, state: TypingState)
    -> Result<(), ApiError>;
}

/// [`InboxApi`] over the clinic backend's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpInboxApi {
    base_url: reqwest::Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpInboxApi {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("clinic-inbox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url: parse_base_url(base_url)?, token, client })
    }

    fn conversation_url(&self, conversation_id: &str, tail: &[&str]) -> Result<reqwest::Url, ApiError> {
        conversation_endpoint(&self.base_url, conversation_id, tail)
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let body = summarize_error_body(&body);
        tracing::debug!(status = status.as_u16(), "inbox api error: {body}");
        Err(ApiError::Status { status: status.as_u16(), body })
    }

    async fn json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl InboxApi for HttpInboxApi {
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<Conversation, ApiError> {
        let url = self.conversation_url(conversation_id, &[])?;
        self.json(self.request(reqwest::Method::GET, url)).await
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<WireMessage>, ApiError> {
        let url = self.conversation_url(conversation_id, &["messages"])?;
        let items: Vec<serde_json::Value> =
            self.json(self.request(reqwest::Method::GET, url)).await?;
        Ok(decode_message_list(items))
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.conversation_url(conversation_id, &["messages"])?;
        self.json(self.request(reqwest::Method::POST, url).json(request)).await
    }

    async fn patch_conversation(
        &self,
        conversation_id: &str,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError> {
        let url = self.conversation_url(conversation_id, &[])?;
        self.json(self.request(reqwest::Method::PATCH, url).json(patch)).await
    }

    async fn notify_typing(
        &self,
        conversation_id: &str,
        state: TypingState,
    ) -> Result<(), ApiError> {
        let url = self.conversation_url(conversation_id, &["typing"])?;
        self.execute(self.request(reqwest::Method::POST, url).json(&TypingNotice { state }))
            .await
            .map(|_| ())
    }
}

/// Parse the configured backend address. It must be able to carry a path.
pub(crate) fn parse_base_url(raw: &str) -> Result<reqwest::Url, ApiError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", raw.trim())))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(url.to_string()));
    }
    Ok(url)
}

/// `{base}/api/conversations/{id}/{tail..}`. Each segment is percent-encoded,
/// so an id containing `/`, `?` or `#` stays a single segment.
pub(crate) fn conversation_endpoint(
    base: &reqwest::Url,
    conversation_id: &str,
    tail: &[&str],
) -> Result<reqwest::Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["api", "conversations", conversation_id])
        .extend(tail);
    Ok(url)
}

/// Decode each list item on its own so one bad entry does not sink the batch.
pub(crate) fn decode_message_list(items: Vec<serde_json::Value>) -> Vec<WireMessage> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<WireMessage>(item) {
            Ok(wire) => Some(wire),
            Err(err) => {
                tracing::warn!("dropping undecodable message entry: {err}");
                None
            }
        })
        .collect()
}
