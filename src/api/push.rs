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

//! Push delivery over server-sent events.
//!
//! The channel owns reconnection. The sync core only ever sees connectivity
//! flips and decoded events through the [`PushSink`] it handed over.

use super::client::{conversation_endpoint, parse_base_url};
use super::error_handling::{ApiError, summarize_error_body};
use super::types::PushEvent;
use crate::sync::PushSink;
use std::time::Duration;
use tokio::task::AbortHandle;

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub trait PushChannel: Send + Sync {
    /// Start delivering events for `conversation_id` into `sink` until the
    /// returned subscription is cancelled or dropped.
    fn subscribe(&self, conversation_id: &str, sink: PushSink) -> Subscription;
}

/// Live push subscription. Dropping it stops delivery.
#[must_use = "dropping a subscription unsubscribes immediately"]
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<AbortHandle>,
}

impl Subscription {
    pub fn new(task: AbortHandle) -> Self {
        Self { task: Some(task) }
    }

    /// A subscription with nothing behind it (tests, manual channels).
    pub fn inert() -> Self {
        Self::default()
    }

    /// Stop delivery. Returns `true` if the stream task was still running.
    pub fn cancel(mut self) -> bool {
        self.abort()
    }

    fn abort(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                let running = !task.is_finished();
                task.abort();
                running
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// [`PushChannel`] reading `GET /api/conversations/{id}/events`.
#[derive(Debug, Clone)]
pub struct SsePushChannel {
    base_url: reqwest::Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl SsePushChannel {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        // No overall timeout: the stream is meant to stay open.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("clinic-inbox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url: parse_base_url(base_url)?, token, client })
    }
}

impl PushChannel for SsePushChannel {
    fn subscribe(&self, conversation_id: &str, sink: PushSink) -> Subscription {
        let url = match conversation_endpoint(&self.base_url, conversation_id, &["events"]) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!("push stream not started: {err}");
                return Subscription::inert();
            }
        };
        let channel = self.clone();
        let task = tokio::spawn(async move { channel.run(url, sink).await });
        Subscription::new(task.abort_handle())
    }
}

impl SsePushChannel {
    async fn run(self, url: reqwest::Url, sink: PushSink) {
        let mut backoff = Backoff::new(RECONNECT_BASE, RECONNECT_MAX);
        loop {
            match self.stream_once(&url, &sink, &mut backoff).await {
                Ok(()) => tracing::info!("push stream ended"),
                Err(err) => tracing::warn!("push stream failed: {err}"),
            }
            if !sink.connectivity(false) {
                break;
            }
            let delay = backoff.next_delay();
            tracing::debug!(delay_ms = delay.as_millis(), "reconnecting push stream");
            tokio::time::sleep(delay).await;
            if sink.is_closed() {
                break;
            }
        }
    }

    async fn stream_once(
        &self,
        url: &reqwest::Url,
        sink: &PushSink,
        backoff: &mut Backoff,
    ) -> Result<(), ApiError> {
        let mut request =
            self.client.get(url.clone()).header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body: summarize_error_body(&body) });
        }

        backoff.reset();
        if !sink.connectivity(true) {
            return Ok(());
        }

        let mut decoder = SseDecoder::new();
        while let Some(chunk) = response.chunk().await? {
            for payload in decoder.push(&chunk) {
                if !forward(sink, &payload) {
                    return Ok(());
                }
            }
        }
        for payload in decoder.finish() {
            forward(sink, &payload);
        }
        Ok(())
    }
}

/// Decode one `data:` payload and hand it to the view. Returns `false` once
/// the view is gone.
fn forward(sink: &PushSink, payload: &str) -> bool {
    match serde_json::from_str::<PushEvent>(payload) {
        Ok(event) => sink.event(event),
        Err(err) => {
            tracing::warn!("dropping malformed push event: {err}");
            !sink.is_closed()
        }
    }
}

/// Incremental `text/event-stream` decoder yielding one payload per event.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across chunks survive. Multiple `data:` lines of one
/// event are joined with `\n`; comments and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            self.line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush a final event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest).into_owned();
            self.line(rest.trim_end_matches('\r'), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}

/// Capped exponential reconnect delay.
#[derive(Debug)]
struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self { base, max, attempt: 0 }
    }

    fn next_delay(&mut self) -> Duration {
        let factor = 1_u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}
