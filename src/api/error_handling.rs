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

/// Failure of a call to the inbox HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status { status: status.as_u16(), body: String::new() }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why an outgoing message ended up FAILED. Kept on the entry so the retry
/// affordance can say something useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    Timeout,
    Network,
    Rejected { status: u16 },
    Server { status: u16 },
}

impl SendFailure {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timed out",
            Self::Network => "offline",
            Self::Rejected { .. } => "rejected",
            Self::Server { .. } => "server error",
        }
    }

    /// Client-side rejections (validation, closed WhatsApp window) will fail
    /// again unless the content or conversation changes.
    #[must_use]
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

pub fn classify_send_failure(err: &ApiError) -> SendFailure {
    match err {
        ApiError::Timeout => SendFailure::Timeout,
        ApiError::Network(_) => SendFailure::Network,
        ApiError::Status { status, .. } if (400..500).contains(status) && *status != 408 => {
            SendFailure::Rejected { status: *status }
        }
        ApiError::Status { status: 408, .. } => SendFailure::Timeout,
        ApiError::Status { status, .. } => SendFailure::Server { status: *status },
        // A response we could not decode still means the server answered.
        ApiError::Decode(_) => SendFailure::Server { status: 200 },
        ApiError::InvalidUrl(_) => SendFailure::Rejected { status: 0 },
    }
}

/// Short, single-line description of an error body for logs.
pub fn summarize_error_body(body: &str) -> String {
    if let Some(msg) = extract_json_string_field(body, "error") {
        return truncate_for_log(&msg);
    }
    if let Some(msg) = extract_json_string_field(body, "message") {
        return truncate_for_log(&msg);
    }
    let fallback = body.lines().find(|line| !line.trim().is_empty()).unwrap_or(body);
    truncate_for_log(fallback.trim())
}

fn truncate_for_log(input: &str) -> String {
    const LIMIT: usize = 240;
    let mut out = String::new();
    for (i, ch) in input.chars().enumerate() {
        if i >= LIMIT {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out.replace('\n', "\\n")
}

fn extract_json_string_field(input: &str, field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(input).ok()?;
    value.get(field)?.as_str().map(str::to_owned)
}
