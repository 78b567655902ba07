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

use crate::api::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("API URL not configured")]
    MissingApiUrl,
    #[error("Conversation not found")]
    ConversationNotFound,
    #[error("Authentication rejected")]
    AuthRejected,
}

impl AppError {
    pub const MISSING_API_URL_EXIT_CODE: i32 = 20;
    pub const CONVERSATION_NOT_FOUND_EXIT_CODE: i32 = 21;
    pub const AUTH_REJECTED_EXIT_CODE: i32 = 22;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingApiUrl => Self::MISSING_API_URL_EXIT_CODE,
            Self::ConversationNotFound => Self::CONVERSATION_NOT_FOUND_EXIT_CODE,
            Self::AuthRejected => Self::AUTH_REJECTED_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingApiUrl => {
                "No API URL configured. Pass --api-url or set CLINIC_INBOX_API_URL."
            }
            Self::ConversationNotFound => "The requested conversation does not exist.",
            Self::AuthRejected => {
                "The server rejected the access token. Pass --token or set CLINIC_INBOX_TOKEN."
            }
        }
    }

    /// Map a failure of the initial conversation fetch to a fatal error, if
    /// it is one. Anything else is treated as transient.
    #[must_use]
    pub fn from_startup(err: &ApiError) -> Option<Self> {
        match err.status()? {
            404 => Some(Self::ConversationNotFound),
            401 | 403 => Some(Self::AuthRejected),
            _ => None,
        }
    }
}
