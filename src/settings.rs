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

use crate::Cli;
use crate::error::AppError;
use crate::sync::SyncConfig;
use std::time::Duration;

pub const API_URL_ENV: &str = "CLINIC_INBOX_API_URL";
pub const TOKEN_ENV: &str = "CLINIC_INBOX_TOKEN";

/// Runtime settings after CLI flags and environment fallbacks are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub conversation_id: String,
    pub api_url: String,
    pub token: Option<String>,
    pub push: bool,
    pub sync: SyncConfig,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Flags win over the environment; blank values count as unset.
    pub fn resolve<F>(cli: &Cli, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_url = non_blank(cli.api_url.clone())
            .or_else(|| non_blank(env(API_URL_ENV)))
            .ok_or(AppError::MissingApiUrl)?;
        let token = non_blank(cli.token.clone()).or_else(|| non_blank(env(TOKEN_ENV)));

        let mut sync = SyncConfig::default();
        if let Some(ms) = cli.poll_interval_ms {
            sync = sync.with_poll_interval(Duration::from_millis(ms));
        }

        Ok(Self {
            conversation_id: cli.conversation.trim().to_owned(),
            api_url,
            token,
            push: !cli.no_push,
            sync,
        })
    }
}
