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

pub mod api;
pub mod app;
pub mod error;
pub mod settings;
pub mod sync;
pub mod ui;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "clinic-inbox", version, about = "Terminal inbox for one clinic conversation")]
pub struct Cli {
    /// Conversation to open
    pub conversation: String,

    /// Base URL of the clinic API (falls back to CLINIC_INBOX_API_URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Bearer token for the clinic API (falls back to CLINIC_INBOX_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Polling fallback period in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Never open the push stream; rely on polling only
    #[arg(long)]
    pub no_push: bool,

    /// Write tracing diagnostics to a file (disabled unless explicitly set)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<std::path::PathBuf>,

    /// Tracing filter directives (example: `info,clinic_inbox::sync=debug`)
    /// Falls back to `RUST_LOG` when omitted.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Append to `--log-file` instead of truncating on startup
    #[arg(long)]
    pub log_append: bool,
}
