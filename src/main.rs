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

use clap::Parser;
use clinic_inbox::Cli;
use clinic_inbox::api::{HttpInboxApi, InboxApi, PushChannel, SsePushChannel};
use clinic_inbox::app::App;
use clinic_inbox::error::AppError;
use clinic_inbox::settings::Settings;
use clinic_inbox::sync::ConversationView;
use std::fs::OpenOptions;
use std::sync::Arc;

#[allow(clippy::exit)]
fn main() {
    if let Err(err) = run() {
        if let Some(app_error) = extract_app_error(&err) {
            eprintln!("{}", app_error.user_message());
            std::process::exit(app_error.exit_code());
        }
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    let settings = Settings::from_cli(&cli).map_err(anyhow::Error::new)?;

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(async move {
        let api: Arc<dyn InboxApi> = Arc::new(HttpInboxApi::new(
            &settings.api_url,
            settings.token.clone(),
            settings.sync.request_timeout,
        )?);
        let push = if settings.push {
            Some(SsePushChannel::new(&settings.api_url, settings.token.clone())?)
        } else {
            tracing::info!("push disabled, polling only");
            None
        };

        let (view, event_rx) = ConversationView::open(
            &settings.conversation_id,
            api,
            push.as_ref().map(|channel| channel as &dyn PushChannel),
            settings.sync,
        );
        let mut app = App::new(view, event_rx);
        let result = clinic_inbox::app::run_tui(&mut app).await;

        let exit_error = app.exit_error.take();
        let cancelled = app.close();
        tracing::info!(cancelled, "conversation closed");

        if let Some(app_error) = exit_error {
            return Err(anyhow::Error::new(app_error));
        }
        result
    })
}

fn extract_app_error(err: &anyhow::Error) -> Option<AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>().cloned())
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    // Stdout belongs to the TUI, so diagnostics only ever go to a file.
    let Some(path) = cli.log_file.as_ref() else {
        if std::env::var_os("RUST_LOG").is_some() {
            eprintln!("RUST_LOG is set, but tracing stays off until --log-file <PATH> is given.");
        }
        return Ok(());
    };

    let directives = cli
        .log_filter
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_owned());
    let filter = tracing_subscriber::EnvFilter::try_new(directives.as_str())
        .map_err(|e| anyhow::anyhow!("invalid tracing filter `{directives}`: {e}"))?;

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if cli.log_append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {e}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    tracing::info!(
        target: "diagnostics",
        version = env!("CARGO_PKG_VERSION"),
        conversation = %cli.conversation,
        log_file = %path.display(),
        log_filter = %directives,
        "tracing enabled"
    );
    Ok(())
}
