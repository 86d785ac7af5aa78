//! Usage: Command line entry (`serve` by default, `playlist <ID>` for the app-only token demo).

use crate::app::logging;
use crate::gateway;
use crate::gateway::oauth::client_credentials::lookup_playlist;
use crate::settings::{self, AppSettings};
use crate::shared::error::AppResult;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "spotify-auth", version, about = "Spotify OAuth2 login and token refresh server")]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Fetch an app-only token and print one playlist summary as JSON.
    Playlist {
        /// Spotify playlist id, e.g. 3cEYpjA9oz9GiPac4AsH4n
        playlist_id: String,
    },
}

impl Cli {
    pub(crate) fn selected_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

pub(crate) fn run() -> ExitCode {
    let cli = Cli::parse();

    let settings = settings::load();
    let log_dir = settings.as_ref().ok().and_then(|s| s.log_dir.clone());
    let _log_guard = match logging::init(log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{err}");
            None
        }
    };

    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "failed to load settings");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(settings = ?settings, "settings loaded");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli.selected_command(), settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, settings: AppSettings) -> AppResult<()> {
    match command {
        Command::Serve => gateway::serve(settings).await,
        Command::Playlist { playlist_id } => {
            let summary = lookup_playlist(&settings, &playlist_id).await?;
            let rendered = serde_json::to_string_pretty(&summary)
                .map_err(|e| format!("SYSTEM_ERROR: failed to serialize json: {e}"))?;
            println!("{rendered}");
            Ok(())
        }
    }
}
