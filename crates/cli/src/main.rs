// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb - billboard player control CLI

mod client;
mod commands;
mod completions;
mod error;
mod output;

use anyhow::Result;
use bb_daemon::Control;
use clap::{Parser, Subcommand};
use commands::{asset, daemon, playback, status};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::client::DaemonPaths;
use crate::error::UserError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "bb",
    version,
    about = "billboard - schedule and supervise signage playback"
)]
struct Cli {
    /// Player config file (defaults to BB_CONFIG or the XDG config dir)
    #[arg(long, short = 'C', global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the asset repository
    Asset(asset::AssetArgs),
    /// Show the current playlist
    Playlist,
    /// Show playback and health status
    Status,
    /// Skip to the next asset
    Next,
    /// Return to the previously shown asset
    Previous,
    /// Play an asset next, out of order
    Show {
        /// Asset id
        id: String,
    },
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", UserError::explain(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Needs neither config nor daemon
    let command = match cli.command {
        Commands::Completions(args) => {
            completions::generate_completions::<Cli>(args.shell);
            return Ok(());
        }
        other => other,
    };

    let paths = DaemonPaths::resolve(cli.config.as_deref())?;
    let format = OutputFormat::from_flag(cli.json);

    match command {
        Commands::Asset(args) => asset::handle(args.command, &paths, format).await,
        Commands::Playlist => status::playlist(&paths, format).await,
        Commands::Status => status::status(&paths, format).await,
        Commands::Next => playback::handle(Control::Next, &paths).await,
        Commands::Previous => playback::handle(Control::Previous, &paths).await,
        Commands::Show { id } => playback::handle(Control::Show { id: id.into() }, &paths).await,
        Commands::Pause => playback::handle(Control::Pause, &paths).await,
        Commands::Resume => playback::handle(Control::Resume, &paths).await,
        Commands::Daemon(args) => daemon::handle(args, &paths).await,
        Commands::Completions(_) => Ok(()),
    }
}

/// Diagnostics go to stderr, filtered by `BB_LOG` (off by default)
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("BB_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
