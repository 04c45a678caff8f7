// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use crate::client::{daemon_start, daemon_stop, read_daemon_pid, DaemonClient, DaemonPaths};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start bbd in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Report whether the daemon is running
    Status,
}

pub async fn handle(args: DaemonArgs, paths: &DaemonPaths) -> Result<()> {
    match args.command {
        DaemonCommand::Start => {
            if daemon_start(paths).await? {
                println!("Daemon started");
            } else {
                println!("Daemon already running");
            }
        }
        DaemonCommand::Stop => {
            if daemon_stop(paths).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }
        DaemonCommand::Status => status(paths).await?,
    }
    Ok(())
}

async fn status(paths: &DaemonPaths) -> Result<()> {
    let client = match DaemonClient::connect(paths) {
        Ok(client) => client,
        Err(_) => {
            println!("Daemon not running");
            return Ok(());
        }
    };
    let Ok(protocol) = client.hello().await else {
        println!("Daemon not running");
        return Ok(());
    };
    let status = client.status().await?;

    println!("Daemon running");
    if let Some(pid) = read_daemon_pid(paths) {
        println!("  PID: {}", pid);
    }
    if let Ok(version) = std::fs::read_to_string(paths.version_path()) {
        println!("  Version: {}", version.trim());
    }
    println!("  Protocol: {}", protocol);
    println!("  Socket: {}", paths.socket_path.display());
    println!("  Uptime: {}s", status.uptime_secs);
    Ok(())
}
