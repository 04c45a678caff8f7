// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bb status` and `bb playlist`

use crate::client::{DaemonClient, DaemonPaths};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bb_core::{HealthSnapshot, Playlist, SessionSnapshot};
use bb_daemon::{FailureRecord, StatusSummary};
use serde::Serialize;
use std::fmt;

/// Everything `bb status` shows
#[derive(Serialize)]
pub struct StatusReport {
    pub status: StatusSummary,
    pub session: Option<SessionSnapshot>,
    pub health: HealthSnapshot,
    pub failures: Vec<FailureRecord>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.status;
        writeln!(f, "Uptime: {}s", s.uptime_secs)?;
        writeln!(f, "Repository epoch: {}", s.repo_epoch)?;
        writeln!(
            f,
            "Playlist: epoch {}, {} {}",
            s.playlist_epoch,
            s.playlist_entries,
            if s.placeholder {
                "(placeholder)"
            } else {
                "entries"
            }
        )?;
        match &self.session {
            Some(session) => writeln!(
                f,
                "Now: {} [{}] {}",
                session.asset_id, session.category, session.state
            )?,
            None if s.paused => writeln!(f, "Now: paused")?,
            None => writeln!(f, "Now: idle")?,
        }
        if let Some(end) = self.session.as_ref().and_then(|s| s.expected_end) {
            writeln!(f, "  until {}", end.to_rfc3339())?;
        }

        let h = &self.health;
        writeln!(
            f,
            "Health: {}{}",
            if h.degraded { "degraded" } else { "ok" },
            h.last_heartbeat_ms
                .map(|ms| format!(", last heartbeat {}ms ago", ms))
                .unwrap_or_default()
        )?;
        writeln!(
            f,
            "  restarts {}, backoff {}ms, fetch errors {}/{}",
            h.restarts, h.backoff_ms, h.fetch_errors, h.fetch_attempts
        )?;
        if let Some(err) = &h.last_error {
            writeln!(f, "  last error: {}", err)?;
        }

        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for r in &self.failures {
                writeln!(
                    f,
                    "  {:<16} {}{}",
                    output::clip(r.asset_id.as_str(), 16),
                    r.failures,
                    if r.excluded { " (excluded)" } else { "" }
                )?;
            }
        }
        Ok(())
    }
}

pub async fn status(paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::connect(paths)?;
    let report = StatusReport {
        status: client.status().await?,
        session: client.session().await?,
        health: client.health().await?,
        failures: client.failures().await?,
    };
    output::print(&report, format);
    Ok(())
}

pub async fn playlist(paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::connect(paths)?;
    let playlist = client.playlist().await?;
    match format {
        OutputFormat::Json => output::print_json(&playlist),
        OutputFormat::Text => print_playlist(&playlist),
    }
    Ok(())
}

fn print_playlist(playlist: &Playlist) {
    println!(
        "Playlist epoch {} (repository epoch {}), computed {}",
        playlist.epoch,
        playlist.repo_epoch,
        playlist.computed_at.to_rfc3339()
    );
    if let Some(placeholder) = &playlist.placeholder {
        println!("  nothing eligible; showing {}", placeholder.uri);
    } else {
        for (i, id) in playlist.entries.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, id);
        }
    }
    if let Some(next) = playlist.next_boundary {
        println!("Next window change: {}", next.to_rfc3339());
    }
}
