// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playback control commands

use crate::client::{DaemonClient, DaemonPaths};
use anyhow::Result;
use bb_daemon::Control;

pub async fn handle(control: Control, paths: &DaemonPaths) -> Result<()> {
    let client = DaemonClient::connect(paths)?;
    let message = match &control {
        Control::Next => "Skipping to the next asset".to_string(),
        Control::Previous => "Returning to the previous asset".to_string(),
        Control::Show { id } => format!("Showing {} next", id),
        Control::Pause => "Playback paused".to_string(),
        Control::Resume => "Playback resumed".to_string(),
    };
    client.control(control).await?;
    println!("{}", message);
    Ok(())
}
