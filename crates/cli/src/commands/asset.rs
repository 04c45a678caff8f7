// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset commands
//!
//! Input is checked locally with the same validation the daemon applies, so
//! malformed records fail before any connection is made.

use crate::client::DaemonPaths;
use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bb_core::{ActiveWindow, Asset, AssetId, Category, Integrity, ValidationError};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::time::Duration;

#[derive(Args)]
pub struct AssetArgs {
    #[command(subcommand)]
    pub command: AssetCommand,
}

#[derive(Subcommand)]
pub enum AssetCommand {
    /// Add an asset
    Add(AddArgs),
    /// Change fields of an existing asset
    Update(UpdateArgs),
    /// Delete an asset; its id cannot be reused
    Remove {
        id: String,
    },
    /// List all assets
    List,
    /// Show one asset
    Show {
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// File path or http(s) URL of the content
    pub uri: String,

    /// Content category: image, video, web, stream
    #[arg(long, short = 'c', value_parser = parse_category)]
    pub category: Category,

    /// Asset id; generated by the daemon when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Display duration, e.g. 10s or 1m30s
    #[arg(long, short = 'd', value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Cut videos off at --duration instead of playing them to the end
    #[arg(long)]
    pub override_duration: bool,

    /// Start of the active window (RFC 3339)
    #[arg(long, value_parser = parse_time)]
    pub start: Option<DateTime<Utc>>,

    /// End of the active window (RFC 3339), exclusive
    #[arg(long, value_parser = parse_time)]
    pub end: Option<DateTime<Utc>>,

    /// Ordering key, ascending
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub order: i64,

    /// Store the asset disabled
    #[arg(long)]
    pub disabled: bool,

    /// Expected content: sha256:<hex> or an ETag
    #[arg(long, value_parser = parse_integrity)]
    pub integrity: Option<Integrity>,

    /// Skip integrity and reachability checks
    #[arg(long)]
    pub trusted: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub uri: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    #[arg(long)]
    pub override_duration: Option<bool>,

    #[arg(long, value_parser = parse_time)]
    pub start: Option<DateTime<Utc>>,

    #[arg(long, value_parser = parse_time)]
    pub end: Option<DateTime<Utc>>,

    /// Remove both window bounds
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub always: bool,

    #[arg(long, allow_hyphen_values = true)]
    pub order: Option<i64>,

    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,
}

pub fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|e: ValidationError| e.to_string())
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 time like 2026-03-01T09:00:00Z: {}", e))
}

fn parse_integrity(s: &str) -> Result<Integrity, String> {
    s.parse().map_err(|e: ValidationError| e.to_string())
}

/// Build the record for `bb asset add`. An empty id is left for the daemon.
pub fn build_asset(args: &AddArgs) -> Result<Asset, ValidationError> {
    let mut asset = Asset::new(args.id.clone().unwrap_or_default(), &args.uri, args.category);
    asset.name = args
        .name
        .clone()
        .or_else(|| args.id.clone())
        .unwrap_or_default();
    asset.duration = args.duration;
    asset.override_duration = args.override_duration;
    asset.window = ActiveWindow::new(args.start, args.end);
    asset.order = args.order;
    asset.enabled = !args.disabled;
    asset.integrity = args.integrity.clone();
    asset.skip_integrity_check = args.trusted;
    check(&asset)?;
    Ok(asset)
}

/// Apply `bb asset update` flags on top of the stored record
pub fn apply_update(mut asset: Asset, args: &UpdateArgs) -> Result<Asset, ValidationError> {
    if let Some(uri) = &args.uri {
        asset.uri = uri.clone();
    }
    if let Some(name) = &args.name {
        asset.name = name.clone();
    }
    if let Some(duration) = args.duration {
        asset.duration = Some(duration);
    }
    if let Some(override_duration) = args.override_duration {
        asset.override_duration = override_duration;
    }
    if args.always {
        asset.window = ActiveWindow::always();
    }
    if args.start.is_some() {
        asset.window.start = args.start;
    }
    if args.end.is_some() {
        asset.window.end = args.end;
    }
    if let Some(order) = args.order {
        asset.order = order;
    }
    if args.enable {
        asset.enabled = true;
    }
    if args.disable {
        asset.enabled = false;
    }
    check(&asset)?;
    Ok(asset)
}

/// Local validation; an id left empty for generation is not an error here
fn check(asset: &Asset) -> Result<(), ValidationError> {
    if asset.id.as_str().is_empty() {
        let mut probe = asset.clone();
        probe.id = AssetId::new("pending");
        probe.validate()
    } else {
        asset.validate()
    }
}

pub async fn handle(command: AssetCommand, paths: &DaemonPaths, format: OutputFormat) -> Result<()> {
    match command {
        AssetCommand::Add(args) => {
            let asset = build_asset(&args)?;
            let client = DaemonClient::connect(paths)?;
            let (epoch, id) = client.upsert_asset(asset).await?;
            println!("Added {} (epoch {})", id, epoch);
        }
        AssetCommand::Update(args) => {
            let client = DaemonClient::connect(paths)?;
            let current = client.get_asset(&AssetId::new(&args.id)).await?;
            let asset = apply_update(current, &args)?;
            let (epoch, id) = client.upsert_asset(asset).await?;
            println!("Updated {} (epoch {})", id, epoch);
        }
        AssetCommand::Remove { id } => {
            let client = DaemonClient::connect(paths)?;
            let epoch = client.remove_asset(&AssetId::new(&id)).await?;
            println!("Removed {} (epoch {})", id, epoch);
        }
        AssetCommand::List => {
            let client = DaemonClient::connect(paths)?;
            let (epoch, assets) = client.list_assets().await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "epoch": epoch,
                    "assets": assets,
                })),
                OutputFormat::Text => print_table(&assets),
            }
        }
        AssetCommand::Show { id } => {
            let client = DaemonClient::connect(paths)?;
            let asset = client.get_asset(&AssetId::new(&id)).await?;
            match format {
                OutputFormat::Json => output::print_json(&asset),
                OutputFormat::Text => print_detail(&asset),
            }
        }
    }
    Ok(())
}

fn print_table(assets: &[Asset]) {
    if assets.is_empty() {
        println!("No assets");
        return;
    }
    println!(
        "{:<16} {:<20} {:<9} {:<9} {:>5} {:<7} WINDOW",
        "ID", "NAME", "CATEGORY", "DURATION", "ORDER", "ENABLED"
    );
    for a in assets {
        println!(
            "{:<16} {:<20} {:<9} {:<9} {:>5} {:<7} {}",
            output::clip(a.id.as_str(), 16),
            output::clip(&a.name, 20),
            a.category.name(),
            output::duration(a.display_duration()),
            a.order,
            if a.enabled { "yes" } else { "no" },
            window(&a.window),
        );
    }
}

fn print_detail(a: &Asset) {
    println!("Asset: {}", a.id);
    println!("  Name: {}", a.name);
    println!("  URI: {}", a.uri);
    println!("  Category: {}", a.category);
    println!("  Duration: {}", output::duration(a.duration));
    if a.override_duration {
        println!("  Override duration: yes");
    }
    println!("  Window: {}", window(&a.window));
    println!("  Order: {}", a.order);
    println!("  Enabled: {}", if a.enabled { "yes" } else { "no" });
    if let Some(integrity) = &a.integrity {
        println!("  Integrity: {}", integrity);
    }
    if a.skip_integrity_check {
        println!("  Trusted: yes");
    }
}

fn window(w: &ActiveWindow) -> String {
    match (w.start, w.end) {
        (None, None) => "always".to_string(),
        (start, end) => format!(
            "{} .. {}",
            start.map(|t| t.to_rfc3339()).unwrap_or_default(),
            end.map(|t| t.to_rfc3339()).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
#[path = "asset_tests.rs"]
mod tests;
