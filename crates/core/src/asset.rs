// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset records
//!
//! An asset is the unit of schedulable content. Records are validated at the
//! repository boundary; anything that reaches the scheduler is well formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Longest accepted asset identifier
pub const MAX_ID_LEN: usize = 64;

/// Identifier of the synthetic no-content asset. Contains a character that
/// user ids may not, so it never collides with a real record.
pub const PLACEHOLDER_ID: &str = "@placeholder";

/// Stable, unique identifier of an asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_ID
    }

    /// Ids double as cache file names, so only `[A-Za-z0-9._-]` is allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let id = self.0.as_str();
        let charset_ok = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if id.is_empty() || id.len() > MAX_ID_LEN || !charset_ok || id.starts_with('.') {
            return Err(ValidationError::InvalidId(id.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Content category, which decides how the renderer presents an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Image,
    Video,
    WebPage,
    Stream,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::WebPage => "web-page",
            Category::Stream => "stream",
        }
    }

    /// Content with no natural end needs an explicit display duration.
    /// Live streams never end on their own either.
    pub fn requires_duration(self) -> bool {
        !self.is_self_terminating()
    }

    /// Video ends by itself; the renderer reports `finished`.
    pub fn is_self_terminating(self) -> bool {
        matches!(self, Category::Video)
    }

    /// Whether the content is downloaded into the local cache before display.
    /// Web pages and streams are played straight from their URI.
    pub fn is_materialized(self) -> bool {
        matches!(self, Category::Image | Category::Video)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Category::Image),
            "video" => Ok(Category::Video),
            "web" | "webpage" | "web-page" => Ok(Category::WebPage),
            "stream" | "streaming" => Ok(Category::Stream),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}

/// Time range during which an asset is eligible.
///
/// Inclusive of `start`, exclusive of `end`. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl ActiveWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn always() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }

    /// Earliest bound strictly after `at`, where eligibility may flip
    pub fn next_boundary_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        [self.start, self.end]
            .into_iter()
            .flatten()
            .filter(|b| *b > at)
            .min()
    }

    fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Expected identity of remote content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Integrity {
    /// Hex SHA-256 of the content
    Sha256(String),
    /// Remote validator reported by the origin
    ETag(String),
}

impl Integrity {
    fn validate(&self) -> Result<(), String> {
        match self {
            Integrity::Sha256(hex) => {
                if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(())
                } else {
                    Err(format!("sha256 digest must be 64 hex chars, got {:?}", hex))
                }
            }
            Integrity::ETag(tag) if tag.trim().is_empty() => Err("empty etag".to_string()),
            Integrity::ETag(_) => Ok(()),
        }
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integrity::Sha256(hex) => write!(f, "sha256:{}", hex),
            Integrity::ETag(tag) => write!(f, "{}", tag),
        }
    }
}

impl FromStr for Integrity {
    type Err = ValidationError;

    /// `sha256:<hex>` is a digest; anything else is taken as an ETag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let integrity = match s.strip_prefix("sha256:") {
            Some(hex) => Integrity::Sha256(hex.to_ascii_lowercase()),
            None => Integrity::ETag(s.to_string()),
        };
        integrity
            .validate()
            .map_err(|reason| ValidationError::InvalidIntegrity {
                id: String::new(),
                reason,
            })?;
        Ok(integrity)
    }
}

/// Where content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Remote(String),
    Local(PathBuf),
}

/// What the renderer is pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PlaybackTarget {
    File(PathBuf),
    Url(String),
}

impl PlaybackTarget {
    pub fn as_uri(&self) -> String {
        match self {
            PlaybackTarget::File(path) => path.display().to_string(),
            PlaybackTarget::Url(url) => url.clone(),
        }
    }
}

impl fmt::Display for PlaybackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_uri())
    }
}

fn default_enabled() -> bool {
    true
}

/// A schedulable unit of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    #[serde(default)]
    pub name: String,
    pub uri: String,
    pub category: Category,
    /// Required for static content; for video only honoured with `override_duration`
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub override_duration: bool,
    #[serde(default)]
    pub window: ActiveWindow,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Explicit ordering key, ascending
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<Integrity>,
    /// Trusted by convention (e.g. live streams); no integrity or reachability check
    #[serde(default)]
    pub skip_integrity_check: bool,
}

impl Asset {
    pub fn new(id: impl Into<AssetId>, uri: impl Into<String>, category: Category) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            uri: uri.into(),
            category,
            duration: None,
            override_duration: false,
            window: ActiveWindow::always(),
            enabled: true,
            order: 0,
            integrity: None,
            skip_integrity_check: false,
        }
    }

    /// The synthetic no-content asset shown when nothing is eligible
    pub fn placeholder(uri: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: "no content".to_string(),
            skip_integrity_check: true,
            ..Self::new(AssetId::placeholder(), uri, Category::Image).with_duration(duration)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_integrity(mut self, integrity: Integrity) -> Self {
        self.integrity = Some(integrity);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn trusted(mut self) -> Self {
        self.skip_integrity_check = true;
        self
    }

    /// Reject records that must never enter the repository
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.id.validate()?;
        let id = self.id.0.clone();

        if self.uri.trim().is_empty() {
            return Err(ValidationError::EmptyUri { id });
        }

        let needs_duration = self.category.requires_duration()
            || (self.override_duration && self.category.is_self_terminating());
        if needs_duration {
            match self.duration {
                None => {
                    return Err(ValidationError::MissingDuration {
                        id,
                        category: self.category,
                    })
                }
                Some(d) if d.is_zero() => return Err(ValidationError::ZeroDuration { id }),
                Some(_) => {}
            }
        }

        if self.window.is_inverted() {
            return Err(ValidationError::InvertedWindow { id });
        }

        if let Some(integrity) = &self.integrity {
            integrity
                .validate()
                .map_err(|reason| ValidationError::InvalidIntegrity { id, reason })?;
        }

        Ok(())
    }

    /// How long the asset is displayed; `None` means play until the renderer
    /// reports completion
    pub fn display_duration(&self) -> Option<Duration> {
        if self.category.is_self_terminating() && !self.override_duration {
            None
        } else {
            self.duration
        }
    }

    pub fn is_eligible(&self, at: DateTime<Utc>) -> bool {
        self.enabled && self.window.contains(at)
    }

    pub fn source(&self) -> AssetSource {
        let uri = self.uri.trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            AssetSource::Remote(uri.to_string())
        } else {
            AssetSource::Local(PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri)))
        }
    }
}

/// Malformed records rejected at the repository boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid asset id {0:?}: use 1-64 chars of [A-Za-z0-9._-]")]
    InvalidId(String),
    #[error("asset {id}: empty uri")]
    EmptyUri { id: String },
    #[error("asset {id}: {category} content requires a duration")]
    MissingDuration { id: String, category: Category },
    #[error("asset {id}: duration must be greater than zero")]
    ZeroDuration { id: String },
    #[error("asset {id}: active window starts after it ends")]
    InvertedWindow { id: String },
    #[error("asset {id}: invalid integrity token: {reason}")]
    InvalidIntegrity { id: String, reason: String },
    #[error("unknown content category: {0}")]
    UnknownCategory(String),
    #[error("asset id {0} was deleted and cannot be reused")]
    RetiredId(String),
}

#[cfg(test)]
#[path = "asset_tests.rs"]
mod tests;
