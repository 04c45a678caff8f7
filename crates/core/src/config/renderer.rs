// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderer command templates

use crate::asset::Category;
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the playback target in command templates
pub const URI_PLACEHOLDER: &str = "{uri}";

/// Per-category argv templates for the process renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub image: Vec<String>,
    pub web: Vec<String>,
    pub video: Vec<String>,
    pub stream: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for RendererConfig {
    fn default() -> Self {
        let browser = argv(&["chromium", "--kiosk", "--noerrdialogs", "--incognito", "{uri}"]);
        let player = argv(&["mpv", "--fs", "--really-quiet", "--no-terminal", "{uri}"]);
        Self {
            image: browser.clone(),
            web: browser,
            video: player.clone(),
            stream: player,
        }
    }
}

impl RendererConfig {
    pub fn template(&self, category: Category) -> &[String] {
        match category {
            Category::Image => &self.image,
            Category::WebPage => &self.web,
            Category::Video => &self.video,
            Category::Stream => &self.stream,
        }
    }

    /// Expand the template for `category` into a program and its arguments
    pub fn command(&self, category: Category, uri: &str) -> Option<(String, Vec<String>)> {
        let mut parts = self
            .template(category)
            .iter()
            .map(|part| part.replace(URI_PLACEHOLDER, uri));
        let program = parts.next()?;
        Some((program, parts.collect()))
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for category in [
            Category::Image,
            Category::WebPage,
            Category::Video,
            Category::Stream,
        ] {
            let template = self.template(category);
            if template.is_empty() {
                return Err(format!("renderer.{} must not be empty", key(category)));
            }
            if !template.iter().any(|part| part.contains(URI_PLACEHOLDER)) {
                return Err(format!(
                    "renderer.{} must contain {}",
                    key(category),
                    URI_PLACEHOLDER
                ));
            }
        }
        Ok(())
    }
}

fn key(category: Category) -> &'static str {
    match category {
        Category::Image => "image",
        Category::WebPage => "web",
        Category::Video => "video",
        Category::Stream => "stream",
    }
}
