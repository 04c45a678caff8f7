// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset identifier generation

use crate::asset::AssetId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique asset identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> AssetId;
}

/// UUID-based generator for production use
///
/// Uses the hyphen-free form so ids stay within the cache-safe charset.
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> AssetId {
        AssetId::new(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("asset")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> AssetId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        AssetId::new(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
