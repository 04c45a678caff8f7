// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset repository
//!
//! The catalog sits behind a reader/writer lock: any number of `list` calls
//! proceed together, a mutation excludes them for the duration of its WAL
//! append and apply. Every mutation advances the epoch and wakes the
//! [`ChangeNotifier`].

use crate::notifier::ChangeNotifier;
use bb_core::{Asset, AssetId, Operation, ValidationError};
use bb_storage::{Catalog, Wal, WalError};
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid asset: {0}")]
    Validation(#[from] ValidationError),
    #[error("asset not found: {0}")]
    NotFound(AssetId),
    #[error("storage error: {0}")]
    Storage(#[from] WalError),
}

/// Consistent view of the repository at one epoch
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSnapshot {
    pub epoch: u64,
    /// Sorted by id
    pub assets: Vec<Asset>,
}

struct Inner {
    catalog: Catalog,
    wal: Wal,
    epoch: u64,
}

pub struct AssetRepository {
    inner: RwLock<Inner>,
    notifier: ChangeNotifier,
}

impl AssetRepository {
    /// Open the repository backed by the WAL at `path`, replaying it.
    ///
    /// The epoch resumes at the number of replayed operations.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let ops = Wal::replay(path)?;
        let catalog = Catalog::from_ops(&ops);
        let wal = Wal::open(path)?;
        let epoch = wal.sequence();

        tracing::info!(
            path = %path.display(),
            assets = catalog.len(),
            retired = catalog.retired_count(),
            epoch,
            "repository opened"
        );

        Ok(Self {
            inner: RwLock::new(Inner {
                catalog,
                wal,
                epoch,
            }),
            notifier: ChangeNotifier::new(epoch),
        })
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).epoch
    }

    pub fn list(&self) -> RepoSnapshot {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        RepoSnapshot {
            epoch: inner.epoch,
            assets: inner.catalog.list(),
        }
    }

    pub fn get(&self, id: &AssetId) -> Option<Asset> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.catalog.get(id).cloned()
    }

    /// Create or replace an asset. Returns the new epoch.
    pub fn upsert(&self, asset: Asset) -> Result<u64, RepositoryError> {
        asset.validate()?;

        let epoch = {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            if inner.catalog.is_retired(&asset.id) {
                return Err(ValidationError::RetiredId(asset.id.to_string()).into());
            }
            let op = Operation::AssetUpsert { asset };
            inner.wal.append(&op)?;
            inner.catalog.apply(&op);
            inner.epoch += 1;
            inner.epoch
        };

        self.notifier.notify(epoch);
        Ok(epoch)
    }

    /// Delete an asset and retire its id. Returns the new epoch.
    pub fn remove(&self, id: &AssetId) -> Result<u64, RepositoryError> {
        let epoch = {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            if !inner.catalog.contains(id) {
                return Err(RepositoryError::NotFound(id.clone()));
            }
            let op = Operation::AssetRemove { id: id.clone() };
            inner.wal.append(&op)?;
            inner.catalog.apply(&op);
            inner.epoch += 1;
            inner.epoch
        };

        self.notifier.notify(epoch);
        Ok(epoch)
    }

    pub fn is_retired(&self, id: &AssetId) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.catalog.is_retired(id)
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
