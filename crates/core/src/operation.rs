// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log

use crate::asset::{Asset, AssetId};
use serde::{Deserialize, Serialize};

/// Repository mutations persisted to the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create or replace an asset record
    AssetUpsert { asset: Asset },

    /// Delete an asset and retire its id
    AssetRemove { id: AssetId },
}

impl Operation {
    /// Id of the asset the operation touches
    pub fn asset_id(&self) -> &AssetId {
        match self {
            Operation::AssetUpsert { asset } => &asset.id,
            Operation::AssetRemove { id } => id,
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
