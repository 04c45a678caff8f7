// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod asset;
pub mod daemon;
pub mod playback;
pub mod status;
