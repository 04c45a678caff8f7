// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! billboard daemon protocol, shared with the `bb` client

pub mod protocol;

pub use bb_engine::{CacheEntry, Control, FailureRecord};
pub use protocol::{Query, Request, Response, StatusSummary, PROTOCOL_VERSION};

/// Written to the log before anything else on each start.
/// Full format: "--- bbd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- bbd: starting (pid: ";
