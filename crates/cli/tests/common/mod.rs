// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// Isolated environment: config, state and socket live under a temp dir so
/// no test can reach a real daemon.
pub fn setup_test_env() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let state = temp.path().join("state");
    std::fs::create_dir_all(&state).expect("Failed to create state dir");
    std::fs::write(
        temp.path().join("billboard.toml"),
        format!("[paths]\nstate_dir = {:?}\n", state.display().to_string()),
    )
    .expect("Failed to write config");
    temp
}

/// `bb` command bound to the environment in `dir`
pub fn bb(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bb").expect("bb binary");
    cmd.env("BB_CONFIG", dir.join("billboard.toml"))
        .env("BB_SOCKET_PATH", dir.join("bbd.sock"))
        .env("XDG_STATE_HOME", dir.join("xdg"))
        .env("BB_DAEMON_BINARY", dir.join("no-such-bbd"))
        .env_remove("BB_LOG");
    cmd
}
