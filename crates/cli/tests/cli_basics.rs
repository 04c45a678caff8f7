// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help, completions and behavior without a running daemon

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use common::{bb, setup_test_env};
use predicates::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = setup_test_env();
    bb(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("asset"))
        .stdout(predicate::str::contains("playlist"))
        .stdout(predicate::str::contains("pause"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn asset_add_help_shows_fields() {
    let temp = setup_test_env();
    bb(temp.path())
        .args(["asset", "add", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--duration"))
        .stdout(predicate::str::contains("--override-duration"))
        .stdout(predicate::str::contains("--integrity"));
}

#[test]
fn completions_need_no_daemon() {
    let temp = setup_test_env();
    bb(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_bb"));
}

#[test]
fn status_without_daemon_suggests_start() {
    let temp = setup_test_env();
    bb(temp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bbd is not running"))
        .stderr(predicate::str::contains("bb daemon start"));
}

#[test]
fn playback_controls_without_daemon_fail() {
    let temp = setup_test_env();
    for args in [vec!["next"], vec!["pause"], vec!["show", "poster"]] {
        bb(temp.path())
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("not running"));
    }
}

#[test]
fn daemon_status_reports_not_running() {
    let temp = setup_test_env();
    bb(temp.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon not running"));
}

#[test]
fn daemon_stop_without_daemon_is_not_an_error() {
    let temp = setup_test_env();
    bb(temp.path())
        .args(["daemon", "stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon not running"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = setup_test_env();
    std::fs::write(
        temp.path().join("billboard.toml"),
        "[cache]\nfetch_workers = 0\n",
    )
    .unwrap();
    bb(temp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch_workers"));
}
