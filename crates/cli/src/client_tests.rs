// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::*;
use std::fs;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

fn paths(dir: &TempDir) -> DaemonPaths {
    DaemonPaths {
        config_path: None,
        socket_path: dir.path().join("bbd.sock"),
        state_dir: dir.path().join("state"),
    }
}

/// Answer one request per connection from `replies`, recording what arrived
fn fake_daemon(paths: &DaemonPaths, replies: Vec<Response>) -> JoinHandle<Vec<Request>> {
    let listener = UnixListener::bind(&paths.socket_path).unwrap();
    tokio::spawn(async move {
        let mut seen = Vec::new();
        for reply in replies {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let bytes = protocol::read_message(&mut reader).await.unwrap();
            seen.push(protocol::decode(&bytes).unwrap());
            let data = protocol::encode(&reply).unwrap();
            protocol::write_message(&mut writer, &data).await.unwrap();
        }
        seen
    })
}

/// Verify that connect() does not delete state files when daemon is not running.
#[test]
fn connect_does_not_delete_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    fs::create_dir_all(&paths.state_dir).unwrap();
    fs::write(paths.pid_path(), "12345\n").unwrap();

    let result = DaemonClient::connect(&paths);

    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    assert!(paths.pid_path().exists(), "connect() must not delete pid file");
}

#[test]
fn paths_follow_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("billboard.toml");
    fs::write(
        &config,
        format!(
            "[paths]\nstate_dir = \"{}\"\nsocket_path = \"{}\"\n",
            dir.path().join("state").display(),
            dir.path().join("bbd.sock").display()
        ),
    )
    .unwrap();

    let paths = DaemonPaths::resolve(Some(&config)).unwrap();

    assert_eq!(paths.state_dir, dir.path().join("state"));
    assert_eq!(paths.pid_path(), dir.path().join("state/bbd.pid"));
    assert_eq!(paths.config_path.as_deref(), Some(config.as_path()));
}

#[test]
fn startup_error_is_read_from_the_last_attempt() {
    let log = format!(
        "{p}1) ---\n2026-03-01 ERROR bbd: old failure\n{p}2) ---\n\
         ERROR Failed to start daemon: Failed to acquire lock: daemon already running?\n",
        p = STARTUP_MARKER_PREFIX
    );

    let err = parse_startup_error(&log).unwrap();

    assert!(err.contains("daemon already running"), "{}", err);
    assert!(!err.contains("old failure"));
}

#[test]
fn clean_startup_has_no_error() {
    let log = format!("{}7) ---\nINFO Daemon ready\n", STARTUP_MARKER_PREFIX);
    assert_eq!(parse_startup_error(&log), None);
}

#[tokio::test]
async fn list_assets_returns_epoch_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    let asset = Asset::new(
        "promo",
        "https://cdn.example.com/promo.png",
        bb_core::Category::Image,
    )
    .with_duration(Duration::from_secs(10));
    let server = fake_daemon(
        &paths,
        vec![Response::Assets {
            epoch: 4,
            assets: vec![asset.clone()],
        }],
    );

    let client = DaemonClient::connect(&paths).unwrap();
    let (epoch, assets) = client.list_assets().await.unwrap();

    assert_eq!(epoch, 4);
    assert_eq!(assets, vec![asset]);
    assert_eq!(
        server.await.unwrap(),
        vec![Request::Query {
            query: Query::ListAssets
        }]
    );
}

#[tokio::test]
async fn daemon_errors_surface_as_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    let _server = fake_daemon(
        &paths,
        vec![Response::Error {
            message: "asset not found: ghost".to_string(),
        }],
    );

    let client = DaemonClient::connect(&paths).unwrap();
    let err = client
        .control(Control::Show {
            id: AssetId::new("ghost"),
        })
        .await
        .unwrap_err();

    match err {
        ClientError::Rejected(message) => assert_eq!(message, "asset not found: ghost"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    let _server = fake_daemon(&paths, vec![Response::Pong]);

    let client = DaemonClient::connect(&paths).unwrap();
    let err = client.status().await.unwrap_err();

    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[tokio::test]
async fn stale_socket_is_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    // bound then dropped: the file stays but nobody listens
    drop(UnixListener::bind(&paths.socket_path).unwrap());

    let client = DaemonClient::connect(&paths).unwrap();
    let err = client.ping().await.unwrap_err();

    assert!(matches!(err, ClientError::DaemonNotRunning));
}

#[tokio::test]
async fn stop_without_daemon_reports_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(&dir);
    assert!(!daemon_stop(&paths).await.unwrap());
}
