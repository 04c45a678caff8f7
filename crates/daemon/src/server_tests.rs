// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lifecycle::{startup, DaemonConfig};
use bb_core::{Asset, AssetId, Category, Config};
use bb_engine::Control;
use std::time::Duration;
use tempfile::TempDir;

async fn daemon(dir: &TempDir) -> DaemonState {
    let mut config = Config::default();
    config.paths.state_dir = Some(dir.path().join("state"));
    config.paths.socket_path = Some(dir.path().join("bbd.sock"));
    startup(&DaemonConfig::from_config(config).unwrap())
        .await
        .unwrap()
}

fn promo() -> Asset {
    Asset::new("promo", "https://cdn.example.com/promo.png", Category::Image)
        .with_name("Spring promo")
        .with_duration(Duration::from_secs(15))
}

#[tokio::test]
async fn ping_and_hello() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    assert_eq!(handle_request(&mut daemon, Request::Ping).await, Response::Pong);
    assert_eq!(
        handle_request(
            &mut daemon,
            Request::Hello {
                version: "0.0.0".to_string()
            }
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn upsert_then_query_asset() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    let response = handle_request(
        &mut daemon,
        Request::UpsertAsset {
            asset: Box::new(promo()),
        },
    )
    .await;
    assert_eq!(
        response,
        Response::Mutated {
            epoch: 1,
            id: AssetId::new("promo")
        }
    );

    match handle_request(
        &mut daemon,
        Request::Query {
            query: Query::ListAssets,
        },
    )
    .await
    {
        Response::Assets { epoch, assets } => {
            assert_eq!(epoch, 1);
            assert_eq!(assets, vec![promo()]);
        }
        other => panic!("unexpected response {:?}", other),
    }
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn upsert_without_id_generates_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;
    let mut asset = promo();
    asset.id = AssetId::new("");

    match handle_request(
        &mut daemon,
        Request::UpsertAsset {
            asset: Box::new(asset),
        },
    )
    .await
    {
        Response::Mutated { id, .. } => assert!(!id.as_str().is_empty()),
        other => panic!("unexpected response {:?}", other),
    }
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_asset_is_an_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;
    let stream = Asset::new("live", "https://cdn.example.com/live", Category::Stream);

    let response = handle_request(
        &mut daemon,
        Request::UpsertAsset {
            asset: Box::new(stream),
        },
    )
    .await;

    assert!(matches!(response, Response::Error { .. }));
    assert_eq!(daemon.runtime.repo_epoch(), 0);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn removing_unknown_asset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    let response = handle_request(
        &mut daemon,
        Request::RemoveAsset {
            id: AssetId::new("ghost"),
        },
    )
    .await;

    match response {
        Response::Error { message } => assert!(message.contains("ghost"), "{}", message),
        other => panic!("unexpected response {:?}", other),
    }
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn show_unknown_asset_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    let response = handle_request(
        &mut daemon,
        Request::Control {
            control: Control::Show {
                id: AssetId::new("ghost"),
            },
        },
    )
    .await;

    assert!(matches!(response, Response::Error { .. }));
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn status_before_playback_reports_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    match handle_request(&mut daemon, Request::Status).await {
        Response::Status(status) => {
            assert_eq!(status.repo_epoch, 0);
            assert!(status.placeholder);
            assert_eq!(status.current_asset, None);
            assert!(!status.paused);
        }
        other => panic!("unexpected response {:?}", other),
    }
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_request_sets_flag() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    let response = handle_request(&mut daemon, Request::Shutdown).await;

    assert_eq!(response, Response::ShuttingDown);
    assert!(daemon.shutdown_requested);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn fatal_engine_error_stops_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;

    engine_error(&mut daemon, EngineError::AssetNotFound(AssetId::new("gone")));
    assert!(!daemon.shutdown_requested);

    let response = engine_error(
        &mut daemon,
        EngineError::Fatal("storage error: IO error: disk full".to_string()),
    );
    assert_eq!(
        response,
        Response::Error {
            message: "fatal: storage error: IO error: disk full".to_string()
        }
    );
    assert!(daemon.shutdown_requested);
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn connection_round_trip_over_socket() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = daemon(&dir).await;
    let (client, server) = UnixStream::pair().unwrap();

    let (mut reader, mut writer) = client.into_split();
    let request = protocol::encode(&Request::Query {
        query: Query::Health,
    })
    .unwrap();
    protocol::write_message(&mut writer, &request).await.unwrap();

    handle_connection(&mut daemon, server).await.unwrap();

    let bytes = protocol::read_message(&mut reader).await.unwrap();
    let response: Response = protocol::decode(&bytes).unwrap();
    assert!(matches!(response, Response::Health { .. }));
    daemon.shutdown().await.unwrap();
}
