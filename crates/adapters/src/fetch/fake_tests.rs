// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn serves_registered_body() {
    let fetcher = FakeFetcher::new();
    fetcher.serve("https://cdn/a.png", b"png".to_vec());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a");

    let outcome = fetcher.fetch("https://cdn/a.png", &dest, None).await.unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            etag: None,
            bytes: 3
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), b"png");
    assert_eq!(fetcher.fetch_count("https://cdn/a.png"), 1);
}

#[tokio::test]
async fn matching_validator_is_not_modified() {
    let fetcher = FakeFetcher::new();
    fetcher.serve_with_etag("https://cdn/a.png", b"png".to_vec(), Some("v1"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a");

    let outcome = fetcher
        .fetch("https://cdn/a.png", &dest, Some("v1"))
        .await
        .unwrap();
    assert_eq!(outcome, FetchOutcome::NotModified);
    assert!(!dest.exists());

    let outcome = fetcher
        .fetch("https://cdn/a.png", &dest, Some("v0"))
        .await
        .unwrap();
    assert!(matches!(outcome, FetchOutcome::Downloaded { .. }));
}

#[tokio::test]
async fn unknown_uri_is_404() {
    let fetcher = FakeFetcher::new();
    assert_eq!(
        fetcher.probe("https://cdn/missing").await,
        Err(FetchError::Status(404))
    );
}

#[tokio::test]
async fn scripted_failure_until_served_again() {
    let fetcher = FakeFetcher::new();
    fetcher.serve("https://cdn/a", b"x".to_vec());
    fetcher.fail("https://cdn/a", FetchError::Timeout);
    assert_eq!(
        fetcher.probe("https://cdn/a").await,
        Err(FetchError::Timeout)
    );

    fetcher.serve("https://cdn/a", b"x".to_vec());
    assert_eq!(fetcher.probe("https://cdn/a").await, Ok(()));
    assert_eq!(fetcher.calls().len(), 2);
}
