// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

/// Serve one canned response and hand back the request head
fn serve_once(response: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }
        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        let _ = tx.send(head);
    });

    (format!("http://{}/asset", addr), rx)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5))
}

#[tokio::test]
async fn downloads_body_and_reports_etag() {
    let (uri, _rx) = serve_once(
        "HTTP/1.1 200 OK\r\nETag: \"v1\"\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    );
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("partial");

    let outcome = fetcher().fetch(&uri, &dest, None).await.unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            etag: Some("\"v1\"".to_string()),
            bytes: 5
        }
    );
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello");
}

#[test]
fn abandoned_download_leaves_no_file() {
    let (uri, _rx) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    );
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("asset.part");
    let agent = fetcher().agent;

    let result = download(&agent, &uri, &dest, None, &AtomicBool::new(true));

    assert_eq!(result, Err(abandoned()));
    assert!(!dest.exists());
}

#[tokio::test]
async fn dropped_fetch_does_not_recreate_partial_file() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}/asset", listener.local_addr().unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        let _ = release_rx.recv();
        let mut stream = stream;
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        );
    });
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("asset.part");

    let fetcher = fetcher();
    let fetch = fetcher.fetch(&uri, &dest, None);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), fetch)
            .await
            .is_err()
    );
    release_tx.send(()).unwrap();
    server.join().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!dest.exists());
}

#[tokio::test]
async fn conditional_request_sends_validator() {
    let (uri, rx) =
        serve_once("HTTP/1.1 304 Not Modified\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("partial");

    let outcome = fetcher().fetch(&uri, &dest, Some("\"v1\"")).await.unwrap();

    assert_eq!(outcome, FetchOutcome::NotModified);
    assert!(!dest.exists());
    let head = rx.recv().unwrap().to_ascii_lowercase();
    assert!(head.contains("if-none-match: \"v1\""), "request was:\n{}", head);
}

#[tokio::test]
async fn error_status_is_reported() {
    let (uri, _rx) =
        serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let dir = tempfile::tempdir().unwrap();

    let result = fetcher().fetch(&uri, &dir.path().join("partial"), None).await;
    assert_eq!(result, Err(FetchError::Status(404)));
}

#[tokio::test]
async fn probe_accepts_reachable_origin() {
    let (uri, rx) = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");

    fetcher().probe(&uri).await.unwrap();
    assert!(rx.recv().unwrap().starts_with("HEAD "));
}

#[tokio::test]
async fn probe_rejects_server_error() {
    let (uri, _rx) = serve_once(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(fetcher().probe(&uri).await, Err(FetchError::Status(503)));
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let dir = tempfile::tempdir().unwrap();

    let result = fetcher()
        .fetch(&format!("http://{}/x", addr), &dir.path().join("partial"), None)
        .await;
    assert!(
        matches!(result, Err(FetchError::Network(_)) | Err(FetchError::Io(_))),
        "got {:?}",
        result
    );
}
