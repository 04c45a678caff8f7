// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bb_core::{Asset, AssetId, Category};
use std::time::Duration;

fn upsert(id: &str) -> Operation {
    Operation::AssetUpsert {
        asset: Asset::new(id, "https://example.com/a.png", Category::Image)
            .with_duration(Duration::from_secs(10)),
    }
}

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&upsert("a")).unwrap();
        wal.append(&Operation::AssetRemove {
            id: AssetId::new("a"),
        })
        .unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], Operation::AssetUpsert { .. }));
    assert!(matches!(ops[1], Operation::AssetRemove { .. }));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        assert_eq!(wal.append(&upsert("x")).unwrap(), 1);
    }

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        assert_eq!(wal.append(&upsert("y")).unwrap(), 2);
    }
}

#[test]
fn wal_replay_nonexistent() {
    let path = Path::new("/nonexistent/path/wal");
    let ops = Wal::replay(path).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn torn_tail_is_discarded_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&upsert("a")).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"seq":2,"op":{"AssetUps"#).unwrap();
    drop(file);

    assert_eq!(Wal::replay(&path).unwrap().len(), 1);

    let mut wal = Wal::open(&path).unwrap();
    assert_eq!(wal.sequence(), 1);
    wal.append(&upsert("b")).unwrap();
    assert_eq!(Wal::replay(&path).unwrap().len(), 2);
}

#[test]
fn corruption_before_the_tail_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.wal");
    std::fs::write(&path, "not json\n").unwrap();
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&upsert("a")).unwrap();
    }

    let err = Wal::replay(&path).unwrap_err();
    assert!(matches!(err, WalError::Corrupt { line: 1, .. }));
}

#[test]
fn failed_append_leaves_no_partial_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.wal");
    let mut wal = Wal::open(&path).unwrap();
    wal.append(&upsert("a")).unwrap();

    let err = wal
        .append_with(&upsert("b"), |file, line| {
            file.write_all(&line[..line.len() / 2])?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();
    assert!(matches!(err, WalError::Io(_)));
    assert_eq!(wal.sequence(), 1);

    assert_eq!(wal.append(&upsert("c")).unwrap(), 2);
    let ids: Vec<String> = Wal::replay(&path)
        .unwrap()
        .into_iter()
        .map(|op| match op {
            Operation::AssetUpsert { asset } => asset.id.to_string(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}
