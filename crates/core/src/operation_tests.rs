// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::asset::Category;
use std::time::Duration;

#[test]
fn upsert_serializes_asset_inline() {
    let op = Operation::AssetUpsert {
        asset: Asset::new("menu", "https://example.com/menu.png", Category::Image)
            .with_duration(Duration::from_secs(8)),
    };
    let json = serde_json::to_value(&op).unwrap();
    assert_eq!(json["AssetUpsert"]["asset"]["id"], "menu");
    assert_eq!(json["AssetUpsert"]["asset"]["duration"], "8s");
}

#[test]
fn minimal_upsert_fills_defaults() {
    let json = r#"{"AssetUpsert":{"asset":{"id":"clip","uri":"/srv/clip.mp4","category":"video"}}}"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    match op {
        Operation::AssetUpsert { asset } => {
            assert!(asset.enabled);
            assert_eq!(asset.order, 0);
            assert_eq!(asset.duration, None);
        }
        other => panic!("expected AssetUpsert, got {:?}", other),
    }
}

#[test]
fn asset_id_accessor() {
    let op = Operation::AssetRemove {
        id: AssetId::new("gone"),
    };
    assert_eq!(op.asset_id().as_str(), "gone");
}
