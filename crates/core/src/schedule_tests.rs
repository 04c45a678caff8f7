// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::asset::{ActiveWindow, Category};
use chrono::TimeZone;
use proptest::prelude::*;
use std::time::Duration;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn image(id: &str, order: i64) -> Asset {
    Asset::new(id, format!("https://cdn.example.com/{}.png", id), Category::Image)
        .with_duration(Duration::from_secs(10))
        .with_order(order)
}

fn ids(schedule: &Schedule) -> Vec<&str> {
    schedule.entries.iter().map(|id| id.as_str()).collect()
}

#[test]
fn empty_repository_yields_empty_schedule() {
    let none = HashSet::new();
    let schedule = compute(&[], ScheduleParams::at(noon(), &none));
    assert!(schedule.entries.is_empty());
    assert_eq!(schedule.next_boundary, None);
}

#[test]
fn two_assets_sorted_by_order_key() {
    let none = HashSet::new();
    let assets = vec![image("second", 2), image("first", 1)];
    let schedule = compute(&assets, ScheduleParams::at(noon(), &none));
    assert_eq!(ids(&schedule), vec!["first", "second"]);
}

#[test]
fn ties_broken_by_identifier() {
    let none = HashSet::new();
    let assets = vec![image("c", 0), image("a", 0), image("b", 0)];
    let schedule = compute(&assets, ScheduleParams::at(noon(), &none));
    assert_eq!(ids(&schedule), vec!["a", "b", "c"]);
}

#[test]
fn disabled_and_excluded_assets_filtered() {
    let excluded: HashSet<AssetId> = [AssetId::new("flaky")].into_iter().collect();
    let assets = vec![image("ok", 1), image("off", 2).disabled(), image("flaky", 3)];
    let schedule = compute(&assets, ScheduleParams::at(noon(), &excluded));
    assert_eq!(ids(&schedule), vec!["ok"]);
}

#[test]
fn degraded_mode_restricts_to_available() {
    let none = HashSet::new();
    let available: HashSet<AssetId> = [AssetId::new("cached")].into_iter().collect();
    let assets = vec![image("cached", 1), image("remote", 0)];
    let params = ScheduleParams {
        available_only: Some(&available),
        ..ScheduleParams::at(noon(), &none)
    };
    assert_eq!(ids(&compute(&assets, params)), vec!["cached"]);
}

#[test]
fn future_window_excluded_with_boundary_reported() {
    let none = HashSet::new();
    let opens = noon() + chrono::Duration::minutes(30);
    let assets = vec![
        image("now", 1),
        image("later", 0).with_window(ActiveWindow::new(Some(opens), None)),
    ];

    let schedule = compute(&assets, ScheduleParams::at(noon(), &none));
    assert_eq!(ids(&schedule), vec!["now"]);
    assert_eq!(schedule.next_boundary, Some(opens));

    let schedule = compute(&assets, ScheduleParams::at(opens, &none));
    assert_eq!(ids(&schedule), vec!["later", "now"]);
    assert_eq!(schedule.next_boundary, None);
}

#[test]
fn boundary_considers_end_of_included_assets() {
    let none = HashSet::new();
    let closes = noon() + chrono::Duration::minutes(5);
    let opens = noon() + chrono::Duration::minutes(10);
    let assets = vec![
        image("closing", 0).with_window(ActiveWindow::new(None, Some(closes))),
        image("opening", 0).with_window(ActiveWindow::new(Some(opens), None)),
    ];
    let schedule = compute(&assets, ScheduleParams::at(noon(), &none));
    assert_eq!(schedule.next_boundary, Some(closes));
}

#[test]
fn disabled_assets_do_not_contribute_boundaries() {
    let opens = noon() + chrono::Duration::minutes(10);
    let assets = vec![image("off", 0)
        .disabled()
        .with_window(ActiveWindow::new(Some(opens), None))];
    assert_eq!(next_boundary(&assets, noon()), None);
}

#[test]
fn eligible_ids_ignore_exclusions() {
    let assets = vec![image("a", 0), image("b", 0).disabled()];
    let eligible = eligible_ids(&assets, noon());
    assert!(eligible.contains(&AssetId::new("a")));
    assert!(!eligible.contains(&AssetId::new("b")));
}

#[test]
fn shuffle_is_a_permutation_and_seed_dependent() {
    let none = HashSet::new();
    let assets: Vec<Asset> = (0..12).map(|i| image(&format!("a{:02}", i), i)).collect();
    let seeded = |round| ScheduleParams {
        shuffle: Some(ShuffleSeed {
            repo_epoch: 4,
            round,
        }),
        ..ScheduleParams::at(noon(), &none)
    };

    let first = compute(&assets, seeded(0));
    let again = compute(&assets, seeded(0));
    let other = compute(&assets, seeded(1));

    assert_eq!(first, again);
    assert_ne!(first.entries, other.entries);

    let mut sorted = first.entries.clone();
    sorted.sort();
    let expected: Vec<AssetId> = assets.iter().map(|a| a.id.clone()).collect();
    assert_eq!(sorted, expected);
}

fn arb_asset() -> impl Strategy<Value = Asset> {
    (0u16..500, -5i64..5, any::<bool>(), proptest::option::of(-120i64..120))
        .prop_map(|(n, order, enabled, start_offset)| {
            let mut asset = image(&format!("asset-{}", n), order);
            asset.enabled = enabled;
            if let Some(minutes) = start_offset {
                let start = noon() + chrono::Duration::minutes(minutes);
                asset.window = ActiveWindow::new(Some(start), Some(start + chrono::Duration::hours(1)));
            }
            asset
        })
}

proptest! {
    #[test]
    fn output_is_independent_of_snapshot_order(
        assets in proptest::collection::vec(arb_asset(), 0..20)
    ) {
        let none = HashSet::new();
        let mut reversed = assets.clone();
        reversed.reverse();

        let a = compute(&assets, ScheduleParams::at(noon(), &none));
        let b = compute(&reversed, ScheduleParams::at(noon(), &none));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn output_is_sorted_and_eligible(
        assets in proptest::collection::vec(arb_asset(), 0..20)
    ) {
        let none = HashSet::new();
        let schedule = compute(&assets, ScheduleParams::at(noon(), &none));

        let keyed: Vec<(i64, &AssetId)> = schedule
            .entries
            .iter()
            .map(|id| {
                let asset = assets.iter().find(|a| &a.id == id).unwrap();
                prop_assert!(asset.is_eligible(noon()));
                Ok((asset.order, id))
            })
            .collect::<Result<_, TestCaseError>>()?;

        for pair in keyed.windows(2) {
            prop_assert!(pair[0] <= pair[1], "not sorted: {:?}", pair);
        }
    }

    #[test]
    fn boundary_is_always_in_the_future(
        assets in proptest::collection::vec(arb_asset(), 0..20)
    ) {
        if let Some(boundary) = next_boundary(&assets, noon()) {
            prop_assert!(boundary > noon());
        }
    }
}
