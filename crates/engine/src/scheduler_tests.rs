// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cache::CacheEntry;
use crate::test_support::{eventually, TokioClock};
use bb_core::{ActiveWindow, Category, FakeClock, PlaybackTarget};
use chrono::TimeZone;
use tempfile::TempDir;
use tokio::sync::broadcast;

struct Harness<C> {
    scheduler: Arc<Scheduler<C>>,
    repo: Arc<AssetRepository>,
    index: Arc<CacheIndex>,
    events: broadcast::Receiver<Event>,
    _dir: TempDir,
}

fn settings(shuffle: bool) -> SchedulerSettings {
    SchedulerSettings {
        placeholder: Asset::placeholder("/usr/share/billboard/loading.png", Duration::from_secs(5)),
        shuffle,
        reshuffle_every: 2,
        failure_threshold: 3,
    }
}

fn harness_with<C: Clock>(clock: C, shuffle: bool) -> Harness<C> {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(AssetRepository::open(&dir.path().join("assets.wal")).unwrap());
    let index = Arc::new(CacheIndex::load(&dir.path().join("index.json")));
    let bus = EventBus::new();
    let events = bus.subscribe();
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&repo),
        Arc::clone(&index),
        clock,
        settings(shuffle),
        bus,
    ));
    Harness {
        scheduler,
        repo,
        index,
        events,
        _dir: dir,
    }
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn image(id: &str, order: i64) -> Asset {
    Asset::new(id, format!("https://cdn/{}.png", id), Category::Image)
        .with_duration(Duration::from_secs(10))
        .with_order(order)
}

fn ids(playlist: &Playlist) -> Vec<&str> {
    playlist.entries.iter().map(|id| id.as_str()).collect()
}

fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[test]
fn empty_repository_yields_placeholder() {
    let h = harness_with(FakeClock::at(noon()), false);
    let playlist = h.scheduler.recompute();

    assert_eq!(playlist.epoch, 1);
    assert!(playlist.is_placeholder());
    assert_eq!(playlist.entries, vec![AssetId::placeholder()]);
}

#[test]
fn two_assets_play_in_order() {
    let h = harness_with(FakeClock::at(noon()), false);
    h.repo.upsert(image("second", 2)).unwrap();
    h.repo.upsert(image("first", 1)).unwrap();

    let playlist = h.scheduler.recompute();
    assert_eq!(ids(&playlist), vec!["first", "second"]);
    assert!(!playlist.is_placeholder());
}

#[test]
fn unchanged_sequence_keeps_epoch() {
    let mut h = harness_with(FakeClock::at(noon()), false);
    h.repo.upsert(image("a", 1)).unwrap();
    let first = h.scheduler.recompute();
    drain(&mut h.events);

    let again = h.scheduler.recompute();
    assert_eq!(again.epoch, first.epoch);
    assert!(drain(&mut h.events).is_empty());

    h.repo.upsert(image("b", 2)).unwrap();
    let next = h.scheduler.recompute();
    assert_eq!(next.epoch, first.epoch + 1);
    assert_eq!(next.repo_epoch, 2);
}

#[test]
fn repeated_failures_exclude_until_repository_change() {
    let mut h = harness_with(FakeClock::at(noon()), false);
    h.repo.upsert(image("a", 1)).unwrap();
    h.repo.upsert(image("b", 2)).unwrap();
    h.scheduler.recompute();

    let bad = AssetId::new("a");
    assert!(!h.scheduler.record_failure(&bad));
    assert!(!h.scheduler.record_failure(&bad));
    assert!(h.scheduler.record_failure(&bad));
    assert!(drain(&mut h.events).iter().any(|e| matches!(
        e,
        Event::AssetExcluded { failures: 3, .. }
    )));

    assert_eq!(ids(&h.scheduler.recompute()), vec!["b"]);
    assert!(h.scheduler.failures()[0].excluded);

    h.repo.upsert(image("c", 3)).unwrap();
    assert_eq!(ids(&h.scheduler.recompute()), vec!["a", "b", "c"]);
    assert!(drain(&mut h.events)
        .iter()
        .any(|e| matches!(e, Event::ExclusionsCleared { count: 1 })));
}

#[test]
fn success_resets_failure_run() {
    let h = harness_with(FakeClock::at(noon()), false);
    let id = AssetId::new("a");
    h.scheduler.record_failure(&id);
    h.scheduler.record_failure(&id);
    h.scheduler.record_success(&id);
    assert_eq!(h.scheduler.failure_count(&id), 0);
    assert!(!h.scheduler.record_failure(&id));
}

#[test]
fn placeholder_is_never_excluded() {
    let h = harness_with(FakeClock::at(noon()), false);
    for _ in 0..5 {
        assert!(!h.scheduler.record_failure(&AssetId::placeholder()));
    }
    assert!(h.scheduler.failures().is_empty());
}

#[test]
fn window_reentry_clears_exclusion() {
    let clock = FakeClock::at(noon());
    let h = harness_with(clock.clone(), false);
    let later = image("later", 1).with_window(ActiveWindow::new(
        Some(noon() + chrono::Duration::minutes(10)),
        None,
    ));
    h.repo.upsert(later).unwrap();
    h.scheduler.recompute();

    let id = AssetId::new("later");
    for _ in 0..3 {
        h.scheduler.record_failure(&id);
    }
    assert_eq!(h.scheduler.failure_count(&id), 3);

    clock.set_utc(noon() + chrono::Duration::minutes(10));
    let playlist = h.scheduler.recompute();

    assert_eq!(ids(&playlist), vec!["later"]);
    assert_eq!(h.scheduler.failure_count(&id), 0);
}

#[test]
fn window_end_is_exclusive() {
    let clock = FakeClock::at(noon());
    let h = harness_with(clock.clone(), false);
    let end = noon() + chrono::Duration::minutes(5);
    h.repo
        .upsert(image("a", 1).with_window(ActiveWindow::new(Some(noon()), Some(end))))
        .unwrap();

    assert_eq!(ids(&h.scheduler.recompute()), vec!["a"]);
    assert_eq!(h.scheduler.current().next_boundary, Some(end));

    clock.set_utc(end);
    assert!(h.scheduler.recompute().is_placeholder());
}

#[test]
fn degraded_mode_schedules_only_available_content() {
    let h = harness_with(FakeClock::at(noon()), false);
    h.repo.upsert(image("cached", 1)).unwrap();
    h.repo.upsert(image("remote", 2)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.png");
    std::fs::write(&local, b"png").unwrap();
    h.repo
        .upsert(
            Asset::new("local", local.display().to_string(), Category::Image)
                .with_duration(Duration::from_secs(5))
                .with_order(3),
        )
        .unwrap();
    h.repo
        .upsert(
            Asset::new("live", "https://live.example.com/feed", Category::Stream)
                .with_duration(Duration::from_secs(60))
                .with_order(4)
                .trusted(),
        )
        .unwrap();
    h.repo
        .upsert(
            Asset::new("board", "https://example.com/board", Category::WebPage)
                .with_duration(Duration::from_secs(30))
                .with_order(5),
        )
        .unwrap();

    let cached = dir.path().join("cached");
    std::fs::write(&cached, b"png").unwrap();
    h.index.insert(CacheEntry {
        asset_id: AssetId::new("cached"),
        source_uri: "https://cdn/cached.png".to_string(),
        target: PlaybackTarget::File(cached),
        sha256: None,
        etag: None,
        size: 3,
        validated_at: noon(),
        last_used: noon(),
        fetching: false,
    });

    h.scheduler.set_degraded(true);
    assert_eq!(
        ids(&h.scheduler.recompute()),
        vec!["cached", "local", "live"]
    );

    h.scheduler.set_degraded(false);
    assert_eq!(
        ids(&h.scheduler.recompute()),
        vec!["cached", "remote", "local", "live", "board"]
    );
}

#[test]
fn shuffle_follows_the_round_seed() {
    let h = harness_with(FakeClock::at(noon()), true);
    let assets: Vec<Asset> = (0..8).map(|i| image(&format!("a{}", i), 0)).collect();
    for asset in &assets {
        h.repo.upsert(asset.clone()).unwrap();
    }

    let expected = |round| {
        let excluded = HashSet::new();
        schedule::compute(
            &h.repo.list().assets,
            ScheduleParams {
                now: noon(),
                excluded: &excluded,
                available_only: None,
                shuffle: Some(ShuffleSeed {
                    repo_epoch: 8,
                    round,
                }),
            },
        )
        .entries
    };

    assert_eq!(h.scheduler.recompute().entries, expected(0));

    h.scheduler.record_pass();
    assert_eq!(h.scheduler.recompute().entries, expected(0));
    h.scheduler.record_pass();
    assert_eq!(h.scheduler.recompute().entries, expected(1));
}

#[tokio::test(start_paused = true)]
async fn future_window_opens_without_trigger() {
    let h = harness_with(TokioClock::at(noon()), false);
    h.repo
        .upsert(image("soon", 1).with_window(ActiveWindow::new(
            Some(noon() + chrono::Duration::seconds(90)),
            None,
        )))
        .unwrap();

    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.scheduler).run(cancel.clone()));
    let rx = h.scheduler.subscribe();

    eventually("first playlist", || rx.borrow().epoch >= 1).await;
    assert!(rx.borrow().is_placeholder());

    tokio::time::sleep(Duration::from_secs(89)).await;
    assert!(rx.borrow().is_placeholder());

    eventually("window to open", || !rx.borrow().is_placeholder()).await;
    assert_eq!(ids(&rx.borrow()), vec!["soon"]);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn loop_follows_repository_changes() {
    let h = harness_with(TokioClock::at(noon()), false);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.scheduler).run(cancel.clone()));
    let rx = h.scheduler.subscribe();
    eventually("first playlist", || rx.borrow().epoch >= 1).await;

    h.repo.upsert(image("a", 1)).unwrap();
    eventually("asset to appear", || rx.borrow().contains(&AssetId::new("a"))).await;

    h.repo.remove(&AssetId::new("a")).unwrap();
    eventually("placeholder to return", || rx.borrow().is_placeholder()).await;

    cancel.cancel();
    task.await.unwrap();
}
