// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use std::path::PathBuf;
use yare::parameterized;

fn image() -> Asset {
    Asset::new("poster", "https://cdn.example.com/poster.png", Category::Image)
        .with_duration(Duration::from_secs(10))
}

fn video() -> Asset {
    Asset::new("clip", "https://cdn.example.com/clip.mp4", Category::Video)
}

fn target() -> PlaybackTarget {
    PlaybackTarget::File(PathBuf::from("/var/cache/billboard/assets/poster"))
}

fn timings() -> SessionTimings {
    SessionTimings {
        prepare_timeout: Duration::from_secs(30),
        ready_timeout: Duration::from_secs(5),
        max_self_terminating: Duration::from_secs(600),
    }
}

fn drive(
    session: PlaybackSession,
    events: Vec<SessionEvent>,
    clock: &FakeClock,
) -> (PlaybackSession, Vec<Effect>) {
    events
        .into_iter()
        .fold((session, Vec::new()), |(session, mut all), event| {
            let (next, effects) = session.transition(event, clock);
            all.extend(effects);
            (next, all)
        })
}

/// Session for `asset` advanced to Displaying with the renderer ready
fn displaying(asset: &Asset, clock: &FakeClock) -> PlaybackSession {
    let session = PlaybackSession::new(asset, 1, 0, timings(), clock);
    let (session, _) = drive(
        session,
        vec![
            SessionEvent::Begin,
            SessionEvent::Prepared { target: target() },
            SessionEvent::RendererReady,
        ],
        clock,
    );
    session
}

fn has_failure(effects: &[Effect]) -> bool {
    effects
        .iter()
        .any(|e| matches!(e, Effect::RecordFailure { .. }))
}

fn has_stop(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Stop { .. }))
}

#[test]
fn new_session_is_idle() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    assert_eq!(session.state, SessionState::Idle);
    assert_eq!(session.duration, Some(Duration::from_secs(10)));
}

#[test]
fn begin_requests_prepare() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    let (session, effects) = session.transition(SessionEvent::Begin, &clock);

    assert!(matches!(session.state, SessionState::Preparing { .. }));
    assert_eq!(
        effects[0],
        Effect::Prepare {
            asset_id: AssetId::new("poster")
        }
    );
}

#[test]
fn prepared_loads_target_and_waits_for_ready() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    let (session, effects) = drive(
        session,
        vec![
            SessionEvent::Begin,
            SessionEvent::Prepared { target: target() },
        ],
        &clock,
    );

    assert!(matches!(
        session.state,
        SessionState::Displaying { ready: false, .. }
    ));
    assert!(effects.contains(&Effect::Load {
        asset_id: AssetId::new("poster"),
        target: target(),
        category: Category::Image,
    }));
}

#[test]
fn ready_starts_renderer_with_duration_deadline() {
    let clock = FakeClock::new();
    let session = displaying(&image(), &clock);

    match session.state {
        SessionState::Displaying {
            ready,
            deadline,
            open_ended,
        } => {
            assert!(ready);
            assert!(!open_ended);
            assert_eq!(deadline, clock.now() + Duration::from_secs(10));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert!(session.expected_end.is_some());
    assert_eq!(session.wake_at(), Some(clock.now() + Duration::from_secs(10)));
}

#[test]
fn deadline_moves_to_finishing_then_idle() {
    let clock = FakeClock::new();
    let session = displaying(&image(), &clock);

    clock.advance(Duration::from_secs(9));
    let (session, effects) = session.transition(SessionEvent::Tick, &clock);
    assert!(effects.is_empty());
    assert!(matches!(session.state, SessionState::Displaying { .. }));

    clock.advance(Duration::from_secs(1));
    let (session, effects) = session.transition(SessionEvent::Tick, &clock);
    assert_eq!(
        session.state,
        SessionState::Finishing {
            reason: FinishReason::Elapsed
        }
    );
    assert!(has_stop(&effects));

    let (session, effects) = session.transition(SessionEvent::TornDown, &clock);
    assert_eq!(session.state, SessionState::Idle);
    assert!(effects.contains(&Effect::RecordSuccess {
        asset_id: AssetId::new("poster")
    }));
}

#[test]
fn video_waits_for_finished_signal() {
    let clock = FakeClock::new();
    let session = displaying(&video(), &clock);
    assert!(matches!(
        session.state,
        SessionState::Displaying {
            open_ended: true,
            ..
        }
    ));
    assert_eq!(session.expected_end, None);

    clock.advance(Duration::from_secs(120));
    let (session, _) = session.transition(SessionEvent::Tick, &clock);
    assert!(matches!(session.state, SessionState::Displaying { .. }));

    let (session, effects) = session.transition(SessionEvent::RendererFinished, &clock);
    assert_eq!(
        session.state,
        SessionState::Finishing {
            reason: FinishReason::Completed
        }
    );
    assert!(has_stop(&effects));
}

#[test]
fn video_past_ceiling_is_unresponsive() {
    let clock = FakeClock::new();
    let session = displaying(&video(), &clock);

    clock.advance(Duration::from_secs(600));
    let (session, effects) = session.transition(SessionEvent::Tick, &clock);
    assert_eq!(
        session.state,
        SessionState::Error {
            failure: PlaybackFailure::Unresponsive
        }
    );
    assert!(has_stop(&effects));
    assert!(has_failure(&effects));
}

#[test]
fn prepare_failure_is_an_error_without_stop() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 2, timings(), &clock);
    let (session, effects) = drive(
        session,
        vec![
            SessionEvent::Begin,
            SessionEvent::PrepareFailed {
                reason: "404".to_string(),
            },
        ],
        &clock,
    );

    assert!(matches!(
        session.state,
        SessionState::Error {
            failure: PlaybackFailure::Fetch(_)
        }
    ));
    assert_eq!(session.consecutive_failures, 3);
    assert!(has_failure(&effects));
    assert!(!has_stop(&effects));
}

#[test]
fn prepare_timeout_is_an_error() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    let (session, _) = session.transition(SessionEvent::Begin, &clock);

    clock.advance(Duration::from_secs(30));
    let (session, effects) = session.transition(SessionEvent::Tick, &clock);
    assert_eq!(
        session.state,
        SessionState::Error {
            failure: PlaybackFailure::PrepareTimeout
        }
    );
    assert!(has_failure(&effects));
}

#[test]
fn ready_timeout_stops_renderer() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    let (session, _) = drive(
        session,
        vec![
            SessionEvent::Begin,
            SessionEvent::Prepared { target: target() },
        ],
        &clock,
    );

    clock.advance(Duration::from_secs(5));
    let (session, effects) = session.transition(SessionEvent::Tick, &clock);
    assert_eq!(
        session.state,
        SessionState::Error {
            failure: PlaybackFailure::ReadyTimeout
        }
    );
    assert!(has_stop(&effects));
}

#[test]
fn crash_while_displaying_is_an_error() {
    let clock = FakeClock::new();
    let session = displaying(&image(), &clock);
    let (session, effects) = session.transition(
        SessionEvent::RendererCrashed {
            reason: "exit status 139".to_string(),
        },
        &clock,
    );
    assert!(matches!(
        session.state,
        SessionState::Error {
            failure: PlaybackFailure::Renderer(_)
        }
    ));
    assert!(has_failure(&effects));

    let (session, effects) = session.transition(SessionEvent::TornDown, &clock);
    assert_eq!(session.state, SessionState::Idle);
    assert!(effects.is_empty());
}

#[parameterized(
    replaced = { InterruptReason::PlaylistReplaced },
    skipped = { InterruptReason::Skipped },
    paused = { InterruptReason::Paused },
    shutdown = { InterruptReason::Shutdown },
)]
fn interrupt_while_displaying_finishes_gracefully(reason: InterruptReason) {
    let clock = FakeClock::new();
    let session = displaying(&image(), &clock);
    let (session, effects) = session.transition(SessionEvent::Interrupt { reason }, &clock);

    assert_eq!(
        session.state,
        SessionState::Finishing {
            reason: FinishReason::Interrupted(reason)
        }
    );
    assert!(has_stop(&effects));
    assert!(!has_failure(&effects));

    let (_, effects) = session.transition(SessionEvent::TornDown, &clock);
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::RecordSuccess { .. })));
}

#[test]
fn interrupt_while_preparing_skips_stop() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);
    let (session, _) = session.transition(SessionEvent::Begin, &clock);
    let (session, effects) = session.transition(
        SessionEvent::Interrupt {
            reason: InterruptReason::PlaylistReplaced,
        },
        &clock,
    );
    assert!(session.is_ending());
    assert!(effects.is_empty());
}

#[test]
fn late_signals_are_ignored() {
    let clock = FakeClock::new();
    let session = PlaybackSession::new(&image(), 1, 0, timings(), &clock);

    let (same, effects) = session.transition(SessionEvent::RendererFinished, &clock);
    assert_eq!(same.state, SessionState::Idle);
    assert!(effects.is_empty());

    let session = displaying(&image(), &clock);
    let (session, _) = session.transition(SessionEvent::RendererFinished, &clock);
    let (session, effects) = session.transition(
        SessionEvent::RendererCrashed {
            reason: "late".to_string(),
        },
        &clock,
    );
    assert!(matches!(session.state, SessionState::Finishing { .. }));
    assert!(effects.is_empty());
}

#[test]
fn snapshot_reports_state_and_target() {
    let clock = FakeClock::new();
    let session = displaying(&image(), &clock);
    let snapshot = session.snapshot();

    assert_eq!(snapshot.state, "displaying");
    assert_eq!(snapshot.epoch, 1);
    assert_eq!(
        snapshot.target.as_deref(),
        Some("/var/cache/billboard/assets/poster")
    );
    assert!(snapshot.displayed_at.is_some());
}
