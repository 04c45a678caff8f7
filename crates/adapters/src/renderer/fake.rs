// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake renderer for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{LoadId, RenderError, RendererAdapter, RendererSignal, SignalKind};
use async_trait::async_trait;
use bb_core::{Category, PlaybackTarget};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Recorded renderer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Load {
        load: LoadId,
        target: PlaybackTarget,
        category: Category,
    },
    Start {
        load: LoadId,
    },
    Stop {
        load: LoadId,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<RenderCall>,
    next_load: LoadId,
    active: HashSet<LoadId>,
    max_active: usize,
    /// Loads that never report ready
    silent_loads: usize,
    /// `start` calls that never return
    hanging_starts: usize,
    load_failures: VecDeque<String>,
}

/// Fake renderer for testing
///
/// Reports `Ready` immediately after each load unless told to stay silent.
/// Tests drive `Finished` and `Crashed` by hand.
#[derive(Clone)]
pub struct FakeRenderer {
    signals: mpsc::UnboundedSender<RendererSignal>,
    state: Arc<Mutex<State>>,
}

impl FakeRenderer {
    pub fn new(signals: mpsc::UnboundedSender<RendererSignal>) -> Self {
        Self {
            signals,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RenderCall> {
        self.state().calls.clone()
    }

    /// Targets loaded so far, in order
    pub fn loaded(&self) -> Vec<PlaybackTarget> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Load { target, .. } => Some(target.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent load id
    pub fn last_load(&self) -> Option<LoadId> {
        let state = self.state();
        (state.next_load > 0).then_some(state.next_load)
    }

    /// Highest number of loads that were live at the same time
    pub fn max_concurrent(&self) -> usize {
        self.state().max_active
    }

    /// The next `n` loads never report ready
    pub fn stay_silent(&self, n: usize) {
        self.state().silent_loads = n;
    }

    /// The next `n` start calls block forever
    pub fn hang_on_start(&self, n: usize) {
        self.state().hanging_starts = n;
    }

    /// The next load fails with `reason`
    pub fn fail_next_load(&self, reason: impl Into<String>) {
        self.state().load_failures.push_back(reason.into());
    }

    /// Report that `load` ended on its own
    pub fn finish(&self, load: LoadId) {
        self.state().active.remove(&load);
        let _ = self.signals.send(RendererSignal {
            load,
            kind: SignalKind::Finished,
        });
    }

    /// Report that `load` crashed
    pub fn crash(&self, load: LoadId, reason: impl Into<String>) {
        self.state().active.remove(&load);
        let _ = self.signals.send(RendererSignal {
            load,
            kind: SignalKind::Crashed(reason.into()),
        });
    }
}

#[async_trait]
impl RendererAdapter for FakeRenderer {
    async fn load(
        &self,
        target: &PlaybackTarget,
        category: Category,
    ) -> Result<LoadId, RenderError> {
        let (load, silent) = {
            let mut state = self.state();
            if let Some(reason) = state.load_failures.pop_front() {
                return Err(RenderError::SpawnFailed(reason));
            }
            state.next_load += 1;
            let load = state.next_load;
            state.calls.push(RenderCall::Load {
                load,
                target: target.clone(),
                category,
            });
            state.active.insert(load);
            state.max_active = state.max_active.max(state.active.len());
            let silent = state.silent_loads > 0;
            if silent {
                state.silent_loads -= 1;
            }
            (load, silent)
        };

        if !silent {
            let _ = self.signals.send(RendererSignal {
                load,
                kind: SignalKind::Ready,
            });
        }
        Ok(load)
    }

    async fn start(&self, load: LoadId) -> Result<(), RenderError> {
        let hang = {
            let mut state = self.state();
            state.calls.push(RenderCall::Start { load });
            let hang = state.hanging_starts > 0;
            if hang {
                state.hanging_starts -= 1;
            }
            hang
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop(&self, load: LoadId) -> Result<(), RenderError> {
        let mut state = self.state();
        state.calls.push(RenderCall::Stop { load });
        state.active.remove(&load);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
