// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-backed renderer
//!
//! Each load launches the configured player for the content category. The
//! surface shows exactly one process at a time: loading new content stops
//! whatever was running. Process exit is reported as `Finished` on success and
//! `Crashed` otherwise; a deliberate stop reports nothing.

use super::{LoadId, RenderError, RendererAdapter, RendererSignal, SignalKind};
use async_trait::async_trait;
use bb_core::config::RendererConfig;
use bb_core::{Category, PlaybackTarget};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

struct Running {
    load: LoadId,
    kill: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    next_load: LoadId,
    running: Option<Running>,
}

/// Renderer that drives external player processes
#[derive(Clone)]
pub struct ProcessRenderer {
    commands: Arc<RendererConfig>,
    signals: mpsc::UnboundedSender<RendererSignal>,
    inner: Arc<Mutex<Inner>>,
}

impl ProcessRenderer {
    pub fn new(commands: RendererConfig, signals: mpsc::UnboundedSender<RendererSignal>) -> Self {
        Self {
            commands: Arc::new(commands),
            signals,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn take_running(&self) -> Option<Running> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .running
            .take()
    }
}

#[async_trait]
impl RendererAdapter for ProcessRenderer {
    async fn load(
        &self,
        target: &PlaybackTarget,
        category: Category,
    ) -> Result<LoadId, RenderError> {
        if let Some(previous) = self.take_running() {
            let _ = previous.kill.send(());
        }

        let (program, args) = self
            .commands
            .command(category, &target.as_uri())
            .ok_or(RenderError::NoCommand(category))?;

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::SpawnFailed(format!("{}: {}", program, e)))?;

        let (kill_tx, kill_rx) = oneshot::channel();
        let load = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.next_load += 1;
            inner.running = Some(Running {
                load: inner.next_load,
                kill: kill_tx,
            });
            inner.next_load
        };

        // Launched players render as soon as they start
        let _ = self.signals.send(RendererSignal {
            load,
            kind: SignalKind::Ready,
        });

        let signals = self.signals.clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let kind = match status {
                        Ok(status) if status.success() => SignalKind::Finished,
                        Ok(status) => SignalKind::Crashed(format!("renderer {}", status)),
                        Err(e) => SignalKind::Crashed(e.to_string()),
                    };
                    {
                        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                        if inner.running.as_ref().is_some_and(|r| r.load == load) {
                            inner.running = None;
                        }
                    }
                    let _ = signals.send(RendererSignal { load, kind });
                }
                _ = kill_rx => {
                    let _ = child.kill().await;
                }
            }
        });
        Ok(load)
    }

    async fn start(&self, load: LoadId) -> Result<(), RenderError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match &inner.running {
            Some(running) if running.load == load => Ok(()),
            _ => Err(RenderError::UnknownLoad(load)),
        }
    }

    async fn stop(&self, load: LoadId) -> Result<(), RenderError> {
        let running = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match &inner.running {
                Some(running) if running.load == load => inner.running.take(),
                _ => None,
            }
        };
        if let Some(running) = running {
            let _ = running.kill.send(());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
