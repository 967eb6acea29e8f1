/*
 * luet-pm - Terminal front-end for the luet package manager.
 * Copyright (C) 2025  luet-pm contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Package manager operations built on top of the command runner.
//!
//! Operations are plain async functions. They report progress through an
//! [`OpSink`] and return their result; the TUI runs them on a background
//! task and forwards the result as [`OpEvent::Finished`], the CLI awaits
//! them directly.

pub mod cache;
pub mod checker;
pub mod details;
pub mod packages;
pub mod repo;
pub mod search;
pub mod sync_info;
pub mod upgrade;

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::Config;
use crate::luet::{Luet, PackageEntry};
use crate::runner::CommandExecutor;

pub use search::SearchOutcome;

/// Everything an operation needs to reach luet
#[derive(Clone)]
pub struct Backend {
    pub exec: Arc<dyn CommandExecutor>,
    pub luet: Luet,
    pub config: Arc<Config>,
}

impl Backend {
    pub fn new(exec: Arc<dyn CommandExecutor>, config: Config) -> Self {
        Self {
            exec,
            luet: Luet::new(config.luet_bin.clone()),
            config: Arc::new(config),
        }
    }
}

/// Which long-running operation a completion belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    RepoUpdate,
    Upgrade,
    Check,
    Cleanup,
    Install(String),
    Uninstall(String),
}

/// Final state of a streamed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub success: bool,
    pub code: i32,
    pub message: String,
}

impl Completion {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: 0,
            message: message.into(),
        }
    }

    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
        }
    }
}

/// Result delivered to the UI when an operation ends
#[derive(Debug, Clone)]
pub enum OpOutcome {
    Completed { op: OpKind, completion: Completion },
    Search { query: String, outcome: SearchOutcome },
    Details { entry: PackageEntry, text: String },
    Files { full_name: String, files: Option<Vec<String>> },
    RequiredBy { full_name: String, packages: Option<Vec<String>> },
    Cache(cache::CacheInfo),
}

/// Progress messages from a running operation
#[derive(Debug, Clone)]
pub enum OpEvent {
    /// Output for the log pane, may span several lines
    Log(String),
    /// Replacement for the status line
    Status(String),
    Finished(OpOutcome),
}

/// Sending half of the operation event channel.
///
/// Sends never fail from the operation's point of view: if the UI is gone
/// the events are dropped.
#[derive(Debug, Clone)]
pub struct OpSink {
    tx: mpsc::UnboundedSender<OpEvent>,
}

impl OpSink {
    pub fn new(tx: mpsc::UnboundedSender<OpEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OpEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn log(&self, text: impl Into<String>) {
        let _ = self.tx.send(OpEvent::Log(text.into()));
    }

    pub fn status(&self, text: impl Into<String>) {
        let _ = self.tx.send(OpEvent::Status(text.into()));
    }

    pub fn finish(&self, outcome: OpOutcome) {
        let _ = self.tx.send(OpEvent::Finished(outcome));
    }
}

/// Run an operation on a background task and report its outcome on `sink`
pub fn spawn_op<F>(name: &'static str, sink: OpSink, fut: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = OpOutcome> + Send + 'static,
{
    tokio::spawn(
        async move {
            let outcome = fut.await;
            sink.finish(outcome);
        }
        .instrument(crate::span_operation!(name)),
    )
}

/// Refresh the KDE service cache so menus pick up added or removed apps.
///
/// Only runs when `kbuildsycoca6` is installed; failures are ignored.
pub async fn refresh_desktop_cache(backend: &Backend) {
    if !backend.config.refresh_desktop_cache {
        return;
    }
    let Ok(path) = which::which("kbuildsycoca6") else {
        return;
    };
    let spec = crate::runner::CommandSpec::new(path.to_string_lossy(), Vec::<String>::new());
    match backend.exec.run(&spec).await {
        Ok(out) if out.success() => tracing::debug!("desktop cache refreshed"),
        Ok(out) => tracing::debug!(code = out.code, "kbuildsycoca6 failed"),
        Err(e) => tracing::debug!(error = %e, "kbuildsycoca6 did not run"),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_op_reports_outcome() {
        let (sink, mut rx) = OpSink::channel();
        let task_sink = sink.clone();
        spawn_op("test", sink, async move {
            task_sink.log("working");
            OpOutcome::Completed {
                op: OpKind::Cleanup,
                completion: Completion::ok("done"),
            }
        })
        .await
        .unwrap();

        assert!(matches!(rx.recv().await, Some(OpEvent::Log(l)) if l == "working"));
        match rx.recv().await {
            Some(OpEvent::Finished(OpOutcome::Completed { op, completion })) => {
                assert_eq!(op, OpKind::Cleanup);
                assert!(completion.success);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_sink_survives_closed_receiver() {
        let (sink, rx) = OpSink::channel();
        drop(rx);
        sink.log("nobody listens");
        sink.status("still fine");
    }
}
