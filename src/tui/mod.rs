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

//! Full-screen terminal interface.
//!
//! A single loop owns [`App`]; terminal input, ticks and operation progress
//! all arrive through [`EventHandler`]. Requests returned by the state
//! machine are started as background operations.

pub mod app;
pub mod events;
pub mod ui;
pub mod widgets;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{debug, info};

use crate::luet::SearchMode;
use crate::ops::{self, cache, checker, details, packages, repo, search, upgrade, Backend, OpKind, OpOutcome, OpSink};
use app::{App, Request};
use events::{AppEvent, EventHandler};

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(())
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the TUI until the user quits
pub async fn run(backend: Backend) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        hook(info);
    }));

    setup_terminal()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let result = event_loop(&mut terminal, backend).await;

    restore_terminal()?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(terminal: &mut Term, backend: Backend) -> Result<()> {
    let mut app = App::new(&backend.config);
    let (sink, op_rx) = OpSink::channel();
    let mut events = EventHandler::new(Duration::from_millis(backend.config.ui.tick_rate_ms));
    events.start_terminal_events();
    events.forward_ops(op_rx);

    start(&mut app, &backend, &sink, Request::CacheInfo);
    terminal.draw(|f| ui::draw(f, &app))?;

    while let Some(first) = events.next().await {
        for event in events.batch(first) {
            let request = match event {
                AppEvent::Key(key) => app.handle_key(key),
                AppEvent::Op(op) => app.handle_op_event(op),
                AppEvent::Tick => {
                    app.tick();
                    None
                }
                AppEvent::Resize(..) => None,
            };
            if let Some(request) = request {
                start(&mut app, &backend, &sink, request);
            }
            if app.should_quit {
                break;
            }
        }
        if app.should_quit {
            info!("quit requested");
            break;
        }
        terminal.draw(|f| ui::draw(f, &app))?;
    }
    Ok(())
}

fn start(app: &mut App, backend: &Backend, sink: &OpSink, request: Request) {
    debug!(?request, "starting request");
    app.begin(&request);
    dispatch(backend.clone(), sink.clone(), request);
}

/// Start the operation behind `request` on a background task
fn dispatch(backend: Backend, sink: OpSink, request: Request) {
    let op_sink = sink.clone();
    match request {
        Request::Search(query) => {
            ops::spawn_op("search", sink, async move {
                let outcome = search::search(&backend, &query, SearchMode::Name).await;
                OpOutcome::Search { query, outcome }
            });
        }
        Request::Details(entry) => {
            ops::spawn_op("details", sink, async move {
                let text = details::details_text(&backend, &entry).await;
                OpOutcome::Details { entry, text }
            });
        }
        Request::Install(entry) => {
            ops::spawn_op("install", sink, async move {
                let completion = packages::install(&backend, &entry, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::Install(entry.full_name()),
                    completion,
                }
            });
        }
        Request::Uninstall(entry) => {
            ops::spawn_op("uninstall", sink, async move {
                let completion = packages::uninstall(&backend, &entry, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::Uninstall(entry.full_name()),
                    completion,
                }
            });
        }
        Request::UpdateRepositories => {
            ops::spawn_op("repo_update", sink, async move {
                let completion = repo::update_repositories(&backend, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::RepoUpdate,
                    completion,
                }
            });
        }
        Request::Upgrade => {
            ops::spawn_op("upgrade", sink, async move {
                let completion = upgrade::full_upgrade(&backend, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::Upgrade,
                    completion,
                }
            });
        }
        Request::Check => {
            ops::spawn_op("check", sink, async move {
                let completion = checker::check_system(&backend, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::Check,
                    completion,
                }
            });
        }
        Request::Cleanup => {
            ops::spawn_op("cleanup", sink, async move {
                let completion = cache::cleanup(&backend, &op_sink).await;
                OpOutcome::Completed {
                    op: OpKind::Cleanup,
                    completion,
                }
            });
        }
        Request::Files(full_name) => {
            ops::spawn_op("files", sink, async move {
                let files = details::files(&backend, &full_name).await;
                OpOutcome::Files { full_name, files }
            });
        }
        Request::RequiredBy(full_name) => {
            ops::spawn_op("required_by", sink, async move {
                let packages = details::required_by(&backend, &full_name).await;
                OpOutcome::RequiredBy { full_name, packages }
            });
        }
        Request::CacheInfo => {
            ops::spawn_op("cache_info", sink, async move { OpOutcome::Cache(cache::cache_info(&backend).await) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::backend;
    use crate::ops::{Completion, OpEvent};
    use crate::runner::testing::ScriptedExecutor;
    use std::sync::Arc;

    async fn finished(rx: &mut tokio::sync::mpsc::UnboundedReceiver<OpEvent>) -> OpOutcome {
        loop {
            match rx.recv().await {
                Some(OpEvent::Finished(outcome)) => return outcome,
                Some(_) => continue,
                None => panic!("channel closed before the operation finished"),
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_search() {
        let exec = Arc::new(ScriptedExecutor::new().reply(
            0,
            r#"{"packages": [{"category": "apps", "name": "vlc", "version": "3.0", "repository": "luet"}]}"#,
            "",
        ));
        let (sink, mut rx) = OpSink::channel();

        dispatch(backend(exec.clone()), sink, Request::Search("vlc".into()));

        match finished(&mut rx).await {
            OpOutcome::Search { query, outcome } => {
                assert_eq!(query, "vlc");
                assert_eq!(outcome.summary(&query).unwrap(), "Found 1 results matching 'vlc'");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(exec.argvs(), ["luet search -o json -q vlc"]);
    }

    #[tokio::test]
    async fn test_dispatch_repo_update() {
        let exec = Arc::new(ScriptedExecutor::new().reply(0, "synced\n", ""));
        let (sink, mut rx) = OpSink::channel();

        dispatch(backend(exec), sink, Request::UpdateRepositories);

        match finished(&mut rx).await {
            OpOutcome::Completed { op, completion } => {
                assert_eq!(op, OpKind::RepoUpdate);
                assert_eq!(completion, Completion::ok("Repositories updated"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
