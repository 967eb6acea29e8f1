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

//! Full system upgrade.
//!
//! Repository sync and upgrade run under one elevation prompt. When the
//! upgrade replaced the repository definitions themselves, luet stops after
//! the repo-updater finalizer and a second `luet upgrade` finishes the job.

use tracing::{info, warn};

use super::{refresh_desktop_cache, Backend, Completion, OpSink};
use crate::luet::REPO_UPDATER_FINALIZER;
use crate::runner::CommandSpec;

pub const UPGRADE_OK_MESSAGE: &str = "System upgrade completed successfully";
pub const PHASE_ONE_FAILED_MESSAGE: &str = "Error during initial upgrade step";
pub const UPGRADE_FAILED_MESSAGE: &str = "Error during system upgrade";

const CONTINUE_BANNER: &str = "\n--- Repositories updated, continuing with package upgrade... ---\n\n";

/// Stream `spec` into the log, returning the exit code and the lines seen
async fn stream_collect(backend: &Backend, sink: &OpSink, spec: &CommandSpec) -> (i32, Vec<String>) {
    let mut lines = Vec::new();
    let result = backend
        .exec
        .stream(spec, &mut |line| {
            sink.log(line.clone());
            lines.push(line);
        })
        .await;

    match result {
        Ok(code) => (code, lines),
        Err(e) => {
            warn!(error = %e, command = %spec.display(), "upgrade step did not run");
            sink.log(e.to_string());
            (e.exit_code(), lines)
        }
    }
}

/// Whether the output shows a repo-updater package rewrote the repositories
pub fn needs_second_phase(lines: &[String]) -> bool {
    lines.iter().any(|l| l.contains(REPO_UPDATER_FINALIZER))
}

pub async fn full_upgrade(backend: &Backend, sink: &OpSink) -> Completion {
    sink.status("Performing full system upgrade...");
    sink.log("Full system upgrade initiated.\n");

    let (code, lines) = stream_collect(backend, sink, &backend.luet.repo_update_then_upgrade()).await;
    if code != 0 {
        warn!(code, "initial upgrade step failed");
        return Completion::failed(code, PHASE_ONE_FAILED_MESSAGE);
    }

    if needs_second_phase(&lines) {
        info!("repositories were replaced, running second upgrade pass");
        sink.status("Continuing with package upgrade...");
        sink.log(CONTINUE_BANNER);

        let (code, _) = stream_collect(backend, sink, &backend.luet.upgrade()).await;
        if code != 0 {
            warn!(code, "second upgrade pass failed");
            return Completion::failed(code, UPGRADE_FAILED_MESSAGE);
        }
    }

    info!("system upgraded");
    refresh_desktop_cache(backend).await;
    Completion::ok(UPGRADE_OK_MESSAGE)
}
