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

//! Repository synchronisation.

use tracing::{info, warn};

use super::{Backend, Completion, OpSink};

/// `luet repo update`, streaming its output to the log
pub async fn update_repositories(backend: &Backend, sink: &OpSink) -> Completion {
    sink.status("Updating repositories...");
    let spec = backend.luet.repo_update();

    let result = backend
        .exec
        .stream(&spec, &mut |line| sink.log(line))
        .await;

    match result {
        Ok(0) => {
            info!("repositories updated");
            Completion::ok("Repositories updated")
        }
        Ok(code) => {
            warn!(code, "repo update failed");
            Completion::failed(code, "Error updating repositories")
        }
        Err(e) => {
            warn!(error = %e, "repo update did not run");
            sink.log(e.to_string());
            Completion::failed(e.exit_code(), "Error updating repositories")
        }
    }
}
