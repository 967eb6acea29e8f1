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

//! Installing and removing single packages.

use tracing::{info, warn};

use super::{refresh_desktop_cache, Backend, Completion, OpSink};
use crate::luet::{wants_full_uninstall, PackageEntry};
use crate::runner::CommandSpec;

async fn stream_to_log(backend: &Backend, sink: &OpSink, spec: &CommandSpec) -> (i32, String) {
    let mut output = String::new();
    let result = backend
        .exec
        .stream(spec, &mut |line| {
            output.push_str(&line);
            output.push('\n');
            sink.log(line);
        })
        .await;

    match result {
        Ok(code) => (code, output),
        Err(e) => {
            warn!(error = %e, command = %spec.display(), "package command did not run");
            sink.log(e.to_string());
            (e.exit_code(), output)
        }
    }
}

fn refuse_protected(entry: &PackageEntry, sink: &OpSink) -> Option<Completion> {
    if !entry.protected {
        return None;
    }
    let message = entry.protection_message();
    warn!(package = %entry.full_name(), "refusing to touch protected package");
    sink.log(format!("{}\n", message));
    Some(Completion::failed(-1, message))
}

pub async fn install(backend: &Backend, entry: &PackageEntry, sink: &OpSink) -> Completion {
    if let Some(refused) = refuse_protected(entry, sink) {
        return refused;
    }
    let full_name = entry.full_name();

    sink.status(format!("Installing {}...", full_name));
    sink.log(format!("Install {} initiated.\n", full_name));

    let (code, _) = stream_to_log(backend, sink, &backend.luet.install(&full_name)).await;
    if code != 0 {
        warn!(package = %full_name, code, "install failed");
        sink.log("Install failed.\n");
        return Completion::failed(code, format!("Error installing: '{}'", full_name));
    }

    info!(package = %full_name, "installed");
    sink.log("Install completed successfully.\n");
    refresh_desktop_cache(backend).await;
    Completion::ok("Install completed successfully.")
}

/// `luet` had nothing to remove under the full solver
fn nothing_to_do(output: &str) -> bool {
    output.to_lowercase().contains("nothing to do")
}

pub async fn uninstall(backend: &Backend, entry: &PackageEntry, sink: &OpSink) -> Completion {
    if let Some(refused) = refuse_protected(entry, sink) {
        return refused;
    }
    let full_name = entry.full_name();

    sink.status(format!("Uninstalling {}...", full_name));
    sink.log(format!("Uninstall {} initiated.\n", full_name));

    let full = wants_full_uninstall(&entry.category);
    let (mut code, output) = stream_to_log(backend, sink, &backend.luet.uninstall(&full_name, full)).await;

    if full && (code != 0 || nothing_to_do(&output)) {
        info!(package = %full_name, code, "full uninstall did nothing, retrying plain");
        let note = format!("Falling back: uninstalling {} without revdep cleanup...", full_name);
        sink.status(note.clone());
        sink.log(format!("{}\n", note));
        code = stream_to_log(backend, sink, &backend.luet.uninstall(&full_name, false)).await.0;
    }

    if code != 0 {
        warn!(package = %full_name, code, "uninstall failed");
        sink.log(format!("Uninstall failed for {}.\n", full_name));
        return Completion::failed(code, format!("Error uninstalling: '{}'", full_name));
    }

    info!(package = %full_name, "uninstalled");
    sink.log("Uninstall completed successfully.\n");
    refresh_desktop_cache(backend).await;
    Completion::ok("Uninstall completed successfully.")
}
