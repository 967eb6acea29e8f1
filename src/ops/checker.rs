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

//! System integrity check and repair.
//!
//! `luet oscheck` lists installed packages with missing files. Every package
//! it names is reinstalled in turn.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use super::{Backend, Completion, OpSink};
use crate::runner::CommandOutput;

pub const CLEAN_MESSAGE: &str = "No missing files found";
pub const REPAIRED_MESSAGE: &str = "System repair finished successfully.";
pub const REPAIR_INCOMPLETE_MESSAGE: &str = "Could not repair some packages";

fn package_id_regex() -> &'static Regex {
    static PKG_ID: OnceLock<Regex> = OnceLock::new();
    PKG_ID.get_or_init(|| Regex::new(r"(\S+/\S+)").expect("static regex"))
}

/// Extract `category/name` reinstall targets from oscheck output.
///
/// The first `x/y` token of a line is taken, anything after a `:` dropped,
/// and the last two path segments used. The version suffix is cut at the
/// first `-`. Result is sorted and free of duplicates.
pub fn parse_reinstall_candidates(output: &str) -> Vec<String> {
    let mut candidates = BTreeSet::new();

    for line in output.lines() {
        let Some(m) = package_id_regex().find(line.trim()) else {
            continue;
        };
        let full_id = m.as_str().split(':').next().unwrap_or_default();
        let parts: Vec<&str> = full_id.split('/').collect();
        if parts.len() < 2 {
            continue;
        }
        let category = parts[parts.len() - 2];
        let name = parts[parts.len() - 1].split('-').next().unwrap_or_default();
        candidates.insert(format!("{}/{}", category, name));
    }

    candidates.into_iter().collect()
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

async fn log_result(backend: &Backend, sink: &OpSink, out: &CommandOutput) {
    let full = format!("{}\n", out.combined());
    if !full.trim().is_empty() {
        sink.log(full);
    }
    pause(backend.config.pacing.log()).await;
}

/// Run `luet oscheck` and reinstall every package it reports as missing files
pub async fn check_system(backend: &Backend, sink: &OpSink) -> Completion {
    let pacing = &backend.config.pacing;
    sink.status("Checking system for missing files...");

    let out = match backend.exec.run(&backend.luet.oscheck()).await {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "oscheck did not run");
            sink.log(format!("{}\n", e));
            return Completion::failed(e.exit_code(), "System check failed due to exception");
        }
    };
    log_result(backend, sink, &out).await;

    if !out.success() {
        warn!(code = out.code, "oscheck failed");
        return Completion::failed(out.code, format!("luet oscheck failed with return code {}", out.code));
    }

    let output = out.combined();
    if !output.contains("missing") {
        info!("oscheck clean");
        return Completion::ok(CLEAN_MESSAGE);
    }

    let candidates = parse_reinstall_candidates(&output);
    if candidates.is_empty() {
        return Completion::ok(CLEAN_MESSAGE);
    }

    info!(count = candidates.len(), "repairing packages with missing files");
    sink.log("\n--- Missing packages found. Starting repair sequence. ---\n");
    sink.log(format!("Repair sequence started for {} missing packages.\n", candidates.len()));
    sink.log(format!(
        "Found {} missing packages. Starting repair immediately.\n",
        candidates.len()
    ));
    pause(pacing.repair_start()).await;

    let mut repair_ok = true;
    for pkg in &candidates {
        let status = format!("Reinstalling {}...", pkg);
        sink.status(status.clone());
        sink.log(format!("{}\n", status));
        pause(pacing.before_reinstall()).await;

        let ok = match backend.exec.run(&backend.luet.reinstall(pkg)).await {
            Ok(res) => {
                log_result(backend, sink, &res).await;
                res.success()
            }
            Err(e) => {
                sink.log(format!("{}\n", e));
                false
            }
        };
        pause(pacing.after_reinstall()).await;

        if !ok {
            warn!(package = %pkg, "reinstall failed");
            repair_ok = false;
            sink.log(format!("Failed reinstalling {}\n", pkg));
        }
    }

    if repair_ok {
        sink.log(format!("{}\n", REPAIRED_MESSAGE));
        Completion::ok(REPAIRED_MESSAGE)
    } else {
        sink.log(format!("{}\n", REPAIR_INCOMPLETE_MESSAGE));
        Completion::failed(1, REPAIR_INCOMPLETE_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{backend, drain};
    use crate::runner::testing::ScriptedExecutor;
    use std::sync::Arc;

    #[test]
    fn test_parse_candidates() {
        let output = "\
Checking system...
apps/vlc-3.0.18 missing /usr/bin/vlc
system/zlib-1.2.13:amd64 missing files
   layers/system-x-1.0 missing
apps/vlc-3.0.18 again
no package here
";
        assert_eq!(
            parse_reinstall_candidates(output),
            vec!["apps/vlc", "layers/system", "system/zlib"]
        );
    }

    #[test]
    fn test_parse_takes_first_slash_token() {
        // a file path before the package id wins, as luet's own ordering decides
        assert_eq!(
            parse_reinstall_candidates("missing /usr/bin/vlc from apps/vlc-3.0"),
            vec!["bin/vlc"]
        );
    }

    #[test]
    fn test_parse_uses_last_two_segments() {
        assert_eq!(
            parse_reinstall_candidates("repo/main/apps/foo-1.0 missing"),
            vec!["apps/foo"]
        );
        assert!(parse_reinstall_candidates("").is_empty());
    }

    #[tokio::test]
    async fn test_clean_system() {
        let exec = Arc::new(ScriptedExecutor::new().reply(0, "All good\n", ""));
        let (sink, mut rx) = OpSink::channel();

        let done = check_system(&backend(exec.clone()), &sink).await;

        assert_eq!(done, Completion::ok(CLEAN_MESSAGE));
        assert_eq!(exec.argvs(), ["luet oscheck"]);
        let (logs, _) = drain(&mut rx);
        assert_eq!(logs, ["All good\n\n"]);
    }

    #[tokio::test]
    async fn test_oscheck_failure() {
        let exec = Arc::new(ScriptedExecutor::new().reply(2, "", "permission denied\n"));
        let (sink, _rx) = OpSink::channel();

        let done = check_system(&backend(exec), &sink).await;

        assert!(!done.success);
        assert_eq!(done.code, 2);
        assert_eq!(done.message, "luet oscheck failed with return code 2");
    }

    #[tokio::test]
    async fn test_repair_sequence() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .reply(0, "apps/vlc-3.0 missing /usr/bin/vlc\nsystem/zlib-1.2 missing libz.so\n", "")
                .reply(0, "reinstalled\n", "")
                .reply(1, "", "boom\n"),
        );
        let (sink, mut rx) = OpSink::channel();

        let done = check_system(&backend(exec.clone()), &sink).await;

        assert_eq!(
            exec.argvs(),
            ["luet oscheck", "luet reinstall -y apps/vlc", "luet reinstall -y system/zlib"]
        );
        assert_eq!(done, Completion::failed(1, REPAIR_INCOMPLETE_MESSAGE));

        let (logs, statuses) = drain(&mut rx);
        assert!(logs.contains(&"Repair sequence started for 2 missing packages.\n".to_string()));
        assert!(logs.contains(&"Failed reinstalling system/zlib\n".to_string()));
        assert!(!logs.contains(&"Failed reinstalling apps/vlc\n".to_string()));
        assert_eq!(
            statuses,
            [
                "Checking system for missing files...",
                "Reinstalling apps/vlc...",
                "Reinstalling system/zlib..."
            ]
        );
    }

    #[tokio::test]
    async fn test_repair_all_ok() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .reply(0, "file missing from apps/foo-1\n", "")
                .reply(0, "", ""),
        );
        let (sink, _rx) = OpSink::channel();

        let done = check_system(&backend(exec), &sink).await;

        assert_eq!(done, Completion::ok(REPAIRED_MESSAGE));
    }
}
