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

//! Package cache size and cleanup.

use std::path::Path;
use tracing::{debug, info, warn};

use super::{Backend, Completion, OpSink};
use crate::runner::{CommandExecutor, CommandSpec};

/// `du -sb` of an empty directory tree reports a block or so
const EMPTY_CACHE_BYTES: u64 = 4096;

pub const CLEANUP_OK_MESSAGE: &str = "Luet cache cleared";
pub const CLEANUP_FAILED_MESSAGE: &str = "Error clearing Luet cache";

/// What the menu needs to know about the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub has_cache: bool,
    pub size_human: Option<String>,
    pub menu_label: String,
}

impl CacheInfo {
    fn from_size(size_human: Option<String>) -> Self {
        let menu_label = match &size_human {
            Some(size) => format!("Clear Luet cache ({})", size),
            None => "Clear Luet cache".to_string(),
        };
        Self {
            has_cache: size_human.is_some(),
            size_human,
            menu_label,
        }
    }

    /// Confirmation prompt for the CLI; the size keeps du's unit case
    pub fn cleanup_question(&self) -> String {
        match &self.size_human {
            Some(size) => format!("clear Luet cache ({})?", size),
            None => "clear Luet cache?".to_string(),
        }
    }
}

impl Default for CacheInfo {
    fn default() -> Self {
        Self::from_size(None)
    }
}

fn first_field(stdout: &str) -> Option<&str> {
    stdout.split_whitespace().next().filter(|s| !s.is_empty())
}

/// Size of `dir` in bytes as reported by `du -sb`
pub async fn cache_size_bytes(exec: &dyn CommandExecutor, dir: &Path) -> Option<u64> {
    let spec = CommandSpec::new("du", ["-sb".to_string(), dir.to_string_lossy().into_owned()]);
    let out = match exec.run(&spec).await {
        Ok(out) if out.success() => out,
        Ok(out) => {
            debug!(code = out.code, "du -sb failed");
            return None;
        }
        Err(e) => {
            debug!(error = %e, "du -sb did not run");
            return None;
        }
    };
    first_field(&out.stdout)?.parse().ok()
}

/// Human readable size, or `None` when the cache is effectively empty
pub async fn cache_size_human(exec: &dyn CommandExecutor, bytes: Option<u64>, dir: &Path) -> Option<String> {
    let bytes = bytes.filter(|b| *b > EMPTY_CACHE_BYTES)?;
    let spec = CommandSpec::new("du", ["-hs".to_string(), dir.to_string_lossy().into_owned()]);
    match exec.run(&spec).await {
        Ok(out) if out.success() => Some(
            first_field(&out.stdout)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}B", bytes)),
        ),
        _ => Some(format!("{}B", bytes)),
    }
}

pub async fn cache_info(backend: &Backend) -> CacheInfo {
    let dir = &backend.config.paths.cache_dir;
    let bytes = cache_size_bytes(backend.exec.as_ref(), dir).await;
    let size = cache_size_human(backend.exec.as_ref(), bytes, dir).await;
    CacheInfo::from_size(size)
}

/// `luet cleanup`, streaming its output to the log
pub async fn cleanup(backend: &Backend, sink: &OpSink) -> Completion {
    sink.status("Clearing Luet cache...");
    sink.log("--- Running 'luet cleanup' ---\n");

    let result = backend
        .exec
        .stream(&backend.luet.cleanup(), &mut |line| sink.log(line))
        .await;

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            warn!(error = %e, "cleanup did not run");
            sink.log(e.to_string());
            e.exit_code()
        }
    };

    if code == 0 {
        info!("cache cleared");
        sink.log("Luet cache cleanup finished successfully.\n");
        Completion::ok(CLEANUP_OK_MESSAGE)
    } else {
        warn!(code, "cleanup failed");
        sink.log("Luet cache cleanup finished with errors.\n");
        Completion::failed(code, CLEANUP_FAILED_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{backend, drain};
    use crate::runner::testing::ScriptedExecutor;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cache_info_with_content() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .reply(0, "1048576\t/var/luet/db/packages/\n", "")
                .reply(0, "1.0M\t/var/luet/db/packages/\n", ""),
        );

        let info = cache_info(&backend(exec.clone())).await;

        assert_eq!(
            info,
            CacheInfo {
                has_cache: true,
                size_human: Some("1.0M".into()),
                menu_label: "Clear Luet cache (1.0M)".into(),
            }
        );
        assert_eq!(
            exec.argvs(),
            ["du -sb /var/luet/db/packages/", "du -hs /var/luet/db/packages/"]
        );
    }

    #[test]
    fn test_cleanup_question_keeps_size_unit() {
        assert_eq!(
            CacheInfo::from_size(Some("1.0M".into())).cleanup_question(),
            "clear Luet cache (1.0M)?"
        );
        assert_eq!(CacheInfo::default().cleanup_question(), "clear Luet cache?");
    }

    #[tokio::test]
    async fn test_small_cache_counts_as_empty() {
        let exec = Arc::new(ScriptedExecutor::new().reply(0, "4096\t/x\n", ""));

        let info = cache_info(&backend(exec.clone())).await;

        assert!(!info.has_cache);
        assert_eq!(info.menu_label, "Clear Luet cache");
        assert_eq!(exec.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_du_failures() {
        let dir = PathBuf::from("/missing");
        let exec = ScriptedExecutor::new().reply(1, "", "No such file\n").reply(0, "garbage\n", "");
        assert_eq!(cache_size_bytes(&exec, &dir).await, None);
        assert_eq!(cache_size_bytes(&exec, &dir).await, None);

        let exec = ScriptedExecutor::new().reply(1, "", "");
        assert_eq!(cache_size_human(&exec, Some(9000), &dir).await.as_deref(), Some("9000B"));
    }

    #[tokio::test]
    async fn test_cleanup_messages() {
        let exec = Arc::new(ScriptedExecutor::new().reply(0, "cleaned 12 packages\n", "").reply(2, "", ""));
        let backend = backend(exec.clone());

        let (sink, mut rx) = OpSink::channel();
        assert_eq!(cleanup(&backend, &sink).await, Completion::ok(CLEANUP_OK_MESSAGE));
        let (logs, _) = drain(&mut rx);
        assert_eq!(logs.last().unwrap(), "Luet cache cleanup finished successfully.\n");

        assert_eq!(cleanup(&backend, &sink).await, Completion::failed(2, CLEANUP_FAILED_MESSAGE));
        let (logs, _) = drain(&mut rx);
        assert_eq!(logs.last().unwrap(), "Luet cache cleanup finished with errors.\n");
        assert_eq!(exec.argvs(), ["luet cleanup", "luet cleanup"]);
    }
}
