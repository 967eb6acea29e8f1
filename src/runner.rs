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

//! Subprocess execution with privilege elevation.
//!
//! Everything luet-pm does ends up here: an argv is built by [`crate::luet`],
//! optionally prefixed with `pkexec`/`sudo`, and either captured in full
//! ([`CommandExecutor::run`]) or streamed line by line
//! ([`CommandExecutor::stream`]).

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{LuetError, LuetResult};

/// How root privileges are obtained for commands that need them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Already running as root
    Root,
    Pkexec,
    Sudo { non_interactive: bool },
    /// Not root and no helper available
    Unavailable,
}

impl Elevation {
    /// Pick an elevation helper.
    ///
    /// `preference` is one of `auto`, `pkexec`, `sudo`, `none`. With
    /// `interactive == false` sudo runs with `-n` so it fails instead of
    /// prompting on a terminal owned by the TUI.
    pub fn detect(preference: &str, interactive: bool) -> Self {
        if is_root() {
            return Elevation::Root;
        }
        Self::choose(preference, interactive, |bin| which::which(bin).is_ok())
    }

    fn choose(preference: &str, interactive: bool, available: impl Fn(&str) -> bool) -> Self {
        let sudo = Elevation::Sudo {
            non_interactive: !interactive,
        };
        match preference {
            "none" => Elevation::Unavailable,
            "pkexec" if available("pkexec") => Elevation::Pkexec,
            "sudo" if available("sudo") => sudo,
            "pkexec" | "sudo" => Elevation::Unavailable,
            _ => {
                if available("pkexec") {
                    Elevation::Pkexec
                } else if available("sudo") {
                    sudo
                } else {
                    Elevation::Unavailable
                }
            }
        }
    }

    /// Argv prefix for a root command, `None` when root cannot be obtained
    pub fn prefix(&self) -> Option<Vec<String>> {
        match self {
            Elevation::Root => Some(Vec::new()),
            Elevation::Pkexec => Some(vec!["pkexec".to_string()]),
            Elevation::Sudo { non_interactive: true } => Some(vec!["sudo".to_string(), "-n".to_string()]),
            Elevation::Sudo { non_interactive: false } => Some(vec!["sudo".to_string()]),
            Elevation::Unavailable => None,
        }
    }
}

/// True when the effective uid is 0
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub require_root: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            require_root: false,
        }
    }

    /// Mark the command as needing root
    pub fn root(mut self) -> Self {
        self.require_root = true;
        self
    }

    /// Unprefixed argv
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn display(&self) -> String {
        self.argv().join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout followed by stderr, the way the system check reads it
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Something that can run [`CommandSpec`]s.
///
/// The real implementation is [`CommandRunner`]; tests script the responses.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, capturing stdout and stderr separately
    async fn run(&self, spec: &CommandSpec) -> LuetResult<CommandOutput>;

    /// Run to completion, handing every stdout/stderr line to `on_line` as it
    /// arrives. Returns the exit code; `-1` means the command never ran.
    async fn stream(&self, spec: &CommandSpec, on_line: &mut (dyn FnMut(String) + Send)) -> LuetResult<i32>;
}

/// Runs commands through tokio with the configured elevation helper
#[derive(Debug, Clone)]
pub struct CommandRunner {
    elevation: Elevation,
}

impl CommandRunner {
    pub fn new(elevation: Elevation) -> Self {
        Self { elevation }
    }

    pub fn elevation(&self) -> Elevation {
        self.elevation
    }

    /// Argv that will actually be executed
    pub fn final_argv(&self, spec: &CommandSpec) -> LuetResult<Vec<String>> {
        if !spec.require_root {
            return Ok(spec.argv());
        }
        let mut argv = self.elevation.prefix().ok_or(LuetError::ElevationUnavailable)?;
        argv.extend(spec.argv());
        Ok(argv)
    }
}

#[async_trait]
impl CommandExecutor for CommandRunner {
    async fn run(&self, spec: &CommandSpec) -> LuetResult<CommandOutput> {
        let argv = self.final_argv(spec)?;
        debug!(command = %argv.join(" "), "running");

        match Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => Ok(CommandOutput {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            // A missing binary is reported like a failed run so callers can
            // show stderr without a separate error path.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(command = %argv[0], "command not found");
                Ok(CommandOutput {
                    code: 1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
            Err(e) => Err(LuetError::spawn(&argv, e)),
        }
    }

    async fn stream(&self, spec: &CommandSpec, on_line: &mut (dyn FnMut(String) + Send)) -> LuetResult<i32> {
        let argv = match self.final_argv(spec) {
            Ok(argv) => argv,
            Err(e) => {
                warn!(command = %spec.display(), "cannot elevate");
                on_line(format!("{}\n", e));
                return Ok(-1);
            }
        };
        debug!(command = %argv.join(" "), "streaming");

        let mut child = match Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %argv.join(" "), error = %e, "spawn failed");
                on_line(format!("\nError executing command: {}\n", e));
                return Ok(-1);
            }
        };

        // stderr is merged into the same stream, like `2>&1`
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
        }
        drop(tx);

        while let Some(line) = rx.recv().await {
            on_line(strip_log_prefix(&line));
        }
        for reader in readers {
            let _ = reader.await;
        }

        let status = child.wait().await.map_err(|e| LuetError::spawn(&argv, e))?;
        let code = status.code().unwrap_or(-1);
        debug!(command = %argv.join(" "), code, "finished");
        Ok(code)
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches('\n').trim_end_matches('\r');
                // keep draining after the receiver is gone so the child never sees EPIPE
                let _ = tx.send(line.to_string());
            }
            Err(e) => {
                warn!(error = %e, "output pipe read failed");
                break;
            }
        }
    }
}

fn ansi_regex() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex"))
}

/// Remove colour codes and luet's leading level tag from an output line.
///
/// luet prefixes lines with ` INFO `, ` WARN ` or ` ERROR `; the tag is cut
/// but the separating space is kept.
pub fn strip_log_prefix(line: &str) -> String {
    let clean = ansi_regex().replace_all(line, "");
    let clean = clean.as_ref();
    if clean.starts_with(" INFO ") || clean.starts_with(" WARN ") {
        clean[5..].to_string()
    } else if clean.starts_with(" ERROR ") {
        clean[6..].to_string()
    } else {
        clean.to_string()
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted executor for driving the operations without a real luet.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies to commands in order and records what it was asked to run
    #[derive(Default)]
    pub struct ScriptedExecutor {
        replies: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, code: i32, stdout: &str, stderr: &str) -> Self {
            self.replies.lock().unwrap().push_back(CommandOutput {
                code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            });
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn argvs(&self) -> Vec<String> {
            self.calls().iter().map(|c| c.display()).collect()
        }

        fn next(&self, spec: &CommandSpec) -> CommandOutput {
            self.calls.lock().unwrap().push(spec.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted reply for {}", spec.display()))
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn run(&self, spec: &CommandSpec) -> LuetResult<CommandOutput> {
            Ok(self.next(spec))
        }

        async fn stream(&self, spec: &CommandSpec, on_line: &mut (dyn FnMut(String) + Send)) -> LuetResult<i32> {
            let out = self.next(spec);
            for line in out.combined().lines() {
                on_line(strip_log_prefix(line));
            }
            Ok(out.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_log_prefix() {
        assert_eq!(strip_log_prefix(" INFO Downloading"), " Downloading");
        assert_eq!(strip_log_prefix(" WARN careful"), " careful");
        assert_eq!(strip_log_prefix(" ERROR broken"), " broken");
        assert_eq!(strip_log_prefix("plain line"), "plain line");
        assert_eq!(strip_log_prefix("INFO no leading space"), "INFO no leading space");
    }

    #[test]
    fn test_strip_log_prefix_removes_colour() {
        assert_eq!(strip_log_prefix("\x1b[32m INFO\x1b[0m done"), " done");
    }

    #[test]
    fn test_elevation_choice() {
        let all = |_: &str| true;
        let only_sudo = |b: &str| b == "sudo";
        let nothing = |_: &str| false;

        assert_eq!(Elevation::choose("auto", false, all), Elevation::Pkexec);
        assert_eq!(
            Elevation::choose("auto", false, only_sudo),
            Elevation::Sudo { non_interactive: true }
        );
        assert_eq!(
            Elevation::choose("sudo", true, all),
            Elevation::Sudo { non_interactive: false }
        );
        assert_eq!(Elevation::choose("pkexec", true, only_sudo), Elevation::Unavailable);
        assert_eq!(Elevation::choose("auto", true, nothing), Elevation::Unavailable);
        assert_eq!(Elevation::choose("none", true, all), Elevation::Unavailable);
    }

    #[test]
    fn test_final_argv() {
        let spec = CommandSpec::new("luet", ["repo", "update"]).root();

        let runner = CommandRunner::new(Elevation::Sudo { non_interactive: true });
        assert_eq!(runner.final_argv(&spec).unwrap(), ["sudo", "-n", "luet", "repo", "update"]);

        let runner = CommandRunner::new(Elevation::Root);
        assert_eq!(runner.final_argv(&spec).unwrap(), ["luet", "repo", "update"]);

        let runner = CommandRunner::new(Elevation::Unavailable);
        assert!(matches!(runner.final_argv(&spec), Err(LuetError::ElevationUnavailable)));

        let plain = CommandSpec::new("du", ["-sb", "/tmp"]);
        assert_eq!(runner.final_argv(&plain).unwrap(), ["du", "-sb", "/tmp"]);
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let out = runner
            .run(&CommandSpec::new("sh", ["-c", "echo out; echo err >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_run_missing_binary_is_failed_output() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let out = runner
            .run(&CommandSpec::new("luet-pm-definitely-missing-binary", Vec::<String>::new()))
            .await
            .unwrap();
        assert_eq!(out.code, 1);
        assert!(out.stdout.is_empty());
        assert!(!out.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_stream_merges_and_strips() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let mut lines = Vec::new();
        let code = runner
            .stream(
                &CommandSpec::new("sh", ["-c", "echo ' INFO hello'; echo ' ERROR bad' >&2"]),
                &mut |l| lines.push(l),
            )
            .await
            .unwrap();
        assert_eq!(code, 0);
        lines.sort();
        assert_eq!(lines, vec![" bad".to_string(), " hello".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_survives_invalid_utf8() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let mut lines = Vec::new();
        let code = runner
            .stream(
                &CommandSpec::new(
                    "sh",
                    ["-c", "echo before; printf 'caf\\351\\r\\n'; echo; echo after; seq 1 20000; echo done"],
                ),
                &mut |l| lines.push(l),
            )
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(lines[0], "before");
        assert_eq!(lines[1], "caf\u{FFFD}");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "after");
        assert_eq!(lines.len(), 20005);
        assert_eq!(lines.last().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_stream_without_elevation_does_not_spawn() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let mut lines = Vec::new();
        let code = runner
            .stream(&CommandSpec::new("luet", ["upgrade", "-y"]).root(), &mut |l| lines.push(l))
            .await
            .unwrap();
        assert_eq!(code, -1);
        assert_eq!(lines, vec!["No elevation helper available\n".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_spawn_failure() {
        let runner = CommandRunner::new(Elevation::Unavailable);
        let mut lines = Vec::new();
        let code = runner
            .stream(
                &CommandSpec::new("luet-pm-definitely-missing-binary", Vec::<String>::new()),
                &mut |l| lines.push(l),
            )
            .await
            .unwrap();
        assert_eq!(code, -1);
        assert!(lines[0].starts_with("\nError executing command:"));
    }
}
