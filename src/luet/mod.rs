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

//! The luet command-line contract.
//!
//! Every luet invocation luet-pm makes is built here so the argument order
//! lives in one place.

pub mod model;

use crate::runner::CommandSpec;

pub use model::{PackageAction, PackageEntry, RawPackage, SearchResponse};

/// Marker luet prints when a repo-updater package replaced repository
/// definitions mid-upgrade
pub const REPO_UPDATER_FINALIZER: &str = "Executing finalizer for repo-updater/";

/// How the search query is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Match against package names; the query is taken literally
    #[default]
    Name,
    /// Match package labels with the query as a regular expression
    Label,
}

/// Builds argument vectors for a given luet binary
#[derive(Debug, Clone)]
pub struct Luet {
    bin: String,
}

impl Default for Luet {
    fn default() -> Self {
        Self::new("luet")
    }
}

impl Luet {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn cmd<const N: usize>(&self, args: [&str; N]) -> CommandSpec {
        CommandSpec::new(self.bin.clone(), args)
    }

    /// JSON search. Name queries are regex-escaped because luet compiles them
    /// with Go's regexp and a stray `\` makes it bail out.
    pub fn search(&self, query: &str, mode: SearchMode) -> CommandSpec {
        match mode {
            SearchMode::Name => self.cmd(["search", "-o", "json", "-q", &regex::escape(query)]),
            SearchMode::Label => self.cmd(["search", "-o", "json", "--by-label-regex", query]),
        }
        .root()
    }

    /// Installed packages that depend on `full_name`
    pub fn revdeps(&self, full_name: &str) -> CommandSpec {
        self.cmd(["search", "--revdeps", full_name, "-q", "--installed", "-o", "json"])
            .root()
    }

    /// Search for one package including its file list
    pub fn package_files(&self, full_name: &str) -> CommandSpec {
        self.cmd(["search", full_name, "-o", "json"]).root()
    }

    pub fn install(&self, full_name: &str) -> CommandSpec {
        self.cmd(["install", "-y", full_name]).root()
    }

    /// Uninstall; `full_cleanup` also removes now-unneeded dependencies
    pub fn uninstall(&self, full_name: &str, full_cleanup: bool) -> CommandSpec {
        if full_cleanup {
            self.cmd(["uninstall", "-y", full_name, "--full", "--solver-concurrent"])
        } else {
            self.cmd(["uninstall", "-y", full_name])
        }
        .root()
    }

    pub fn reinstall(&self, full_name: &str) -> CommandSpec {
        self.cmd(["reinstall", "-y", full_name]).root()
    }

    pub fn oscheck(&self) -> CommandSpec {
        self.cmd(["oscheck"]).root()
    }

    pub fn repo_update(&self) -> CommandSpec {
        self.cmd(["repo", "update"]).root()
    }

    pub fn upgrade(&self) -> CommandSpec {
        self.cmd(["upgrade", "-y"]).root()
    }

    pub fn cleanup(&self) -> CommandSpec {
        self.cmd(["cleanup"]).root()
    }

    /// Both upgrade steps under a single elevation prompt
    pub fn repo_update_then_upgrade(&self) -> CommandSpec {
        CommandSpec::new(
            "sh",
            ["-c", r#""$0" repo update && "$0" upgrade -y"#, self.bin.as_str()],
        )
        .root()
    }
}

/// Split `category/name` into its parts
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (category, name) = full_name.split_once('/')?;
    if category.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((category, name))
}

/// Uninstalls of desktop applications also clean up their dependencies
pub fn wants_full_uninstall(category: &str) -> bool {
    category == "apps"
}
