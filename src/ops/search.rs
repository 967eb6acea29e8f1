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

//! Package search.

use tracing::{debug, warn};

use super::Backend;
use crate::filter;
use crate::luet::{PackageEntry, RawPackage, SearchMode, SearchResponse};

pub const SEARCH_FAILED_MESSAGE: &str = "Error executing the search command";
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Packages(Vec<PackageEntry>),
    Error(String),
}

impl SearchOutcome {
    /// Status line after a search, `None` for errors which set their own
    pub fn summary(&self, query: &str) -> Option<String> {
        match self {
            SearchOutcome::Packages(p) => Some(format!("Found {} results matching '{}'", p.len(), query)),
            SearchOutcome::Error(_) => None,
        }
    }
}

/// Run `luet search` and return the raw package list
pub async fn run_search(backend: &Backend, query: &str, mode: SearchMode) -> Result<Vec<RawPackage>, String> {
    let out = match backend.exec.run(&backend.luet.search(query, mode)).await {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "search did not run");
            return Err(SEARCH_FAILED_MESSAGE.to_string());
        }
    };

    if !out.success() {
        warn!(code = out.code, stderr = %out.stderr.trim(), "search failed");
        return Err(SEARCH_FAILED_MESSAGE.to_string());
    }

    let stdout = out.stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<SearchResponse>(stdout) {
        Ok(resp) => Ok(resp.packages.unwrap_or_default()),
        Err(e) => {
            warn!(error = %e, "search returned invalid JSON");
            Err(INVALID_JSON_MESSAGE.to_string())
        }
    }
}

/// Drop hidden packages and mark protected ones
pub fn enrich(raw: Vec<RawPackage>) -> Vec<PackageEntry> {
    raw.into_iter()
        .filter(|p| {
            let hidden = filter::is_hidden(&p.category, &p.name);
            if hidden {
                let reason = filter::hidden_reason(&p.category, &p.name).unwrap_or("entity package");
                debug!(package = %p.full_name(), reason, "hidden from results");
            }
            !hidden
        })
        .map(PackageEntry::from)
        .collect()
}

pub async fn search(backend: &Backend, query: &str, mode: SearchMode) -> SearchOutcome {
    match run_search(backend, query, mode).await {
        Ok(raw) => SearchOutcome::Packages(enrich(raw)),
        Err(message) => SearchOutcome::Error(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::backend;
    use crate::runner::testing::ScriptedExecutor;
    use std::sync::Arc;

    const RESULTS: &str = r#"{"packages": [
        {"category": "apps", "name": "vlc", "version": "3.0.18", "repository": "luet", "installed": true},
        {"category": "entity", "name": "root-user", "version": "0.1", "repository": "luet"},
        {"category": "apps", "name": "grub", "version": "2.06", "repository": "luet", "installed": true},
        {"category": "repository", "name": "mocaccino-extra", "version": "1", "repository": "luet"}
    ]}"#;

    #[tokio::test]
    async fn test_search_filters_and_marks() {
        let exec = Arc::new(ScriptedExecutor::new().reply(0, RESULTS, ""));

        let outcome = search(&backend(exec.clone()), "v.c", SearchMode::Name).await;

        assert_eq!(exec.argvs(), [r"luet search -o json -q v\.c"]);
        let SearchOutcome::Packages(entries) = outcome else {
            panic!("expected packages");
        };
        let names: Vec<_> = entries.iter().map(|e| e.full_name()).collect();
        assert!(names.contains(&"apps/vlc".to_string()));
        assert!(!names.contains(&"entity/root-user".to_string()));
        let grub = entries.iter().find(|e| e.name == "grub").unwrap();
        assert!(grub.protected);
    }

    #[tokio::test]
    async fn test_empty_and_null() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .reply(0, "  \n", "")
                .reply(0, r#"{"packages": null}"#, ""),
        );
        let backend = backend(exec);

        assert_eq!(search(&backend, "x", SearchMode::Name).await, SearchOutcome::Packages(vec![]));
        assert_eq!(search(&backend, "x", SearchMode::Name).await, SearchOutcome::Packages(vec![]));
    }

    #[tokio::test]
    async fn test_errors() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .reply(1, "", "bad regex\n")
                .reply(0, "not json", ""),
        );
        let backend = backend(exec);

        assert_eq!(
            search(&backend, "x", SearchMode::Label).await,
            SearchOutcome::Error(SEARCH_FAILED_MESSAGE.into())
        );
        assert_eq!(
            search(&backend, "x", SearchMode::Name).await,
            SearchOutcome::Error(INVALID_JSON_MESSAGE.into())
        );
    }

    #[test]
    fn test_summary() {
        let outcome = SearchOutcome::Packages(vec![]);
        assert_eq!(outcome.summary("vlc").unwrap(), "Found 0 results matching 'vlc'");
        assert!(SearchOutcome::Error("x".into()).summary("vlc").is_none());
    }
}
