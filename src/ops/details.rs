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

//! Package details: definition metadata, reverse dependencies and files.

use serde::Deserialize;
use serde_yml::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::Backend;
use crate::luet::{PackageEntry, SearchResponse};
use crate::runner::{CommandOutput, CommandSpec};

/// A dependency as written in `definition.yaml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Requirement {
    pub category: String,
    pub name: String,
    pub version: String,
}

/// The parts of a package `definition.yaml` worth showing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub description: Option<String>,
    pub license: Option<String>,
    pub uri: Vec<String>,
    pub labels: BTreeMap<String, Value>,
    pub requires: Vec<Requirement>,
}

impl Definition {
    pub fn parse(yaml: &str) -> Option<Self> {
        match serde_yml::from_str(yaml) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(error = %e, "unreadable definition.yaml");
                None
            }
        }
    }
}

/// Where luet keeps a synced package definition
pub fn definition_path(backend: &Backend, repository: &str, category: &str, name: &str, version: &str) -> PathBuf {
    backend
        .config
        .paths
        .repos_dir
        .join(repository)
        .join("treefs")
        .join(category)
        .join(name)
        .join(version)
        .join("definition.yaml")
}

/// Read a package definition. The repository tree is root-only, so it is
/// read through `cat` under elevation.
pub async fn definition(
    backend: &Backend,
    repository: &str,
    category: &str,
    name: &str,
    version: &str,
) -> Option<Definition> {
    let path = definition_path(backend, repository, category, name, version);
    let spec = CommandSpec::new("cat", [path.to_string_lossy().into_owned()]).root();

    match backend.exec.run(&spec).await {
        Ok(out) if out.success() => Definition::parse(&out.stdout),
        Ok(out) => {
            debug!(path = %path.display(), code = out.code, "no definition");
            None
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "definition not read");
            None
        }
    }
}

fn parse_packages(out: &CommandOutput, what: &str) -> Option<SearchResponse> {
    if !out.success() {
        warn!(code = out.code, stderr = %out.stderr.trim(), "{} lookup failed", what);
        return None;
    }
    let body = out.stdout.trim();
    let body = if body.is_empty() { "{}" } else { body };
    match serde_json::from_str(body) {
        Ok(resp) => Some(resp),
        Err(e) => {
            warn!(error = %e, "{} lookup returned invalid JSON", what);
            None
        }
    }
}

/// Installed packages depending on `full_name`, sorted. `None` on failure.
pub async fn required_by(backend: &Backend, full_name: &str) -> Option<Vec<String>> {
    let out = backend.exec.run(&backend.luet.revdeps(full_name)).await.ok()?;
    let resp = parse_packages(&out, "revdeps")?;

    let mut names: Vec<String> = resp
        .packages
        .unwrap_or_default()
        .iter()
        .map(|p| p.full_name())
        .collect();
    names.sort();
    Some(names)
}

/// Files owned by `full_name`, sorted. `None` on failure.
pub async fn files(backend: &Backend, full_name: &str) -> Option<Vec<String>> {
    let out = backend.exec.run(&backend.luet.package_files(full_name)).await.ok()?;
    let resp = parse_packages(&out, "files")?;

    let mut files = resp
        .packages
        .unwrap_or_default()
        .into_iter()
        .next()
        .map(|p| p.files)
        .unwrap_or_default();
    files.sort();
    Some(files)
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Text block for the details popup and `luet-pm info`
pub fn format_details(definition: Option<&Definition>, entry: &PackageEntry) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Package: {}", entry.full_name());
    let _ = writeln!(text, "Version: {}", entry.version);
    let _ = writeln!(text, "Repository: {}", entry.repository);
    let _ = writeln!(text, "Installed: {}", if entry.installed { "Yes" } else { "No" });

    let Some(def) = definition else {
        text.push_str("\nNo definition available for this package.");
        return text;
    };

    if let Some(description) = def.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = write!(text, "\nDescription: {}\n", description.trim());
    }
    if let Some(license) = def.license.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(text, "License: {}", license);
    }
    for uri in &def.uri {
        let _ = writeln!(text, "Homepage: {}", uri);
    }

    if !def.labels.is_empty() {
        text.push_str("\nLabels:\n");
        for (key, value) in &def.labels {
            let _ = writeln!(text, "  {}: {}", key, scalar(value));
        }
    }

    if !def.requires.is_empty() {
        text.push_str("\nRequires:\n");
        for req in &def.requires {
            if req.version.is_empty() {
                let _ = writeln!(text, "  {}/{}", req.category, req.name);
            } else {
                let _ = writeln!(text, "  {}/{} {}", req.category, req.name, req.version);
            }
        }
    }

    text.trim_end().to_string()
}

/// Fetch the definition of `entry` and render it
pub async fn details_text(backend: &Backend, entry: &PackageEntry) -> String {
    let def = definition(backend, &entry.repository, &entry.category, &entry.name, &entry.version).await;
    format_details(def.as_ref(), entry)
}
