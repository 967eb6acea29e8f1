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

//! Shapes of luet's JSON output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter;

/// Top level of `luet search -o json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// luet prints `null` when nothing matched
    #[serde(default)]
    pub packages: Option<Vec<RawPackage>>,
}

/// One package as luet reports it
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPackage {
    pub category: String,
    pub name: String,
    pub version: String,
    pub repository: String,
    pub installed: bool,
    pub files: Vec<String>,
}

impl RawPackage {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

/// A search result ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    pub category: String,
    pub name: String,
    pub version: String,
    pub repository: String,
    pub installed: bool,
    pub protected: bool,
}

impl PackageEntry {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }

    /// What activating this row would do
    pub fn action(&self) -> PackageAction {
        if self.protected {
            PackageAction::Protected
        } else if self.installed {
            PackageAction::Remove
        } else {
            PackageAction::Install
        }
    }

    /// Message shown when removal of a protected entry is attempted
    pub fn protection_message(&self) -> String {
        filter::protection_message(&self.category, &self.name)
            .map(str::to_string)
            .unwrap_or_else(|| filter::protected_fallback_message(&self.full_name()))
    }
}

impl From<RawPackage> for PackageEntry {
    fn from(raw: RawPackage) -> Self {
        let protected = filter::is_protected(&raw.category, &raw.name);
        Self {
            category: raw.category,
            name: raw.name,
            version: raw.version,
            repository: raw.repository,
            installed: raw.installed,
            protected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    Install,
    Remove,
    Protected,
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageAction::Install => write!(f, "Install"),
            PackageAction::Remove => write!(f, "Remove"),
            PackageAction::Protected => write!(f, "Protected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_packages() {
        let resp: SearchResponse = serde_json::from_str(r#"{"packages": null}"#).unwrap();
        assert!(resp.packages.is_none());
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.packages.is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"packages": [{"category": "apps", "name": "vlc", "extra": 1}]}"#).unwrap();
        let pkg = &resp.packages.unwrap()[0];
        assert_eq!(pkg.full_name(), "apps/vlc");
        assert_eq!(pkg.version, "");
        assert!(!pkg.installed);
        assert!(pkg.files.is_empty());
    }

    #[test]
    fn test_entry_action() {
        let mut entry = PackageEntry::from(RawPackage {
            category: "apps".into(),
            name: "grub".into(),
            installed: true,
            ..Default::default()
        });
        assert!(entry.protected);
        assert_eq!(entry.action(), PackageAction::Protected);
        assert_eq!(entry.protection_message(), "This package is protected and can't be removed");

        entry.protected = false;
        assert_eq!(entry.action(), PackageAction::Remove);
        entry.installed = false;
        assert_eq!(entry.action().to_string(), "Install");
    }
}
