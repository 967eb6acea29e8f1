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

//! Packages that are never shown or never removed.

const PROTECTED_PACKAGE: &str = "This package is protected and can't be removed";
const PROTECTED_LAYER: &str = "This layer is protected and can't be removed";

const DEVEL_REPO: &str = "Devel repository";
const CRUCIAL_REPO: &str = "This repository is crucial and can't be removed";
const STABLE_REPO: &str = "Stable repository can't be removed";
const OLD_REPO: &str = "Old repository, not in use anymore";

/// Packages whose removal is refused, keyed by `category/name`
pub const PROTECTED: &[(&str, &str)] = &[
    ("apps/grub", PROTECTED_PACKAGE),
    ("system/luet", PROTECTED_PACKAGE),
    ("layers/system-x", PROTECTED_LAYER),
    ("layers/sys-fs", PROTECTED_LAYER),
    ("layers/X", PROTECTED_LAYER),
];

/// Packages dropped from search results, keyed by `category/name`
pub const HIDDEN: &[(&str, &str)] = &[
    ("repository/mocaccino-desktop", DEVEL_REPO),
    ("repository/mocaccino-os-commons", DEVEL_REPO),
    ("repository/mocaccino-extra", DEVEL_REPO),
    ("repository/mocaccino-community", DEVEL_REPO),
    ("repository/luet", CRUCIAL_REPO),
    ("repository/mocaccino-repository-index", CRUCIAL_REPO),
    ("repository/mocaccino-desktop-stable", STABLE_REPO),
    ("repository/mocaccino-os-commons-stable", STABLE_REPO),
    ("repository/mocaccino-extra-stable", STABLE_REPO),
    ("repository/livecd", "This repository should be hidden"),
    ("repository/mocaccino-stage3", OLD_REPO),
    ("repository/mocaccino-portage", OLD_REPO),
    ("repository/mocaccino-portage-stable", OLD_REPO),
    ("repository/mocaccino-kernel", OLD_REPO),
    ("repository/mocaccino-kernel-stable", OLD_REPO),
    ("repository/mocaccino-extra-arm", OLD_REPO),
    ("repository/mocaccino-musl-universe", "Hide musl repo"),
    ("repository/mocaccino-musl-universe-stable", "Hide musl repo"),
    ("repository/mocaccino-micro", "Hide micro repo"),
    ("repository/mocaccino-micro-stable", "Hide micro repo"),
    ("repo-updater/mocaccino-micro-stable", "Hide micro repo-updater"),
    ("repo-updater/mocaccino-desktop-stable", "Hide desktop repo-updater"),
    ("repo-updater/mocaccino-community-stable", "Hide desktop repo-updater"),
    ("kernel-5.9/debian-full", OLD_REPO),
];

/// Category whose packages are always hidden
const ENTITY_CATEGORY: &str = "entity";

fn lookup(table: &[(&str, &'static str)], category: &str, name: &str) -> Option<&'static str> {
    let key = format!("{}/{}", category, name);
    table.iter().find(|(k, _)| *k == key).map(|(_, msg)| *msg)
}

/// Whether a package must be left out of search results
pub fn is_hidden(category: &str, name: &str) -> bool {
    category == ENTITY_CATEGORY || lookup(HIDDEN, category, name).is_some()
}

/// Why a package is hidden, if it is listed
pub fn hidden_reason(category: &str, name: &str) -> Option<&'static str> {
    lookup(HIDDEN, category, name)
}

pub fn is_protected(category: &str, name: &str) -> bool {
    lookup(PROTECTED, category, name).is_some()
}

pub fn protection_message(category: &str, name: &str) -> Option<&'static str> {
    lookup(PROTECTED, category, name)
}

/// Message for a package flagged protected without a table entry
pub fn protected_fallback_message(full_name: &str) -> String {
    format!("This package ({}) is protected and can't be removed.", full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_category_always_hidden() {
        assert!(is_hidden("entity", "anything"));
        assert_eq!(hidden_reason("entity", "anything"), None);
    }

    #[test]
    fn test_hidden_table() {
        assert_eq!(HIDDEN.len(), 24);
        assert!(is_hidden("repository", "livecd"));
        assert!(is_hidden("kernel-5.9", "debian-full"));
        assert_eq!(hidden_reason("repository", "luet"), Some(CRUCIAL_REPO));
        assert!(!is_hidden("apps", "firefox"));
        assert!(!is_hidden("repository", "mocaccino-desktop-unstable"));
    }

    #[test]
    fn test_protected_table() {
        assert!(is_protected("apps", "grub"));
        assert!(is_protected("layers", "X"));
        assert!(!is_protected("layers", "x"));
        assert_eq!(protection_message("layers", "sys-fs"), Some(PROTECTED_LAYER));
        assert_eq!(protection_message("system", "luet"), Some(PROTECTED_PACKAGE));
        assert_eq!(protection_message("apps", "vim"), None);
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(
            protected_fallback_message("apps/foo"),
            "This package (apps/foo) is protected and can't be removed."
        );
    }
}
