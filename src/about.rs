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

//! Program identity shown by `--version` and the About dialog.

pub const NAME: &str = "Luet Package Manager";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WEBSITE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");
pub const LUET_DOCS: &str = "https://luet.io/docs/";

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n",
    "Copyright (C) 2025  luet-pm contributors\n",
    "License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>\n\n",
    "This is free software; you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

/// Body of the About dialog
pub fn about_text() -> String {
    format!(
        "{} {}\n\nA terminal front-end for the luet package manager.\n\nLicense: GPL-3.0-or-later\nWebsite: {}\nSource: {}",
        NAME, VERSION, WEBSITE, REPOSITORY
    )
}

pub fn documentation_text() -> String {
    format!("The luet documentation is available at:\n\n{}", LUET_DOCS)
}
