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

//! TUI application state management.
//!
//! Key presses and operation events mutate [`App`] and may return a
//! [`Request`]; the event loop turns requests into background operations.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::Cell;
use std::collections::VecDeque;
use std::path::PathBuf;

use super::events::{is_interrupt, Action, KeyBindings};
use super::widgets::Spinner;
use crate::about;
use crate::config::Config;
use crate::luet::{PackageAction, PackageEntry};
use crate::ops::cache::CacheInfo;
use crate::ops::sync_info::{self, SyncInfo};
use crate::ops::{OpEvent, OpKind, OpOutcome, SearchOutcome};

pub const READY: &str = "Ready";
pub const MENU_TITLES: [&str; 2] = ["File", "Help"];

/// Visible text rows of the details popup
pub const DETAILS_ROWS: usize = 11;
/// Visible rows of the files / required-by popup
pub const LIST_ROWS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    UpdateRepositories,
    FullUpgrade,
    CheckSystem,
    ClearCache,
    Quit,
    Documentation,
    About,
}

impl MenuItem {
    pub fn items(menu: usize) -> &'static [MenuItem] {
        match menu {
            0 => &[
                MenuItem::UpdateRepositories,
                MenuItem::FullUpgrade,
                MenuItem::CheckSystem,
                MenuItem::ClearCache,
                MenuItem::Quit,
            ],
            _ => &[MenuItem::Documentation, MenuItem::About],
        }
    }

    pub fn label(&self, cache: &CacheInfo) -> String {
        match self {
            MenuItem::UpdateRepositories => "Update repositories".into(),
            MenuItem::FullUpgrade => "Full system upgrade".into(),
            MenuItem::CheckSystem => "Check system".into(),
            MenuItem::ClearCache => cache.menu_label.clone(),
            MenuItem::Quit => "Quit".into(),
            MenuItem::Documentation => "Documentation".into(),
            MenuItem::About => "About".into(),
        }
    }
}

/// Drop-down menu state
#[derive(Debug, Clone, Default)]
pub struct Menu {
    pub open: bool,
    pub active: usize,
    pub selected: usize,
}

impl Menu {
    pub fn current(&self) -> MenuItem {
        let items = MenuItem::items(self.active);
        items[self.selected.min(items.len() - 1)]
    }
}

/// Work the event loop should start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Search(String),
    Details(PackageEntry),
    Install(PackageEntry),
    Uninstall(PackageEntry),
    UpdateRepositories,
    Upgrade,
    Check,
    Cleanup,
    Files(String),
    RequiredBy(String),
    CacheInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Files,
    RequiredBy,
}

impl ListKind {
    pub fn loading_text(&self) -> &'static str {
        match self {
            ListKind::Files => "Loading file list...",
            ListKind::RequiredBy => "Loading required by list...",
        }
    }

    pub fn empty_text(&self) -> &'static str {
        match self {
            ListKind::Files => "No files found or package not installed",
            ListKind::RequiredBy => "This package is not required by any other package.",
        }
    }

    pub fn error_text(&self) -> &'static str {
        match self {
            ListKind::Files => "Error retrieving package files information.",
            ListKind::RequiredBy => "Error retrieving required by information.",
        }
    }

    pub fn title(&self, full_name: &str, count: Option<usize>) -> String {
        match (self, count) {
            (ListKind::Files, Some(n)) => format!("Files for {} ({} files)", full_name, n),
            (ListKind::Files, None) => format!("Files for {}", full_name),
            (ListKind::RequiredBy, Some(n)) => format!("Required by for {} ({} packages)", full_name, n),
            (ListKind::RequiredBy, None) => format!("Required by for {}", full_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListContent {
    Loading,
    Ready(Vec<String>),
    Failed,
}

/// Modal popups; at most one is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Confirm {
        message: String,
        request: Request,
    },
    Message {
        title: String,
        text: String,
    },
    Details {
        entry: PackageEntry,
        text: String,
        scroll: usize,
    },
    List {
        kind: ListKind,
        full_name: String,
        content: ListContent,
        scroll: usize,
        /// Details popup to return to when closed
        back: Box<Dialog>,
    },
}

fn scroll_by(scroll: usize, key: KeyCode, len: usize, page: usize) -> Option<usize> {
    let max = len.saturating_sub(page);
    match key {
        KeyCode::Up => Some(scroll.saturating_sub(1)),
        KeyCode::Down => Some((scroll + 1).min(max)),
        KeyCode::PageUp => Some(scroll.saturating_sub(page)),
        KeyCode::PageDown => Some((scroll + page).min(max)),
        KeyCode::Home => Some(0),
        KeyCode::End => Some(max),
        _ => None,
    }
}

/// TUI application state
pub struct App {
    pub focus: Focus,
    pub menu: Menu,
    pub dialog: Option<Dialog>,
    pub status: String,
    pub status_error: bool,
    /// An operation is running; most input is ignored
    pub busy: bool,
    pub query: String,
    /// Cursor position in characters
    pub cursor: usize,
    pub last_query: Option<String>,
    pub results: Vec<PackageEntry>,
    pub selected: usize,
    pub log: VecDeque<String>,
    pub log_visible: bool,
    /// Lines scrolled up from the bottom
    pub log_scroll: usize,
    /// Visible log rows, updated on every draw
    pub log_rows: Cell<usize>,
    pub sync: SyncInfo,
    pub cache: CacheInfo,
    pub spinner: Spinner,
    pub should_quit: bool,
    log_limit: usize,
    sync_file: PathBuf,
    bindings: KeyBindings,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            focus: Focus::Search,
            menu: Menu::default(),
            dialog: None,
            status: READY.to_string(),
            status_error: false,
            busy: false,
            query: String::new(),
            cursor: 0,
            last_query: None,
            results: Vec::new(),
            selected: 0,
            log: VecDeque::new(),
            log_visible: false,
            log_scroll: 0,
            log_rows: Cell::new(0),
            sync: sync_info::last_sync(&config.paths.sync_file),
            cache: CacheInfo::default(),
            spinner: Spinner::default(),
            should_quit: false,
            log_limit: config.ui.log_lines,
            sync_file: config.paths.sync_file.clone(),
            bindings: KeyBindings::default(),
        }
    }

    pub fn selected_entry(&self) -> Option<&PackageEntry> {
        self.results.get(self.selected)
    }

    /// A popup list is still fetching
    pub fn list_loading(&self) -> bool {
        matches!(
            self.dialog,
            Some(Dialog::List {
                content: ListContent::Loading,
                ..
            })
        )
    }

    pub fn tick(&mut self) {
        if self.busy || self.list_loading() {
            self.spinner.advance();
        }
    }

    /// Append output, one log row per line, keeping the newest lines
    pub fn append_log(&mut self, text: &str) {
        if text.is_empty() {
            self.log.push_back(String::new());
        }
        for line in text.lines() {
            self.log.push_back(line.to_string());
        }
        while self.log.len() > self.log_limit {
            self.log.pop_front();
        }
        self.log_scroll = 0;
    }

    /// Replace the status line. Errors open the log.
    pub fn set_status(&mut self, message: impl Into<String>, error: bool) {
        self.status = message.into();
        self.status_error = error;
        if error && !self.log_visible {
            self.log_visible = true;
            self.log_scroll = 0;
        }
    }

    /// Mark `request` as started
    pub fn begin(&mut self, request: &Request) {
        match request {
            Request::Search(query) => {
                self.busy = true;
                self.last_query = Some(query.clone());
                self.set_status(format!("Searching for {}...", query), false);
            }
            Request::Details(entry) => {
                self.busy = true;
                self.set_status(format!("Loading details for {}...", entry.full_name()), false);
            }
            Request::Install(_)
            | Request::Uninstall(_)
            | Request::UpdateRepositories
            | Request::Upgrade
            | Request::Check
            | Request::Cleanup => {
                self.busy = true;
                self.focus = Focus::List;
            }
            Request::Files(_) | Request::RequiredBy(_) | Request::CacheInfo => {}
        }
    }

    fn scroll_log(&mut self, up: bool) {
        let page = self.log_rows.get();
        if !self.log_visible || page == 0 {
            return;
        }
        if up {
            let max = self.log.len().saturating_sub(page);
            self.log_scroll = (self.log_scroll + page).min(max);
        } else {
            self.log_scroll = self.log_scroll.saturating_sub(page);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Request> {
        if is_interrupt(&key) {
            self.should_quit = true;
            return None;
        }
        if let Some(dialog) = self.dialog.take() {
            return self.handle_dialog_key(dialog, key.code);
        }

        let code = key.code;
        let in_search = self.focus == Focus::Search;
        let action = self.bindings.get_action(code);

        if action == Some(Action::Quit) && !in_search {
            self.should_quit = true;
            return None;
        }

        let log_key = match action {
            Some(Action::ToggleLog) if !in_search => {
                self.log_visible = !self.log_visible;
                self.log_scroll = 0;
                true
            }
            Some(Action::LogUp) => {
                self.scroll_log(true);
                true
            }
            Some(Action::LogDown) => {
                self.scroll_log(false);
                true
            }
            _ => false,
        };

        if self.busy {
            if self.menu.open && matches!(code, KeyCode::Esc | KeyCode::F(9)) {
                self.menu.open = false;
            }
            return None;
        }

        if self.status_error && !matches!(code, KeyCode::F(9) | KeyCode::Esc) {
            self.set_status(READY, false);
        }
        if log_key {
            return None;
        }

        if self.menu.open {
            return self.handle_menu_key(code);
        }
        match self.focus {
            Focus::Search => self.handle_search_key(key),
            Focus::List => self.handle_list_key(action),
        }
    }

    fn handle_menu_key(&mut self, code: KeyCode) -> Option<Request> {
        let titles = MENU_TITLES.len();
        match code {
            KeyCode::Esc | KeyCode::F(9) => self.menu.open = false,
            KeyCode::Left => {
                self.menu.active = (self.menu.active + titles - 1) % titles;
                self.menu.selected = 0;
            }
            KeyCode::Right => {
                self.menu.active = (self.menu.active + 1) % titles;
                self.menu.selected = 0;
            }
            KeyCode::Up => self.menu.selected = self.menu.selected.saturating_sub(1),
            KeyCode::Down => {
                let last = MenuItem::items(self.menu.active).len() - 1;
                self.menu.selected = (self.menu.selected + 1).min(last);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.menu.open = false;
                return self.activate(self.menu.current());
            }
            _ => {}
        }
        None
    }

    fn confirm(&mut self, message: String, request: Request) {
        self.dialog = Some(Dialog::Confirm { message, request });
    }

    fn message(&mut self, title: &str, text: String) {
        self.dialog = Some(Dialog::Message {
            title: title.to_string(),
            text,
        });
    }

    fn activate(&mut self, item: MenuItem) -> Option<Request> {
        match item {
            MenuItem::UpdateRepositories => return Some(Request::UpdateRepositories),
            MenuItem::FullUpgrade => self.confirm("Perform a full system upgrade?".into(), Request::Upgrade),
            MenuItem::CheckSystem => return Some(Request::Check),
            MenuItem::ClearCache => {
                if self.cache.has_cache {
                    self.confirm("Clear Luet cache?".into(), Request::Cleanup);
                } else {
                    self.message("Info", "No cache to clear".into());
                }
            }
            MenuItem::Quit => self.should_quit = true,
            MenuItem::Documentation => self.message("Documentation", about::documentation_text()),
            MenuItem::About => self.message("About", about::about_text()),
        }
        None
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.query
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.query.len())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Request> {
        let len = self.query.chars().count();
        match key.code {
            KeyCode::Enter => {
                self.focus = Focus::List;
                if !self.query.is_empty() {
                    return Some(Request::Search(self.query.clone()));
                }
            }
            KeyCode::Down | KeyCode::Tab | KeyCode::Esc => self.focus = Focus::List,
            KeyCode::F(9) => {
                self.focus = Focus::List;
                self.menu.open = true;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.query.remove(at);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_index(self.cursor);
                    self.query.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                let at = self.byte_index(self.cursor);
                self.query.insert(at, c);
                self.cursor += 1;
            }
            _ => {}
        }
        None
    }

    fn focus_search(&mut self) {
        self.focus = Focus::Search;
        self.cursor = self.query.chars().count();
    }

    fn handle_list_key(&mut self, action: Option<Action>) -> Option<Request> {
        match action? {
            Action::Menu => self.menu.open = true,
            Action::Search => self.focus_search(),
            Action::Down => {
                if self.selected + 1 < self.results.len() {
                    self.selected += 1;
                }
            }
            Action::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                } else {
                    self.focus_search();
                }
            }
            Action::Details => {
                let entry = self.selected_entry()?.clone();
                if entry.protected {
                    self.message("Protected", entry.protection_message());
                } else {
                    return Some(Request::Details(entry));
                }
            }
            Action::ToggleInstall => {
                let entry = self.selected_entry()?.clone();
                let full_name = entry.full_name();
                match entry.action() {
                    PackageAction::Protected => self.message("Protected", entry.protection_message()),
                    PackageAction::Remove => {
                        self.confirm(format!("Do you want to uninstall {}?", full_name), Request::Uninstall(entry))
                    }
                    PackageAction::Install => {
                        self.confirm(format!("Do you want to install {}?", full_name), Request::Install(entry))
                    }
                }
            }
            Action::Quit | Action::ToggleLog | Action::LogUp | Action::LogDown => {}
        }
        None
    }

    fn open_list(&mut self, kind: ListKind, details: Dialog, full_name: String) -> Option<Request> {
        self.dialog = Some(Dialog::List {
            kind,
            full_name: full_name.clone(),
            content: ListContent::Loading,
            scroll: 0,
            back: Box::new(details),
        });
        Some(match kind {
            ListKind::Files => Request::Files(full_name),
            ListKind::RequiredBy => Request::RequiredBy(full_name),
        })
    }

    fn handle_dialog_key(&mut self, dialog: Dialog, code: KeyCode) -> Option<Request> {
        match dialog {
            Dialog::Confirm { request, .. } => {
                if matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    return Some(request);
                }
                None
            }
            Dialog::Message { .. } => None,
            Dialog::Details { entry, text, scroll } => {
                let full_name = entry.full_name();
                let installed = entry.installed;
                let lines = text.lines().count();
                let details = Dialog::Details { entry, text, scroll };
                match code {
                    KeyCode::Char('f') | KeyCode::Char('F') => self.open_list(ListKind::Files, details, full_name),
                    KeyCode::Char('r') | KeyCode::Char('R') if installed => {
                        self.open_list(ListKind::RequiredBy, details, full_name)
                    }
                    _ => {
                        if let Some(to) = scroll_by(scroll, code, lines, DETAILS_ROWS) {
                            if let Dialog::Details { entry, text, .. } = details {
                                self.dialog = Some(Dialog::Details { entry, text, scroll: to });
                            }
                        }
                        None
                    }
                }
            }
            Dialog::List {
                kind,
                full_name,
                content,
                scroll,
                back,
            } => {
                let len = match &content {
                    ListContent::Ready(lines) => lines.len(),
                    _ => 0,
                };
                let loading = content == ListContent::Loading;
                match scroll_by(scroll, code, len, LIST_ROWS) {
                    Some(to) if !loading => {
                        self.dialog = Some(Dialog::List {
                            kind,
                            full_name,
                            content,
                            scroll: to,
                            back,
                        });
                    }
                    _ if loading && code != KeyCode::Esc => {
                        self.dialog = Some(Dialog::List {
                            kind,
                            full_name,
                            content,
                            scroll,
                            back,
                        });
                    }
                    _ => self.dialog = Some(*back),
                }
                None
            }
        }
    }

    fn fill_list(&mut self, want: ListKind, name: &str, items: Option<Vec<String>>) {
        if let Some(Dialog::List {
            kind,
            full_name,
            content,
            ..
        }) = &mut self.dialog
        {
            if *kind == want && full_name == name {
                *content = match items {
                    Some(items) => ListContent::Ready(items),
                    None => ListContent::Failed,
                };
            }
        }
    }

    fn finish_operation(&mut self, op: OpKind, success: bool, message: String) -> Option<Request> {
        self.busy = false;
        if !success {
            self.set_status(message, true);
            return None;
        }
        self.set_status(message, false);

        match op {
            OpKind::RepoUpdate | OpKind::Upgrade => {
                self.sync = sync_info::last_sync(&self.sync_file);
                None
            }
            OpKind::Cleanup => Some(Request::CacheInfo),
            OpKind::Install(_) | OpKind::Uninstall(_) => self.last_query.clone().map(Request::Search),
            OpKind::Check => None,
        }
    }

    pub fn handle_op_event(&mut self, event: OpEvent) -> Option<Request> {
        match event {
            OpEvent::Log(text) => self.append_log(&text),
            OpEvent::Status(text) => self.set_status(text, false),
            OpEvent::Finished(outcome) => return self.handle_outcome(outcome),
        }
        None
    }

    fn handle_outcome(&mut self, outcome: OpOutcome) -> Option<Request> {
        match outcome {
            OpOutcome::Completed { op, completion } => {
                return self.finish_operation(op, completion.success, completion.message);
            }
            OpOutcome::Search { query, outcome } => {
                self.busy = false;
                let summary = outcome.summary(&query);
                match outcome {
                    SearchOutcome::Packages(entries) => {
                        self.results = entries;
                        self.selected = 0;
                    }
                    SearchOutcome::Error(message) => self.set_status(message, true),
                }
                if let Some(summary) = summary {
                    self.set_status(summary, false);
                }
            }
            OpOutcome::Details { entry, text } => {
                self.busy = false;
                self.set_status(READY, false);
                self.dialog = Some(Dialog::Details { entry, text, scroll: 0 });
            }
            OpOutcome::Files { full_name, files } => self.fill_list(ListKind::Files, &full_name, files),
            OpOutcome::RequiredBy { full_name, packages } => {
                self.fill_list(ListKind::RequiredBy, &full_name, packages)
            }
            OpOutcome::Cache(info) => self.cache = info,
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::luet::RawPackage;
    use crate::ops::Completion;

    fn app() -> App {
        let mut config = Config::default();
        config.paths.sync_file = PathBuf::from("/nonexistent/SYNCTIME");
        config.ui.log_lines = 5;
        App::new(&config)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn entry(category: &str, name: &str, installed: bool) -> PackageEntry {
        PackageEntry::from(RawPackage {
            category: category.into(),
            name: name.into(),
            version: "1.0".into(),
            repository: "luet".into(),
            installed,
            files: vec![],
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_search_editing() {
        let mut app = app();
        assert_eq!(app.focus, Focus::Search);
        type_text(&mut app, "vlq");
        app.handle_key(key(KeyCode::Backspace));
        type_text(&mut app, "c");
        app.handle_key(key(KeyCode::Home));
        app.handle_key(key(KeyCode::Delete));
        app.handle_key(key(KeyCode::End));
        assert_eq!(app.query, "lc");
        assert_eq!(app.cursor, 2);

        // q and l are plain text in the search box
        type_text(&mut app, "ql");
        assert_eq!(app.query, "lcql");
        assert!(!app.should_quit);
        assert!(!app.log_visible);
    }

    #[test]
    fn test_search_submit() {
        let mut app = app();
        type_text(&mut app, "vlc");
        let req = app.handle_key(key(KeyCode::Enter));
        assert_eq!(req, Some(Request::Search("vlc".into())));
        assert_eq!(app.focus, Focus::List);

        app.begin(&req.unwrap());
        assert!(app.busy);
        assert_eq!(app.status, "Searching for vlc...");

        app.handle_op_event(OpEvent::Finished(OpOutcome::Search {
            query: "vlc".into(),
            outcome: SearchOutcome::Packages(vec![entry("apps", "vlc", false), entry("apps", "kodi", true)]),
        }));
        assert!(!app.busy);
        assert_eq!(app.results.len(), 2);
        assert_eq!(app.status, "Found 2 results matching 'vlc'");
    }

    #[test]
    fn test_empty_search_only_moves_focus() {
        let mut app = app();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.focus, Focus::List);
    }

    #[test]
    fn test_up_from_first_row_focuses_search() {
        let mut app = app();
        app.query = "vlc".into();
        app.focus = Focus::List;
        app.results = vec![entry("apps", "vlc", false), entry("apps", "kodi", false)];

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected, 1);
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.focus, Focus::Search);
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_install_confirmation() {
        let mut app = app();
        app.focus = Focus::List;
        app.results = vec![entry("apps", "vlc", false)];

        assert_eq!(app.handle_key(key(KeyCode::Char('i'))), None);
        assert!(matches!(&app.dialog, Some(Dialog::Confirm { message, .. }) if message == "Do you want to install apps/vlc?"));
        let req = app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(req, Some(Request::Install(entry("apps", "vlc", false))));
        assert!(app.dialog.is_none());

        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.handle_key(key(KeyCode::Char('n'))), None);
        assert!(app.dialog.is_none());
    }

    #[test]
    fn test_protected_package_shows_message() {
        let mut app = app();
        app.focus = Focus::List;
        app.results = vec![entry("apps", "grub", true)];

        assert_eq!(app.handle_key(key(KeyCode::Char('i'))), None);
        assert!(matches!(&app.dialog, Some(Dialog::Message { title, .. }) if title == "Protected"));
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert!(app.dialog.is_some());
    }

    #[test]
    fn test_busy_blocks_input() {
        let mut app = app();
        app.focus = Focus::List;
        app.results = vec![entry("apps", "vlc", false)];
        app.begin(&Request::Check);

        assert_eq!(app.handle_key(key(KeyCode::Char('i'))), None);
        assert!(app.dialog.is_none());
        app.handle_key(key(KeyCode::Char('l')));
        assert!(app.log_visible);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_error_opens_log_and_clears_on_key() {
        let mut app = app();
        app.focus = Focus::List;
        app.begin(&Request::UpdateRepositories);
        app.handle_op_event(OpEvent::Finished(OpOutcome::Completed {
            op: OpKind::RepoUpdate,
            completion: Completion::failed(1, "Error updating repositories"),
        }));

        assert!(app.status_error);
        assert!(app.log_visible);
        assert!(!app.busy);

        app.handle_key(key(KeyCode::Down));
        assert!(!app.status_error);
        assert_eq!(app.status, READY);
    }

    #[test]
    fn test_install_success_reruns_search() {
        let mut app = app();
        app.begin(&Request::Search("vlc".into()));
        app.handle_op_event(OpEvent::Finished(OpOutcome::Search {
            query: "vlc".into(),
            outcome: SearchOutcome::Packages(vec![]),
        }));

        app.begin(&Request::Install(entry("apps", "vlc", false)));
        let next = app.handle_op_event(OpEvent::Finished(OpOutcome::Completed {
            op: OpKind::Install("apps/vlc".into()),
            completion: Completion::ok("Install completed successfully."),
        }));
        assert_eq!(next, Some(Request::Search("vlc".into())));
    }

    #[test]
    fn test_log_is_capped() {
        let mut app = app();
        app.append_log("1\n2\n3");
        app.append_log("4\n5\n6\n7");
        assert_eq!(app.log.len(), 5);
        assert_eq!(app.log.front().unwrap(), "3");
        assert_eq!(app.log.back().unwrap(), "7");
    }

    #[test]
    fn test_blank_output_lines_are_kept() {
        let mut app = app();
        app.handle_op_event(OpEvent::Log("Downloading".into()));
        app.handle_op_event(OpEvent::Log(String::new()));
        app.handle_op_event(OpEvent::Log("Done".into()));
        assert_eq!(app.log, ["Downloading", "", "Done"]);
    }

    #[test]
    fn test_log_scrolling() {
        let mut app = app();
        app.append_log("1\n2\n3\n4\n5");
        app.focus = Focus::List;
        app.log_visible = true;
        app.log_rows.set(2);

        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.log_scroll, 2);
        app.handle_key(key(KeyCode::PageUp));
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.log_scroll, 3);
        app.handle_key(key(KeyCode::PageDown));
        assert_eq!(app.log_scroll, 1);

        app.append_log("6");
        assert_eq!(app.log_scroll, 0);
    }

    #[test]
    fn test_menu_navigation() {
        let mut app = app();
        app.focus = Focus::List;
        app.handle_key(key(KeyCode::F(9)));
        assert!(app.menu.open);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.menu.current(), MenuItem::CheckSystem);
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Some(Request::Check));
        assert!(!app.menu.open);

        app.handle_key(key(KeyCode::F(9)));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.menu.active, 1);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert!(matches!(&app.dialog, Some(Dialog::Message { title, .. }) if title == "About"));
    }

    #[test]
    fn test_cache_item_needs_cache() {
        let mut app = app();
        assert_eq!(app.activate(MenuItem::ClearCache), None);
        assert!(matches!(&app.dialog, Some(Dialog::Message { text, .. }) if text == "No cache to clear"));

        app.dialog = None;
        app.handle_op_event(OpEvent::Finished(OpOutcome::Cache(CacheInfo {
            has_cache: true,
            size_human: Some("1.2G".into()),
            menu_label: "Clear Luet cache (1.2G)".into(),
        })));
        assert_eq!(MenuItem::ClearCache.label(&app.cache), "Clear Luet cache (1.2G)");
        app.activate(MenuItem::ClearCache);
        assert_eq!(app.handle_key(key(KeyCode::Char('Y'))), Some(Request::Cleanup));
    }

    #[test]
    fn test_details_popup_lists() {
        let mut app = app();
        let vlc = entry("apps", "vlc", true);
        app.handle_op_event(OpEvent::Finished(OpOutcome::Details {
            entry: vlc.clone(),
            text: "Package: apps/vlc".into(),
        }));
        assert!(matches!(app.dialog, Some(Dialog::Details { .. })));

        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), Some(Request::RequiredBy("apps/vlc".into())));
        assert!(app.list_loading());
        app.tick();
        assert_eq!(app.spinner.current(), Spinner::FRAMES[1]);

        // a stale result for another package is ignored
        app.handle_op_event(OpEvent::Finished(OpOutcome::RequiredBy {
            full_name: "apps/kodi".into(),
            packages: Some(vec![]),
        }));
        assert!(app.list_loading());

        app.handle_op_event(OpEvent::Finished(OpOutcome::RequiredBy {
            full_name: "apps/vlc".into(),
            packages: Some(vec!["apps/a".into(), "apps/b".into()]),
        }));
        assert!(matches!(
            &app.dialog,
            Some(Dialog::List { content: ListContent::Ready(lines), .. }) if lines.len() == 2
        ));

        // closing the list goes back to the details
        app.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(app.dialog, Some(Dialog::Details { .. })));
        app.handle_key(key(KeyCode::Char('x')));
        assert!(app.dialog.is_none());
    }

    #[test]
    fn test_required_by_only_when_installed() {
        let mut app = app();
        app.dialog = Some(Dialog::Details {
            entry: entry("apps", "vlc", false),
            text: String::new(),
            scroll: 0,
        });
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), None);
        assert!(app.dialog.is_none());
    }

    #[test]
    fn test_scroll_bounds() {
        assert_eq!(scroll_by(0, KeyCode::Up, 20, 5), Some(0));
        assert_eq!(scroll_by(14, KeyCode::Down, 20, 5), Some(15));
        assert_eq!(scroll_by(15, KeyCode::Down, 20, 5), Some(15));
        assert_eq!(scroll_by(3, KeyCode::PageDown, 20, 5), Some(8));
        assert_eq!(scroll_by(3, KeyCode::End, 4, 5), Some(0));
        assert_eq!(scroll_by(3, KeyCode::Char('x'), 20, 5), None);
    }

    #[test]
    fn test_ctrl_c_quits_from_search() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.query.is_empty());
    }
}
