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

//! TUI event handling.
//!
//! Terminal input, ticks and operation progress are merged onto one channel
//! so the UI state is only ever touched from the main loop.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::ops::OpEvent;

/// Application event types
#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Timer tick, drives the spinner
    Tick,
    /// Progress or result of a background operation
    Op(OpEvent),
}

/// Most events drained per frame
pub const MAX_BATCH: usize = 200;

/// Event handler for async event processing
pub struct EventHandler {
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, tick_rate }
    }

    /// Poll the terminal on its own thread since crossterm reads block.
    /// A tick is sent whenever the poll times out.
    pub fn start_terminal_events(&self) -> std::thread::JoinHandle<()> {
        let tx = self.tx.clone();
        let tick_rate = self.tick_rate;

        std::thread::spawn(move || loop {
            let ev = match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                    Ok(_) => continue,
                    Err(_) => break,
                },
                Ok(false) => AppEvent::Tick,
                Err(_) => break,
            };
            if tx.send(ev).is_err() {
                break;
            }
        })
    }

    /// Forward operation events into the main queue
    pub fn forward_ops(&self, mut ops: mpsc::UnboundedReceiver<OpEvent>) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = ops.recv().await {
                if tx.send(AppEvent::Op(ev)).is_err() {
                    break;
                }
            }
        })
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Everything already queued behind `first`, up to [`MAX_BATCH`] events
    pub fn batch(&mut self, first: AppEvent) -> Vec<AppEvent> {
        let mut events = vec![first];
        while events.len() < MAX_BATCH {
            match self.rx.try_recv() {
                Ok(ev) => events.push(ev),
                Err(_) => break,
            }
        }
        events
    }
}

/// Key bindings of the results list
pub struct KeyBindings {
    pub quit: Vec<KeyCode>,
    pub menu: Vec<KeyCode>,
    pub search: Vec<KeyCode>,
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub details: Vec<KeyCode>,
    pub toggle_install: Vec<KeyCode>,
    pub toggle_log: Vec<KeyCode>,
    pub log_up: Vec<KeyCode>,
    pub log_down: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: vec![KeyCode::Char('q'), KeyCode::Char('Q')],
            menu: vec![KeyCode::F(9)],
            search: vec![KeyCode::Char('s'), KeyCode::Char('S')],
            up: vec![KeyCode::Up],
            down: vec![KeyCode::Down],
            details: vec![KeyCode::Enter],
            toggle_install: vec![KeyCode::Char('i'), KeyCode::Char('I'), KeyCode::Char(' ')],
            toggle_log: vec![KeyCode::Char('l'), KeyCode::Char('L')],
            log_up: vec![KeyCode::PageUp],
            log_down: vec![KeyCode::PageDown],
        }
    }
}

impl KeyBindings {
    /// Check if a key matches a binding
    pub fn matches(&self, key: KeyCode, binding: &[KeyCode]) -> bool {
        binding.contains(&key)
    }

    /// Get action for a key
    pub fn get_action(&self, key: KeyCode) -> Option<Action> {
        if self.matches(key, &self.quit) {
            Some(Action::Quit)
        } else if self.matches(key, &self.menu) {
            Some(Action::Menu)
        } else if self.matches(key, &self.search) {
            Some(Action::Search)
        } else if self.matches(key, &self.up) {
            Some(Action::Up)
        } else if self.matches(key, &self.down) {
            Some(Action::Down)
        } else if self.matches(key, &self.details) {
            Some(Action::Details)
        } else if self.matches(key, &self.toggle_install) {
            Some(Action::ToggleInstall)
        } else if self.matches(key, &self.toggle_log) {
            Some(Action::ToggleLog)
        } else if self.matches(key, &self.log_up) {
            Some(Action::LogUp)
        } else if self.matches(key, &self.log_down) {
            Some(Action::LogDown)
        } else {
            None
        }
    }
}

/// High-level action enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Menu,
    Search,
    Up,
    Down,
    Details,
    ToggleInstall,
    ToggleLog,
    LogUp,
    LogDown,
}

/// Ctrl+C leaves from anywhere, including the search box
pub fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}
