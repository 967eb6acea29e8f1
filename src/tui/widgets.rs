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

//! Custom TUI widgets.

use ratatui::prelude::*;

/// Braille spinner advanced on every tick while something runs
#[derive(Debug, Clone, Default)]
pub struct Spinner {
    frame: usize,
}

impl Spinner {
    pub const FRAMES: [&'static str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    pub fn advance(&mut self) {
        self.frame = (self.frame + 1) % Self::FRAMES.len();
    }

    pub fn current(&self) -> &'static str {
        Self::FRAMES[self.frame]
    }
}

/// Top line with the menu titles
pub struct MenuBar<'a> {
    titles: &'a [&'a str],
    active: Option<usize>,
    dimmed: bool,
}

impl<'a> MenuBar<'a> {
    pub fn new(titles: &'a [&'a str]) -> Self {
        Self {
            titles,
            active: None,
            dimmed: false,
        }
    }

    pub fn active(mut self, active: Option<usize>) -> Self {
        self.active = active;
        self
    }

    pub fn dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    /// Column where the title at `index` starts
    pub fn offset_of(titles: &[&str], index: usize) -> u16 {
        titles.iter().take(index).map(|t| t.chars().count() as u16 + 4).sum()
    }
}

impl Widget for MenuBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let mut bar = Style::default().fg(Color::Black).bg(Color::Cyan);
        if self.dimmed {
            bar = bar.add_modifier(Modifier::DIM);
        }
        buf.set_style(Rect { height: 1, ..area }, bar);

        let mut x = area.x;
        for (i, title) in self.titles.iter().enumerate() {
            let segment = format!("  {}  ", title);
            let style = if self.active == Some(i) {
                Style::default().fg(Color::Cyan).bg(Color::Black).add_modifier(Modifier::BOLD)
            } else {
                bar
            };
            if x >= area.right() {
                break;
            }
            let (next, _) = buf.set_stringn(x, area.y, &segment, (area.right() - x) as usize, style);
            x = next;
        }
    }
}

/// Status message centered with the last sync time on the right
pub struct StatusLine<'a> {
    message: &'a str,
    sync: &'a str,
    spinner: Option<&'a str>,
    error: bool,
}

impl<'a> StatusLine<'a> {
    pub fn new(message: &'a str, sync: &'a str) -> Self {
        Self {
            message,
            sync,
            spinner: None,
            error: false,
        }
    }

    pub fn spinner(mut self, frame: Option<&'a str>) -> Self {
        self.spinner = frame;
        self
    }

    pub fn error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let sync_text = format!("Last sync: {}", self.sync);
        let sync_len = sync_text.chars().count() as u16;
        if sync_len < area.width {
            buf.set_string(
                area.right() - sync_len - 1,
                area.y,
                &sync_text,
                Style::default().fg(Color::DarkGray),
            );
        }

        let text = match self.spinner {
            Some(frame) => format!("{} {}", frame, self.message),
            None => self.message.to_string(),
        };
        let style = if self.error {
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD)
        } else if self.spinner.is_some() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Green)
        };
        let len = text.chars().count() as u16;
        let x = area.x + area.width.saturating_sub(len) / 2;
        buf.set_stringn(x, area.y, &text, (area.right() - x) as usize, style);
    }
}

/// One-line stand-in for the collapsed output log
pub struct LogIndicator;

impl Widget for LogIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height == 0 {
            return;
        }
        let line = "─".repeat(area.width as usize);
        buf.set_string(area.x, area.y, &line, Style::default().fg(Color::DarkGray));
        buf.set_stringn(
            area.x + 2,
            area.y,
            " Toggle output log (Press 'l' to expand) ",
            area.width as usize - 4,
            Style::default().fg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_spinner_wraps() {
        let mut spinner = Spinner::default();
        assert_eq!(spinner.current(), "⠋");
        for _ in 0..Spinner::FRAMES.len() {
            spinner.advance();
        }
        assert_eq!(spinner.current(), "⠋");
        spinner.advance();
        assert_eq!(spinner.current(), "⠙");
    }

    #[test]
    fn test_menu_offsets() {
        let titles = ["File", "Help"];
        assert_eq!(MenuBar::offset_of(&titles, 0), 0);
        assert_eq!(MenuBar::offset_of(&titles, 1), 8);
    }

    #[test]
    fn test_status_line_layout() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusLine::new("Ready", "2 hours ago").render(area, &mut buf);

        let text = row(&buf, 0);
        assert!(text.trim_end().ends_with("Last sync: 2 hours ago"));
        assert!(text.contains("Ready"));
    }

    #[test]
    fn test_log_indicator() {
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        LogIndicator.render(area, &mut buf);
        assert!(row(&buf, 0).contains("Press 'l' to expand"));
    }
}
