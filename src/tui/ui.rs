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

//! TUI rendering.

use ratatui::{prelude::*, widgets::*};

use super::app::{App, Dialog, Focus, ListContent, MenuItem, DETAILS_ROWS, LIST_ROWS, MENU_TITLES};
use super::widgets::{LogIndicator, MenuBar, StatusLine};
use crate::luet::PackageAction;

pub const MIN_WIDTH: u16 = 80;
pub const MIN_HEIGHT: u16 = 20;
const PLACEHOLDER: &str = "Enter package name";

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        draw_too_small(f, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Menu bar
            Constraint::Length(1),
            Constraint::Length(1), // Status
            Constraint::Length(3), // Search box
            Constraint::Min(5),    // Results and log
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    f.render_widget(
        MenuBar::new(&MENU_TITLES)
            .active(app.menu.open.then_some(app.menu.active))
            .dimmed(app.busy),
        chunks[0],
    );
    f.render_widget(
        StatusLine::new(&app.status, &app.sync.ago)
            .spinner(app.busy.then(|| app.spinner.current()))
            .error(app.status_error),
        chunks[2],
    );
    draw_search(f, app, chunks[3]);

    if app.log_visible {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[4]);
        draw_results(f, app, body[0]);
        draw_log(f, app, body[1]);
    } else {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(chunks[4]);
        draw_results(f, app, body[0]);
        f.render_widget(LogIndicator, body[1]);
    }

    draw_footer(f, app, chunks[5]);

    if app.menu.open {
        draw_menu(f, app, area);
    }
    if let Some(dialog) = &app.dialog {
        draw_dialog(f, app, dialog, area);
    }
}

fn draw_too_small(f: &mut Frame, area: Rect) {
    let msg = Paragraph::new(format!("Terminal too small! Min {}x{}.", MIN_HEIGHT, MIN_WIDTH))
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    let y = area.y + area.height / 2;
    f.render_widget(msg, Rect { y, height: 1.min(area.height), ..area });
}

fn draw_search(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Search && !app.menu.open && app.dialog.is_none();
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let text = if app.query.is_empty() {
        Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(app.query.as_str(), Style::default().fg(Color::White))
    };

    let input = Paragraph::new(Line::from(text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Span::styled(" Search ", Style::default().fg(Color::Cyan))),
    );
    f.render_widget(input, area);

    if focused {
        let x = (area.x + 1 + app.cursor as u16).min(area.right().saturating_sub(2));
        f.set_cursor_position(Position::new(x, area.y + 1));
    }
}

fn action_style(action: PackageAction) -> Style {
    match action {
        PackageAction::Install => Style::default().fg(Color::Green),
        PackageAction::Remove => Style::default().fg(Color::Red),
        PackageAction::Protected => Style::default().fg(Color::DarkGray),
    }
}

fn draw_results(f: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(["Category", "Name", "Version", "Repository", "Action"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .results
        .iter()
        .map(|entry| {
            let action = entry.action();
            Row::new(vec![
                Cell::from(entry.category.as_str()),
                Cell::from(entry.name.as_str()),
                Cell::from(entry.version.as_str()),
                Cell::from(entry.repository.as_str()),
                Cell::from(Span::styled(action.to_string(), action_style(action))),
            ])
        })
        .collect();

    let focused = app.focus == Focus::List;
    let title = if app.results.is_empty() {
        " Packages ".to_string()
    } else {
        format!(" Packages ({}) ", app.results.len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(18),
            Constraint::Percentage(28),
            Constraint::Percentage(16),
            Constraint::Percentage(22),
            Constraint::Percentage(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Blue }))
            .title(Span::styled(title, Style::default().fg(Color::Cyan))),
    )
    .row_highlight_style(if focused {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    });

    let mut state = TableState::default().with_selected((!app.results.is_empty()).then_some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_log(f: &mut Frame, app: &App, area: Rect) {
    let rows = area.height.saturating_sub(2) as usize;
    app.log_rows.set(rows);

    let end = app.log.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(rows);
    let lines: Vec<Line> = app
        .log
        .range(start..end)
        .map(|l| Line::from(l.as_str()))
        .collect();

    let title = if app.log_scroll > 0 {
        format!(" Output log (Scrolled Up: {} lines) ", app.log_scroll)
    } else {
        " Output log ".to_string()
    };

    let log = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Cyan))),
    );
    f.render_widget(log, area);
}

/// Draw footer with key hints
fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: &[(&str, &str)] = match app.focus {
        Focus::Search => &[("Enter", "Search"), ("Tab", "Results"), ("F9", "Menu"), ("Ctrl+C", "Quit")],
        Focus::List => &[
            ("Enter", "Details"),
            ("i", "Install/Remove"),
            ("s", "Search"),
            ("l", "Log"),
            ("F9", "Menu"),
            ("q", "Quit"),
        ],
    };

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(format!(" {} ", key), Style::default().fg(Color::Black).bg(Color::Cyan)),
                Span::styled(format!(" {} ", action), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let items = MenuItem::items(app.menu.active);
    let labels: Vec<String> = items.iter().map(|i| i.label(&app.cache)).collect();
    let width = labels.iter().map(|l| l.chars().count() as u16).max().unwrap_or(0) + 4;
    let x = area.x + MenuBar::offset_of(&MENU_TITLES, app.menu.active);
    let rect = Rect {
        x,
        y: area.y + 1,
        width: width.min(area.right().saturating_sub(x)),
        height: (items.len() as u16 + 2).min(area.height.saturating_sub(1)),
    };

    let lines: Vec<Line> = items
        .iter()
        .zip(&labels)
        .enumerate()
        .map(|(i, (item, label))| {
            let mut style = if i == app.menu.selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            if *item == MenuItem::ClearCache && !app.cache.has_cache {
                style = style.add_modifier(Modifier::DIM);
            }
            Line::from(Span::styled(format!(" {:<w$} ", label, w = width as usize - 4), style))
        })
        .collect();

    let menu = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .style(Style::default().bg(Color::Black)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(menu, rect);
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn popup(f: &mut Frame, area: Rect, title: String, lines: Vec<Line>, width: u16, height: u16) {
    let rect = centered_rect(width, height, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(format!(" {} ", title), Style::default().fg(Color::Yellow)))
        .style(Style::default().bg(Color::Black));

    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), rect);
}

fn draw_dialog(f: &mut Frame, app: &App, dialog: &Dialog, area: Rect) {
    match dialog {
        Dialog::Confirm { message, .. } => {
            let lines = vec![
                Line::from(""),
                Line::from(message.as_str()).alignment(Alignment::Center),
                Line::from(""),
                hint("[y] Yes   [any other key] No").alignment(Alignment::Center),
            ];
            popup(f, area, "Confirm".into(), lines, 56, 6);
        }
        Dialog::Message { title, text } => {
            let mut lines: Vec<Line> = text.lines().map(Line::from).collect();
            lines.push(Line::from(""));
            lines.push(hint("Press any key to close"));
            let height = lines.len() as u16 + 2;
            popup(f, area, title.clone(), lines, 64, height);
        }
        Dialog::Details { entry, text, scroll } => {
            let mut lines: Vec<Line> = text.lines().skip(*scroll).take(DETAILS_ROWS).map(Line::from).collect();
            lines.resize(DETAILS_ROWS, Line::from(""));
            lines.push(Line::from(""));
            lines.push(hint(if entry.installed {
                "[f] Files  [r] Required by  [↑↓] Scroll  [Esc] Close"
            } else {
                "[f] Files  [↑↓] Scroll  [Esc] Close"
            }));
            popup(f, area, entry.full_name(), lines, 72, DETAILS_ROWS as u16 + 4);
        }
        Dialog::List {
            kind,
            full_name,
            content,
            scroll,
            ..
        } => {
            let (title, mut lines) = match content {
                ListContent::Loading => (
                    kind.title(full_name, None),
                    vec![Line::from(format!("{} {}", app.spinner.current(), kind.loading_text()))],
                ),
                ListContent::Failed => (
                    kind.title(full_name, None),
                    vec![Line::from(Span::styled(kind.error_text(), Style::default().fg(Color::Red)))],
                ),
                ListContent::Ready(items) if items.is_empty() => {
                    (kind.title(full_name, Some(0)), vec![Line::from(kind.empty_text())])
                }
                ListContent::Ready(items) => (
                    kind.title(full_name, Some(items.len())),
                    items
                        .iter()
                        .skip(*scroll)
                        .take(LIST_ROWS)
                        .map(|i| Line::from(i.as_str()))
                        .collect(),
                ),
            };
            lines.resize(LIST_ROWS, Line::from(""));
            lines.push(Line::from(""));
            lines.push(hint("[↑↓ PgUp PgDn] Scroll  [any other key] Back"));
            popup(f, area, title, lines, 72, LIST_ROWS as u16 + 4);
        }
    }
}

/// Helper to create a centered rectangle of at most `width` x `height`
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
