//! Dashboard screen
//!
//! Concern selection grid, the recent-scans strip, and the scan action.
//! The scan action stays disabled until at least one concern is selected.

use super::App;
use crate::concerns::SKIN_CONCERNS;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

/// Concern grid width in cells
pub(super) const GRID_COLUMNS: usize = 4;

pub(super) fn render(frame: &mut Frame<'_>, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Length(1), // notice
            Constraint::Length(7), // recent scans (cap of 5 plus borders)
            Constraint::Min(8),    // concern grid
            Constraint::Length(3), // action bar
            Constraint::Length(1), // key hints
        ])
        .split(frame.size());

    render_header(frame, rows[0], app);
    render_notice(frame, rows[1], app);
    render_history(frame, rows[2], app);
    render_concern_grid(frame, rows[3], app);
    render_action_bar(frame, rows[4], app);

    let hints = Paragraph::new(
        "←↑↓→ move · Space toggle · s scan · 1-5 open recent · Ctrl+L logout · q quit",
    )
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    frame.render_widget(hints, rows[5]);
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let user = app.session.user.as_deref().unwrap_or("");
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "Skin Wellness Hub",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Signed in as {user} — select your concerns to begin a new scan"),
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(header, area);
}

fn render_notice(frame: &mut Frame<'_>, area: Rect, app: &App) {
    if let Some(notice) = &app.session.notice {
        let paragraph = Paragraph::new(notice.as_str())
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
        frame.render_widget(paragraph, area);
    }
}

fn render_history(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Recent Scans ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if app.session.history.is_empty() {
        let empty = Paragraph::new("No scans yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{}. ", i + 1),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    entry.condition.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", entry.date),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_concern_grid(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Concerns ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let row_count = SKIN_CONCERNS.len().div_ceil(GRID_COLUMNS);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3); row_count])
        .split(inner);

    for (row, row_area) in row_areas.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![
                Constraint::Ratio(1, GRID_COLUMNS as u32);
                GRID_COLUMNS
            ])
            .split(*row_area);

        for column in 0..GRID_COLUMNS {
            let index = row * GRID_COLUMNS + column;
            let Some(tag) = SKIN_CONCERNS.get(index) else {
                continue;
            };
            let selected = app.session.selected_concerns.contains(tag.id);
            let under_cursor = app.concern_cursor == index;

            let mut style = if selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if under_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let marker = if selected { "✓" } else { " " };
            let cell = Paragraph::new(format!("[{marker}] {} {}", tag.icon, tag.label))
                .style(style)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::NONE));
            frame.render_widget(cell, cells[column]);
        }
    }
}

fn render_action_bar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let (label, style) = if app.session.can_start_scan() {
        (
            "▶ Start Analysis (s)",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Select at least one concern to start",
            Style::default().fg(Color::DarkGray),
        )
    };

    let action = Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(action, area);
}
