//! Scanner screen
//!
//! Shows the live camera status while the device is held open. The
//! camera belongs to this screen's activation period only; every exit
//! path releases it.

use super::login::centered_rect;
use super::App;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(super) fn render(frame: &mut Frame<'_>, app: &App) {
    let area = centered_rect(frame.size(), 60, 16);

    let block = Block::default()
        .title(" Align Your Face ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Min(6),    // viewfinder status
            Constraint::Length(2), // controls
        ])
        .split(area);

    if let Some(error) = &app.session.camera_error {
        let message = Paragraph::new(vec![
            Line::from(Span::styled(
                "Camera unavailable",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(error.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                "Check permissions, then press Esc to go back and retry.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(message, inner[0]);
    } else {
        let status = match app.camera_info {
            Some((width, height)) => vec![
                Line::from(Span::styled(
                    "● LIVE",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Camera stream open at {width}x{height}")),
                Line::from(""),
                Line::from(Span::styled(
                    "Align your face within the frame and hold still.",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
            None => {
                let spinner = SPINNER_FRAMES[app.tick % SPINNER_FRAMES.len()];
                vec![
                    Line::from(format!("{spinner} Initializing camera…")),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Waiting for device permission and stream start.",
                        Style::default().fg(Color::DarkGray),
                    )),
                ]
            }
        };
        let viewfinder = Paragraph::new(status).alignment(Alignment::Center);
        frame.render_widget(viewfinder, inner[0]);
    }

    let controls = Paragraph::new("Space capture · Esc cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(controls, inner[1]);
}
