//! Login screen
//!
//! No real authentication happens here; any non-empty pair establishes a
//! display-only identity.

use super::App;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub(super) fn render(frame: &mut Frame<'_>, app: &App) {
    let area = centered_rect(frame.size(), 52, 14);

    let card = Block::default()
        .title(" DermaLens ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(card, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(2), // headline
            Constraint::Length(3), // email
            Constraint::Length(3), // password
            Constraint::Length(1), // hint
        ])
        .split(area);

    let headline = Paragraph::new(vec![
        Line::from(Span::styled(
            "Advanced Skin Diagnostics",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Please enter your details to sign in.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(headline, inner[0]);

    render_field(
        frame,
        inner[1],
        "Email",
        &app.login_form.email,
        !app.login_form.focus_password,
    );

    let masked = "•".repeat(app.login_form.password.chars().count());
    render_field(
        frame,
        inner[2],
        "Password",
        &masked,
        app.login_form.focus_password,
    );

    let hint = Paragraph::new("Tab switch field · Enter sign in · Ctrl+C quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hint, inner[3]);
}

fn render_field(frame: &mut Frame<'_>, area: Rect, label: &str, value: &str, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let field = Paragraph::new(value.to_string()).block(
        Block::default()
            .title(label)
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(field, area);
}

/// Center a fixed-size rect inside `area`, clamped to fit
pub(super) fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
