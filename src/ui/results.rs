//! Results screen
//!
//! Captured image preview with detection overlays on the left, the
//! diagnosis detail and the follow-up consult on the right. While the
//! analysis is in flight the detail pane shows progress and input stays
//! live.

use super::App;
use crate::analysis::{Diagnosis, OverlayRect, Severity};
use crate::chat::Role;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

const ANALYZING_FRAMES: &[&str] = &["   ", ".  ", ".. ", "..."];

pub(super) fn render(frame: &mut Frame<'_>, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(frame.size());

    render_preview_column(frame, columns[0], app);
    render_detail_column(frame, columns[1], app);
}

fn render_preview_column(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(area);

    render_preview(frame, rows[0], app);
    render_severity_badge(frame, rows[1], app.session.diagnosis.as_ref());
}

fn render_preview(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let title = match &app.session.captured_image {
        Some(image) => format!(" Capture ({} KB) ", image.data.len() / 1024),
        None => " Capture ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(diagnosis) = &app.session.diagnosis else {
        return;
    };

    let detection_count = diagnosis.detections.len();
    if app.session.show_annotations {
        for detection in &diagnosis.detections {
            let overlay = overlay_rect(inner, detection.overlay());
            let marker = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(Span::styled(
                    detection.label.clone(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            frame.render_widget(marker, overlay);
        }
    }

    // Status line inside the bottom edge of the preview
    if detection_count > 0 && inner.height > 0 {
        let status_area = Rect {
            x: inner.x,
            y: inner.y + inner.height - 1,
            width: inner.width,
            height: 1,
        };
        let visibility = if app.session.show_annotations {
            "a hide"
        } else {
            "a show"
        };
        let status = Paragraph::new(format!(
            "{detection_count} issues detected · {visibility}"
        ))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
        frame.render_widget(status, status_area);
    }
}

/// Map a detection's fractional overlay onto the preview bounds
///
/// Scaling against the actual rendered rect keeps the overlay aligned
/// with the image no matter its aspect ratio.
fn overlay_rect(bounds: Rect, overlay: OverlayRect) -> Rect {
    let x = bounds.x + (overlay.left * f64::from(bounds.width)).round() as u16;
    let y = bounds.y + (overlay.top * f64::from(bounds.height)).round() as u16;
    let width = ((overlay.width * f64::from(bounds.width)).round() as u16).max(1);
    let height = ((overlay.height * f64::from(bounds.height)).round() as u16).max(1);

    Rect {
        x: x.min(bounds.x + bounds.width.saturating_sub(1)),
        y: y.min(bounds.y + bounds.height.saturating_sub(1)),
        width: width.min(bounds.width.saturating_sub(x - bounds.x)),
        height: height.min(bounds.height.saturating_sub(y - bounds.y)),
    }
}

fn render_severity_badge(frame: &mut Frame<'_>, area: Rect, diagnosis: Option<&Diagnosis>) {
    let Some(diagnosis) = diagnosis else {
        return;
    };

    let color = match diagnosis.severity {
        Severity::Mild => Color::Green,
        Severity::Moderate => Color::Yellow,
        Severity::Severe => Color::Red,
    };
    let badge = Paragraph::new(diagnosis.severity.to_string())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Severity ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(badge, area);
}

fn render_detail_column(frame: &mut Frame<'_>, area: Rect, app: &App) {
    if app.session.analyzing {
        let dots = ANALYZING_FRAMES[app.tick % ANALYZING_FRAMES.len()];
        let progress = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Detecting issues{dots}"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Your scan is being analyzed. This usually takes a few seconds.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(progress, area);
        return;
    }

    let Some(diagnosis) = &app.session.diagnosis else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(10), Constraint::Length(1)])
        .split(area);

    render_diagnosis(frame, rows[0], diagnosis);
    render_chat(frame, rows[1], app);

    let hints = Paragraph::new(
        "Tab chat · a annotations · 1-5 open recent · Esc close · Ctrl+L logout",
    )
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    frame.render_widget(hints, rows[2]);
}

fn render_diagnosis(frame: &mut Frame<'_>, area: Rect, diagnosis: &Diagnosis) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                diagnosis.condition.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ({:.0}% confidence)", diagnosis.confidence * 100.0),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
        Line::from(diagnosis.description.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Key Recommendations",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
    ];

    for (i, recommendation) in diagnosis.recommendations.iter().enumerate() {
        lines.push(Line::from(format!("  {}. {recommendation}", i + 1)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Effective Ingredients",
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!(
        "  {}",
        diagnosis.suggested_ingredients.join(" · ")
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Medical disclaimer: {}", diagnosis.disclaimer),
        Style::default().fg(Color::Yellow),
    )));

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Diagnosis ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(detail, area);
}

fn render_chat(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(area);

    let transcript_block = Block::default()
        .title(" Follow-up Consult ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let mut lines = Vec::new();
    if let Some(transcript) = &app.session.transcript {
        let visible = transcript.messages().len().saturating_sub(visible_messages(rows[0]));
        for message in &transcript.messages()[visible..] {
            let (prefix, style) = match message.role {
                Role::User => ("You: ", Style::default().fg(Color::Cyan)),
                Role::Assistant => ("Assistant: ", Style::default()),
            };
            let text = if message.text.is_empty() && transcript.is_pending() {
                "…".to_string()
            } else {
                message.text.clone()
            };
            lines.push(Line::from(vec![
                Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
                Span::raw(text),
            ]));
        }
    }

    let transcript_widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(transcript_block);
    frame.render_widget(transcript_widget, rows[0]);

    let pending = app
        .session
        .transcript
        .as_ref()
        .is_some_and(|t| t.is_pending());
    let input_title = if pending {
        " Waiting for reply… "
    } else if app.chat_focused {
        " Ask a follow-up question (Enter to send) "
    } else {
        " Press Tab to ask a follow-up question "
    };
    let border_style = if app.chat_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.chat_input.as_str()).block(
        Block::default()
            .title(input_title)
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(input, rows[1]);
}

/// How many trailing transcript messages fit the pane, roughly
fn visible_messages(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}
