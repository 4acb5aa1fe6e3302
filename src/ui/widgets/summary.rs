// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use crate::core::models::{SessionState, VulnCategory};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use strum::IntoEnumIterator;

fn stage_style(stage: Option<SessionState>) -> Style {
    match stage {
        Some(SessionState::Completed) => Style::default().fg(Color::Green),
        Some(SessionState::Cancelled) => Style::default().fg(Color::Yellow),
        Some(SessionState::Failed) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Cyan),
    }
}

/// Renders the summary panel: where the session is, what recon found, and how
/// many findings each category produced.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    let inner = summary_container.inner(area);
    frame.render_widget(summary_container, area);

    if matches!(app.state, AppState::Disclaimer | AppState::Idle) {
        return;
    }

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Session
            Constraint::Length(1), // Spacer
            Constraint::Length(5), // Findings by category
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Recon
        ])
        .split(inner);

    // --- Session ---
    let stage = app.stage.map(|s| s.to_string()).unwrap_or_else(|| "starting".to_string());
    let address = app
        .result
        .as_ref()
        .and_then(|r| r.address)
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let session_lines = vec![
        Line::from(vec![Span::raw("Stage:   "), Span::styled(stage, stage_style(app.stage))]),
        Line::from(vec![Span::raw("Address: "), Span::raw(address)]),
        Line::from(vec![Span::raw("Web targets crawled: "), Span::raw(app.web_targets.to_string())]),
    ];
    frame.render_widget(
        Paragraph::new(session_lines).block(Block::default().title("SESSION".bold())),
        summary_chunks[0],
    );

    // --- Findings by category ---
    let counts = app.findings_by_category();
    let mut finding_lines: Vec<Line> = VulnCategory::iter()
        .map(|category| {
            let count = counts.get(&category).copied().unwrap_or(0);
            let style = if count > 0 { Style::default().fg(Color::Red) } else { Style::default().fg(Color::Green) };
            Line::from(vec![Span::raw(format!("{}: ", category)), Span::styled(count.to_string(), style)])
        })
        .collect();
    finding_lines.push(Line::from(format!("Total: {}", app.findings.len())));
    frame.render_widget(
        Paragraph::new(finding_lines).block(Block::default().title("FINDINGS".bold())),
        summary_chunks[2],
    );

    // --- Recon ---
    let mut recon_lines = Vec::new();
    match &app.result {
        Some(result) => {
            let recon = &result.recon_results;
            recon_lines.push(Line::from(vec![Span::raw("OS: "), Span::styled(recon.os_info.clone(), Style::default().fg(Color::Cyan))]));
            let ports = if recon.open_ports.is_empty() {
                "none".to_string()
            } else {
                recon.open_ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
            };
            recon_lines.push(Line::from(format!("Open ports: {}", ports)));
            recon_lines.push(Line::from(format!("Artifacts: {}", recon.artifacts.len())));
        }
        None if app.state == AppState::Finished => {
            recon_lines.push(Line::from(Span::styled("No results: the scan failed.", Style::default().fg(Color::Red))));
        }
        None => recon_lines.push(Line::from("Available when the scan ends.")),
    }
    frame.render_widget(
        Paragraph::new(recon_lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("RECON".bold())),
        summary_chunks[4],
    );
}
