// src/ui/widgets/findings_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::knowledge_base;
use crate::core::models::{Finding, VulnCategory};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

fn category_style(category: VulnCategory) -> Style {
    match category {
        VulnCategory::SqlInjection | VulnCategory::CommandInjection => Style::default().fg(Color::Red),
        VulnCategory::CrossSiteScripting => Style::default().fg(Color::Yellow),
    }
}

/// Findings as they arrive, with the selected one explained below the list.
pub fn render_findings_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (Navigate with ↑ ↓)");

    if app.findings.is_empty() {
        let content = match app.state {
            AppState::Disclaimer | AppState::Idle => {
                Paragraph::new("Findings will appear here as they are confirmed...").alignment(Alignment::Center)
            }
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame % SPINNER_CHARS.len()];
                let stage = app.stage.map(|s| s.to_string()).unwrap_or_else(|| "starting".to_string());
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("Scanning ({})... No findings yet.", stage)),
                ]))
                .alignment(Alignment::Center)
            }
            AppState::Finished => render_empty_result(app),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app
        .findings
        .iter()
        .map(|f| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", f.category), category_style(f.category)),
                Span::raw(f.url.clone()),
                Span::styled(format!("  ?{}", f.param), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let findings_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, chunks[0], &mut app.findings_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app
        .findings_list_state
        .selected()
        .and_then(|i| app.findings.get(i));
    match selected {
        Some(finding) => {
            let p = Paragraph::new(detail_text(finding)).wrap(Wrap { trim: true }).block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
        None => {
            let p = Paragraph::new("Select an item above to see details.")
                .alignment(Alignment::Center)
                .block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
    }
}

fn detail_text(finding: &Finding) -> Text<'static> {
    let mut lines = vec![
        Line::from(vec!["URL:       ".bold(), Span::raw(finding.url.clone())]),
        Line::from(vec!["Parameter: ".bold(), Span::raw(finding.param.clone())]),
        Line::from(vec!["Payload:   ".bold(), Span::styled(finding.payload.clone(), Style::default().fg(Color::Cyan))]),
    ];
    if let Some(detail) = knowledge_base::get_finding_detail(finding.category) {
        lines.extend([
            Line::from(""),
            Line::from(detail.title.red().bold()),
            Line::from(""),
            Line::from("WHAT IT IS:".yellow().bold()),
            Line::from(detail.description),
            Line::from(""),
            Line::from("HOW TO FIX:".yellow().bold()),
            Line::from(detail.remediation),
        ]);
    }
    Text::from(lines)
}

fn render_empty_result(app: &App) -> Paragraph<'static> {
    let text = match (&app.result, app.stop_requested) {
        (Some(_), false) => Text::from(vec![
            Line::from(""),
            Line::from("✓ NO VULNERABILITIES CONFIRMED".bold().fg(Color::Green)),
            Line::from(""),
            Line::from("None of the tested parameters reacted to the payload catalog."),
        ]),
        (Some(_), true) => Text::from(vec![
            Line::from(""),
            Line::from("Scan stopped before anything was confirmed.".yellow()),
        ]),
        (None, _) => Text::from(vec![
            Line::from(""),
            Line::from("✗ SCAN FAILED".bold().fg(Color::Red)),
            Line::from(""),
            Line::from("See the log panel for the reason."),
        ]),
    };
    Paragraph::new(text).alignment(Alignment::Center)
}
