// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Renders the authorised-use notice over the rest of the UI.
///
/// Shown once at startup; nothing can be scanned until it is acknowledged.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("AUTHORISED USE ONLY".bold().yellow()),
        Line::from(""),
        Line::from("Strata runs port scans, crawls web services and sends injection payloads to every parameter it finds. These are active tests that change traffic patterns, fill logs and may alter data on the target."),
        Line::from(""),
        Line::from("Only scan hosts you own or hold explicit, written permission to test. Unauthorised scanning is illegal in many jurisdictions."),
        Line::from(""),
        Line::from("By continuing you confirm that:"),
        Line::from("1. The targets you enter are in scope of an authorised assessment."),
        Line::from("2. You accept responsibility for the traffic this tool generates."),
        Line::from("3. The authors accept no liability for misuse or damage."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to acknowledge and continue".bold()),
    ]);

    let block = Block::default()
        .title("Disclaimer")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 70, area);
    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the UI underneath does not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A rectangle of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
