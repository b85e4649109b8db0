//! Full-screen view of lookup results
//!
//! One bordered card per city, coloured by how trustworthy the data is, with
//! a key hint at the bottom.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{outcome_notice, report_lines, Severity};
use crate::config::Units;
use crate::data::FetchOutcome;

/// Renders every outcome as a card
pub fn render(frame: &mut Frame, outcomes: &[FetchOutcome], units: Units) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    if !outcomes.is_empty() {
        let card_count = outcomes.len() as u32;
        let constraints: Vec<Constraint> = outcomes
            .iter()
            .map(|_| Constraint::Ratio(1, card_count))
            .collect();
        let cards = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(chunks[0]);

        for (outcome, card_area) in outcomes.iter().zip(cards.iter()) {
            render_card(frame, outcome, units, *card_area);
        }
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("q/Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[1]);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Danger => Color::Red,
    }
}

fn render_card(frame: &mut Frame, outcome: &FetchOutcome, units: Units, area: Rect) {
    let notice = outcome_notice(outcome);
    let color = severity_color(notice.severity);

    let mut lines: Vec<Line> = Vec::new();
    match outcome {
        FetchOutcome::Served(report) => {
            let mut text = report_lines(report, units).into_iter();
            if let Some(headline) = text.next() {
                lines.push(Line::from(Span::styled(
                    headline,
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
            lines.extend(text.map(Line::from));
        }
        FetchOutcome::NoData { reason, .. } => {
            lines.push(Line::from(Span::styled(
                format!("No data ({})", reason),
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }
    }
    lines.push(Line::from(Span::styled(
        notice.message,
        Style::default().fg(color),
    )));

    let block = Block::default()
        .title(format!(" {} ", outcome.city()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}
