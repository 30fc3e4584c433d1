use chrono::DateTime;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::ledger::format_amount;
use crate::state::{
    AppState, AppStatus, BetField, BetForm, BetState, CardState, Corner, Fight, PredictionState,
};

pub fn draw(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match &state.status {
        AppStatus::Loading => render_loading(frame, chunks[1]),
        AppStatus::Error(message) => render_error(frame, chunks[1], message),
        AppStatus::Idle => render_board(frame, chunks[1], state),
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

pub fn header_text(state: &AppState) -> String {
    let status = match &state.status {
        AppStatus::Loading => "LOADING".to_string(),
        AppStatus::Error(_) => "ERROR".to_string(),
        AppStatus::Idle => format!(
            "{} bouts | {} bets on card | ${} staked across {} bets",
            state.cards.len(),
            state.logged_bet_count(),
            format_amount(state.open_stake),
            state.open_bets
        ),
    };
    let event = state
        .cards
        .first()
        .map(|c| {
            if c.fight.date.is_empty() {
                c.fight.event.clone()
            } else {
                format!("{} | {}", c.fight.event, c.fight.date)
            }
        })
        .unwrap_or_else(|| "AI-driven UFC intelligence".to_string());
    format!(" [O] OCTAGON ORACLE | {status}\n     {event}")
}

pub fn footer_text(state: &AppState) -> String {
    if state.bet_form_open() {
        return "Tab/↑/↓ Field | ←/→ Fighter | Enter Save | Esc Cancel".to_string();
    }
    match state.status {
        AppStatus::Error(_) => "r Retry connection | ? Help | q Quit".to_string(),
        AppStatus::Loading => "? Help | q Quit".to_string(),
        AppStatus::Idle => {
            "j/k/↑/↓ Move | p/Enter Predict | b Log bet | x Clear bet | r Reload | ? Help | q Quit"
                .to_string()
        }
    }
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let text = Paragraph::new("Scanning the Octagon...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(text, centered_rect(60, 20, area));
}

fn render_error(frame: &mut Frame, area: Rect, message: &str) {
    let text = format!("{message}\n\nPress r to retry connection");
    let panel = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("System Interruption")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(panel, centered_rect(70, 50, area));
}

fn render_board(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.cards.is_empty() {
        let empty = Paragraph::new("No upcoming fights found in the current window.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, centered_rect(80, 20, area));
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(30)])
        .split(area);

    render_card_list(frame, columns[0], state);
    if let Some(card) = state.selected_card() {
        render_card(frame, columns[1], card);
    }
}

fn render_card_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title("Current Event Board")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(state.selected, state.cards.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let selected = idx == state.selected;
        let style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let text = card_row_text(&state.cards[idx], selected);
        frame.render_widget(Paragraph::new(text).style(style), row_area);
    }
}

pub fn card_row_text(card: &CardState, selected: bool) -> String {
    let prefix = if selected { "> " } else { "  " };
    let mut markers = String::new();
    match card.prediction {
        PredictionState::Requesting { .. } => markers.push_str(" ..."),
        PredictionState::Predicted(_) => markers.push_str(" [AI]"),
        PredictionState::Idle | PredictionState::FailedSilent => {}
    }
    if matches!(card.bet, BetState::Logged(_)) {
        markers.push_str(" [$]");
    }
    format!("{prefix}{}{markers}", card.fight.matchup())
}

fn render_card(frame: &mut Frame, area: Rect, card: &CardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(8),
        ])
        .split(area);

    let title = if card.fight.weight_class.is_empty() {
        card.fight.event.clone()
    } else {
        format!("{} | {}", card.fight.weight_class, card.fight.event)
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(rows[0]);
    frame.render_widget(block, rows[0]);

    let corners = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(10),
            Constraint::Percentage(45),
        ])
        .split(inner);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    frame.render_widget(
        Paragraph::new(fighter_text(&card.fight, Corner::A)).alignment(Alignment::Center),
        corners[0],
    );
    frame.render_widget(
        Paragraph::new("VS")
            .alignment(Alignment::Center)
            .style(bold.fg(Color::Red)),
        corners[1],
    );
    frame.render_widget(
        Paragraph::new(fighter_text(&card.fight, Corner::B)).alignment(Alignment::Center),
        corners[2],
    );

    let prediction = Paragraph::new(prediction_text(card))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("AI Analysis").borders(Borders::ALL));
    frame.render_widget(prediction, rows[1]);

    let bet = Paragraph::new(bet_text(card))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Bet Log").borders(Borders::ALL));
    frame.render_widget(bet, rows[2]);
}

pub fn fighter_text(fight: &Fight, corner: Corner) -> String {
    let fighter = fight.fighter(corner);
    let mut lines = vec![
        fighter.name.clone(),
        fighter.record.clone(),
        fight.odds(corner).unwrap_or("N/A").to_string(),
    ];
    if let Some(attrs) = fighter.attributes_line() {
        lines.push(attrs);
    }
    lines.join("\n")
}

pub fn prediction_text(card: &CardState) -> String {
    match &card.prediction {
        PredictionState::Idle | PredictionState::FailedSilent => {
            "[p] Generate AI Analysis".to_string()
        }
        PredictionState::Requesting { .. } => "Consulting the Oracle...".to_string(),
        PredictionState::Predicted(p) => {
            let mut lines = vec![
                format!(
                    "AI Pick: {}    Confidence: {}%",
                    p.winner.to_uppercase(),
                    format_confidence(p.confidence)
                ),
                format!(
                    "Method: {}    Projected End: {}",
                    p.method,
                    p.round.as_deref().unwrap_or("Full Fight")
                ),
                String::new(),
                format!("\"{}\"", p.reasoning),
            ];
            if !p.sources.is_empty() {
                lines.push(String::new());
                lines.push("Grounding Sources:".to_string());
                for source in &p.sources {
                    lines.push(format!("- {} <{}>", source.title, source.uri));
                }
            }
            lines.join("\n")
        }
    }
}

pub fn bet_text(card: &CardState) -> String {
    match &card.bet {
        BetState::NoBet => "No bet logged. [b] Log a bet".to_string(),
        BetState::Logged(bet) => {
            let placed = DateTime::from_timestamp_millis(bet.timestamp)
                .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("Logged: {}\nPlaced {placed}\n[x] Clear bet", bet.summary())
        }
        BetState::FormOpen(form) => bet_form_text(&card.fight, form),
    }
}

fn bet_form_text(fight: &Fight, form: &BetForm) -> String {
    let marker = |field: BetField| if form.focus == field { ">" } else { " " };
    let mut lines = vec![
        format!(
            "{} Fighter: < {} >",
            marker(BetField::Fighter),
            fight.fighter(form.corner).name
        ),
        format!("{} Amount:  ${}", marker(BetField::Amount), form.amount),
        format!("{} Odds:    {}", marker(BetField::Odds), form.odds),
    ];
    if let Some(err) = &form.error {
        lines.push(format!("! {err}"));
    }
    lines.join("\n")
}

fn format_confidence(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format_amount(confidence)
    } else {
        format!("{confidence:.1}")
    }
}

pub fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Octagon Oracle - Help",
        "",
        "Board:",
        "  j/k or ↑/↓   Select bout",
        "  p / Enter    Generate AI analysis",
        "  b            Log a bet",
        "  x            Clear logged bet",
        "  r            Reload fight card",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Bet form:",
        "  Tab / ↑/↓    Next / previous field",
        "  ←/→ / Space  Switch fighter",
        "  Enter        Save",
        "  Esc          Cancel",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_range_keeps_selection_centered() {
        assert_eq!(visible_range(0, 0, 5), (0, 0));
        assert_eq!(visible_range(3, 4, 10), (0, 4));
        assert_eq!(visible_range(10, 20, 6), (7, 13));
        assert_eq!(visible_range(19, 20, 6), (14, 20));
    }

    #[test]
    fn confidence_prints_whole_numbers_plainly() {
        assert_eq!(format_confidence(72.0), "72");
        assert_eq!(format_confidence(64.3), "64.3");
    }
}
