use std::collections::VecDeque;

use anyhow::Result;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::ledger::{BetLedger, LoggedBet, parse_amount};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub record: String,
    #[serde(default, deserialize_with = "opt_u32_lenient")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub reach: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub stance: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub style: Option<String>,
}

impl Fighter {
    pub fn new(name: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record: record.into(),
            age: None,
            height: None,
            reach: None,
            stance: None,
            style: None,
        }
    }

    /// Optional attributes joined for display, e.g. "31y | 6'4\" | Orthodox".
    pub fn attributes_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(age) = self.age {
            parts.push(format!("{age}y"));
        }
        for value in [&self.height, &self.reach, &self.stance, &self.style]
            .into_iter()
            .flatten()
        {
            parts.push(value.clone());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fight {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub event: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub weight_class: String,
    pub fighter_a: Fighter,
    pub fighter_b: Fighter,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub odds_a: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub odds_b: Option<String>,
}

impl Fight {
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.fighter_a.name, self.fighter_b.name)
    }

    pub fn fighter(&self, corner: Corner) -> &Fighter {
        match corner {
            Corner::A => &self.fighter_a,
            Corner::B => &self.fighter_b,
        }
    }

    pub fn odds(&self, corner: Corner) -> Option<&str> {
        match corner {
            Corner::A => self.odds_a.as_deref(),
            Corner::B => self.odds_b.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub fight_id: String,
    pub winner: String,
    // Expected 0-100; the service is trusted, not clamped.
    pub confidence: f64,
    pub method: String,
    pub round: Option<String>,
    pub reasoning: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    Loading,
    Idle,
    Error(String),
}

pub const FIGHT_CARD_ERROR: &str =
    "Failed to fetch upcoming UFC events. Check your API connection.";

/// Per-card prediction flow. `FailedSilent` renders exactly like `Idle`: the
/// trigger comes back and no banner is shown.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionState {
    Idle,
    Requesting { seq: u64 },
    Predicted(Prediction),
    FailedSilent,
}

impl PredictionState {
    pub fn can_request(&self) -> bool {
        matches!(self, PredictionState::Idle | PredictionState::FailedSilent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    A,
    B,
}

impl Corner {
    pub fn other(self) -> Self {
        match self {
            Corner::A => Corner::B,
            Corner::B => Corner::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetField {
    Fighter,
    Amount,
    Odds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetForm {
    pub corner: Corner,
    pub amount: String,
    pub odds: String,
    pub focus: BetField,
    pub error: Option<String>,
}

impl BetForm {
    pub fn new(fight: &Fight) -> Self {
        Self {
            corner: Corner::A,
            amount: String::new(),
            odds: fight.odds(Corner::A).unwrap_or_default().to_string(),
            focus: BetField::Amount,
            error: None,
        }
    }

    /// Switches corner. The odds field follows the corner unless the user
    /// typed their own price.
    pub fn toggle_corner(&mut self, fight: &Fight) {
        let prefilled = fight.odds(self.corner).unwrap_or_default();
        let follow = self.odds.trim().is_empty() || self.odds == prefilled;
        self.corner = self.corner.other();
        if follow {
            self.odds = fight.odds(self.corner).unwrap_or_default().to_string();
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            BetField::Fighter => BetField::Amount,
            BetField::Amount => BetField::Odds,
            BetField::Odds => BetField::Fighter,
        };
    }

    pub fn prev_field(&mut self) {
        self.focus = match self.focus {
            BetField::Fighter => BetField::Odds,
            BetField::Amount => BetField::Fighter,
            BetField::Odds => BetField::Amount,
        };
    }

    pub fn push_char(&mut self, ch: char) {
        match self.focus {
            BetField::Fighter => {}
            BetField::Amount => self.amount.push(ch),
            BetField::Odds => self.odds.push(ch),
        }
        self.error = None;
    }

    pub fn backspace(&mut self) {
        match self.focus {
            BetField::Fighter => {}
            BetField::Amount => {
                self.amount.pop();
            }
            BetField::Odds => {
                self.odds.pop();
            }
        }
    }

    /// Required-field check only; numeric parsing is lenient and happens at save.
    pub fn validate(&self) -> Result<(), String> {
        if self.amount.trim().is_empty() {
            return Err("Amount is required".to_string());
        }
        if self.odds.trim().is_empty() {
            return Err("Odds are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BetState {
    NoBet,
    FormOpen(BetForm),
    Logged(LoggedBet),
}

#[derive(Debug, Clone)]
pub struct CardState {
    pub fight: Fight,
    pub prediction: PredictionState,
    pub bet: BetState,
}

impl CardState {
    pub fn new(fight: Fight, bet: Option<LoggedBet>) -> Self {
        Self {
            fight,
            prediction: PredictionState::Idle,
            bet: bet.map_or(BetState::NoBet, BetState::Logged),
        }
    }

    /// A card starts in `Logged` when the ledger already holds a bet for it.
    pub fn mount(fight: Fight, ledger: &BetLedger) -> Result<Self> {
        let bet = ledger.get_bet(&fight.id)?;
        Ok(Self::new(fight, bet))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: AppStatus,
    pub cards: Vec<CardState>,
    pub selected: usize,
    pub generation: u64,
    pub next_request_seq: u64,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    /// Every bet in the ledger, including fights no longer on the card.
    pub open_bets: usize,
    pub open_stake: f64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status: AppStatus::Loading,
            cards: Vec::with_capacity(16),
            selected: 0,
            generation: 0,
            next_request_seq: 1,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            open_bets: 0,
            open_stake: 0.0,
        }
    }

    /// Drops every card and returns the generation the next fight card
    /// response must carry to be accepted.
    pub fn begin_reload(&mut self) -> u64 {
        self.generation += 1;
        self.status = AppStatus::Loading;
        self.cards.clear();
        self.selected = 0;
        self.generation
    }

    pub fn mount_cards(&mut self, fights: Vec<Fight>, ledger: &BetLedger) {
        self.cards.clear();
        for fight in fights {
            let bet = match ledger.get_bet(&fight.id) {
                Ok(bet) => bet,
                Err(err) => {
                    self.push_log(format!("[WARN] Bet lookup failed for {}: {err:#}", fight.id));
                    None
                }
            };
            self.cards.push(CardState::new(fight, bet));
        }
        self.selected = 0;
        self.status = AppStatus::Idle;
        self.refresh_stakes(ledger);
        match ledger.unreadable_ids() {
            Ok(ids) if !ids.is_empty() => {
                self.push_log(format!("[WARN] Unreadable bets kept as-is: {}", ids.join(", ")));
            }
            _ => {}
        }
    }

    pub fn refresh_stakes(&mut self, ledger: &BetLedger) {
        match ledger.all_bets() {
            Ok(bets) => {
                self.open_bets = bets.len();
                self.open_stake = bets.values().map(|b| b.amount).sum();
            }
            Err(err) => self.push_log(format!("[WARN] Bet ledger unreadable: {err:#}")),
        }
    }

    pub fn card_index(&self, fight_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.fight.id == fight_id)
    }

    pub fn selected_card(&self) -> Option<&CardState> {
        self.cards.get(self.selected)
    }

    pub fn selected_card_mut(&mut self) -> Option<&mut CardState> {
        self.cards.get_mut(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.cards.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1).min(self.cards.len() - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn logged_bet_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| matches!(c.bet, BetState::Logged(_)))
            .count()
    }

    pub fn bet_form_open(&self) -> bool {
        self.selected_card()
            .is_some_and(|c| matches!(c.bet, BetState::FormOpen(_)))
    }

    /// Moves the selected card into `Requesting` and returns the command to
    /// send. Returns `None` while a request is in flight or once a
    /// prediction exists.
    pub fn request_prediction(&mut self) -> Option<ProviderCommand> {
        if self.status != AppStatus::Idle {
            return None;
        }
        let seq = self.next_request_seq;
        let card = self.cards.get_mut(self.selected)?;
        if !card.prediction.can_request() {
            return None;
        }
        self.next_request_seq += 1;
        card.prediction = PredictionState::Requesting { seq };
        Some(ProviderCommand::FetchPrediction {
            fight: card.fight.clone(),
            seq,
        })
    }

    pub fn open_bet_form(&mut self) -> bool {
        let Some(card) = self.selected_card_mut() else {
            return false;
        };
        if !matches!(card.bet, BetState::NoBet) {
            return false;
        }
        card.bet = BetState::FormOpen(BetForm::new(&card.fight));
        true
    }

    pub fn cancel_bet_form(&mut self) {
        if let Some(card) = self.selected_card_mut() {
            if matches!(card.bet, BetState::FormOpen(_)) {
                card.bet = BetState::NoBet;
            }
        }
    }

    pub fn bet_form(&self) -> Option<&BetForm> {
        match &self.selected_card()?.bet {
            BetState::FormOpen(form) => Some(form),
            _ => None,
        }
    }

    pub fn bet_form_mut(&mut self) -> Option<&mut BetForm> {
        match &mut self.selected_card_mut()?.bet {
            BetState::FormOpen(form) => Some(form),
            _ => None,
        }
    }

    pub fn toggle_bet_corner(&mut self) {
        let Some(card) = self.selected_card_mut() else {
            return;
        };
        if let BetState::FormOpen(form) = &mut card.bet {
            form.toggle_corner(&card.fight);
        }
    }

    /// Validates and persists the open form. On a blank required field or a
    /// storage failure the form stays open with a message.
    pub fn submit_bet_form(&mut self, ledger: &mut BetLedger) -> Option<LoggedBet> {
        let idx = self.selected;
        let card = self.cards.get_mut(idx)?;
        let BetState::FormOpen(form) = &mut card.bet else {
            return None;
        };
        if let Err(msg) = form.validate() {
            form.error = Some(msg);
            return None;
        }

        let fighter_name = card.fight.fighter(form.corner).name.clone();
        let coerced = parse_amount(&form.amount).is_none();
        let amount_raw = form.amount.clone();
        match ledger.save_bet(&card.fight.id, &fighter_name, &form.amount, form.odds.trim()) {
            Ok(bet) => {
                card.bet = BetState::Logged(bet.clone());
                if coerced {
                    self.push_log(format!(
                        "[WARN] Amount {amount_raw:?} is not a number, logged as $0"
                    ));
                }
                self.push_log(format!("[INFO] Bet logged: {}", bet.summary()));
                self.refresh_stakes(ledger);
                Some(bet)
            }
            Err(err) => {
                form.error = Some("Could not save bet".to_string());
                self.push_log(format!("[WARN] Bet save failed: {err:#}"));
                None
            }
        }
    }

    pub fn clear_selected_bet(&mut self, ledger: &mut BetLedger) -> bool {
        let idx = self.selected;
        let Some(card) = self.cards.get_mut(idx) else {
            return false;
        };
        if !matches!(card.bet, BetState::Logged(_)) {
            return false;
        }
        match ledger.clear_bet(&card.fight.id) {
            Ok(()) => {
                card.bet = BetState::NoBet;
                let matchup = card.fight.matchup();
                self.push_log(format!("[INFO] Bet cleared: {matchup}"));
                self.refresh_stakes(ledger);
                true
            }
            Err(err) => {
                self.push_log(format!("[WARN] Bet clear failed: {err:#}"));
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    FightsLoaded {
        generation: u64,
        fights: Vec<Fight>,
    },
    FightsFailed {
        generation: u64,
        error: String,
    },
    PredictionReady {
        fight_id: String,
        seq: u64,
        prediction: Prediction,
    },
    PredictionFailed {
        fight_id: String,
        seq: u64,
        error: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchFightCard { generation: u64 },
    FetchPrediction { fight: Fight, seq: u64 },
}

pub fn apply_delta(state: &mut AppState, ledger: &BetLedger, delta: Delta) {
    match delta {
        Delta::FightsLoaded { generation, fights } => {
            if generation != state.generation {
                state.push_log("[INFO] Discarded fight card from an earlier load");
                return;
            }
            let count = fights.len();
            state.mount_cards(fights, ledger);
            state.push_log(format!("[INFO] Fight card loaded: {count} bouts"));
        }
        Delta::FightsFailed { generation, error } => {
            if generation != state.generation {
                return;
            }
            state.cards.clear();
            state.selected = 0;
            state.status = AppStatus::Error(FIGHT_CARD_ERROR.to_string());
            state.push_log(format!("[WARN] Fight card error: {error}"));
        }
        Delta::PredictionReady {
            fight_id,
            seq,
            prediction,
        } => {
            let Some(card) = pending_card(state, &fight_id, seq) else {
                state.push_log(format!("[INFO] Discarded stale prediction for {fight_id}"));
                return;
            };
            let line = format!(
                "[INFO] Prediction ready: {} -> {}",
                card.fight.matchup(),
                prediction.winner
            );
            card.prediction = PredictionState::Predicted(prediction);
            state.push_log(line);
        }
        Delta::PredictionFailed {
            fight_id,
            seq,
            error,
        } => {
            let Some(card) = pending_card(state, &fight_id, seq) else {
                return;
            };
            card.prediction = PredictionState::FailedSilent;
            let line = format!("[WARN] Prediction failed for {}: {error}", card.fight.matchup());
            state.push_log(line);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

// Only the request that put the card into `Requesting` may complete it.
fn pending_card<'a>(state: &'a mut AppState, fight_id: &str, seq: u64) -> Option<&'a mut CardState> {
    let idx = state.card_index(fight_id)?;
    let card = state.cards.get_mut(idx)?;
    match card.prediction {
        PredictionState::Requesting { seq: pending } if pending == seq => Some(card),
        _ => None,
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_opt_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(value_to_opt_string(Value::deserialize(deserializer)?))
}

fn opt_u32_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let parsed = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.and_then(|v| u32::try_from(v).ok()))
}

pub(crate) fn value_to_opt_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
