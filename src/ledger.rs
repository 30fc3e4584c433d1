use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::KeyValueStore;

/// Storage key holding the whole fight id -> bet mapping.
pub const BETS_KEY: &str = "octagon_oracle.bets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedBet {
    pub fight_id: String,
    pub fighter_name: String,
    pub amount: f64,
    pub odds: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl LoggedBet {
    pub fn summary(&self) -> String {
        format!(
            "${} on {} @ {}",
            format_amount(self.amount),
            self.fighter_name,
            self.odds
        )
    }
}

/// Self-tracked wagers, one per fight. Every write rewrites the whole mapping
/// under [`BETS_KEY`]; callers serialize writes.
pub struct BetLedger {
    store: Box<dyn KeyValueStore>,
    key: String,
}

impl BetLedger {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_key(store, BETS_KEY)
    }

    pub fn with_key(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn get_bet(&self, fight_id: &str) -> Result<Option<LoggedBet>> {
        let entries = self.load()?;
        Ok(entries.get(fight_id).and_then(decode_bet))
    }

    /// Every readable bet. Entries that no longer deserialize are skipped here
    /// and reported by [`BetLedger::unreadable_ids`].
    pub fn all_bets(&self) -> Result<BTreeMap<String, LoggedBet>> {
        let entries = self.load()?;
        Ok(entries
            .iter()
            .filter_map(|(id, value)| decode_bet(value).map(|bet| (id.clone(), bet)))
            .collect())
    }

    pub fn unreadable_ids(&self) -> Result<Vec<String>> {
        let entries = self.load()?;
        Ok(entries
            .iter()
            .filter(|(_, value)| decode_bet(value).is_none())
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Records a bet, replacing any earlier one for the same fight. `amount`
    /// is raw user input; anything that does not parse is stored as 0.
    /// Other entries are written back untouched, readable or not.
    pub fn save_bet(
        &mut self,
        fight_id: &str,
        fighter_name: &str,
        amount: &str,
        odds: &str,
    ) -> Result<LoggedBet> {
        let bet = LoggedBet {
            fight_id: fight_id.to_string(),
            fighter_name: fighter_name.to_string(),
            amount: parse_amount(amount).unwrap_or(0.0),
            odds: odds.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let mut entries = self.load()?;
        let value = serde_json::to_value(&bet).context("serialize bet")?;
        entries.insert(fight_id.to_string(), value);
        self.persist(&entries)?;
        Ok(bet)
    }

    pub fn clear_bet(&mut self, fight_id: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(fight_id).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }

    // Raw entries keyed by fight id. Only a mapping that is not a JSON object
    // reads as empty; store errors propagate.
    fn load(&self) -> Result<BTreeMap<String, Value>> {
        let raw = self
            .store
            .get(&self.key)
            .with_context(|| format!("read {}", self.key))?;
        let Some(raw) = raw else {
            return Ok(BTreeMap::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    fn persist(&mut self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_string(entries).context("serialize bets")?;
        self.store
            .set(&self.key, &json)
            .with_context(|| format!("write {}", self.key))
    }
}

fn decode_bet(value: &Value) -> Option<LoggedBet> {
    LoggedBet::deserialize(value).ok()
}

/// Parses a stake typed by the user. Accepts a leading `$` and thousands
/// separators; returns `None` for anything else.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let value = cleaned.trim().parse::<f64>().ok()?;
    if value.is_finite() { Some(value) } else { None }
}

pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    }
}
