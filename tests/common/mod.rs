#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use octagon_oracle::ledger::BetLedger;
use octagon_oracle::provider::{PredictionProvider, ProviderError};
use octagon_oracle::state::{Fight, Fighter, Prediction};
use octagon_oracle::store::MemoryStore;

pub enum CardReply {
    Fights(Vec<Fight>),
    Malformed,
    Down,
}

pub enum PredictionReply {
    Pick { winner: String, confidence: f64 },
    Fail,
}

pub struct MockProvider {
    pub card: CardReply,
    pub prediction: PredictionReply,
    pub delays: HashMap<String, Duration>,
    pub card_calls: AtomicUsize,
    pub prediction_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(card: CardReply, prediction: PredictionReply) -> Self {
        Self {
            card,
            prediction,
            delays: HashMap::new(),
            card_calls: AtomicUsize::new(0),
            prediction_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, fight_id: &str, delay: Duration) -> Self {
        self.delays.insert(fight_id.to_string(), delay);
        self
    }
}

impl PredictionProvider for MockProvider {
    fn fetch_fight_card(&self) -> Result<Vec<Fight>, ProviderError> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        match &self.card {
            CardReply::Fights(fights) => Ok(fights.clone()),
            CardReply::Malformed => Err(ProviderError::Malformed("expected value".to_string())),
            CardReply::Down => Err(ProviderError::Transport("connection refused".to_string())),
        }
    }

    fn fetch_prediction(&self, fight: &Fight) -> Result<Prediction, ProviderError> {
        self.prediction_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&fight.id) {
            thread::sleep(*delay);
        }
        match &self.prediction {
            PredictionReply::Pick { winner, confidence } => Ok(Prediction {
                fight_id: "whatever-the-model-said".to_string(),
                winner: winner.clone(),
                confidence: *confidence,
                method: "Decision".to_string(),
                round: None,
                reasoning: "Sharper striking.".to_string(),
                sources: Vec::new(),
            }),
            PredictionReply::Fail => Err(ProviderError::PredictionFailed(
                "missing field `winner`".to_string(),
            )),
        }
    }
}

pub fn fight(id: &str, a: &str, b: &str) -> Fight {
    Fight {
        id: id.to_string(),
        event: "Card 42".to_string(),
        date: "2026-11-14".to_string(),
        weight_class: "Lightweight".to_string(),
        fighter_a: Fighter::new(a, "10-0"),
        fighter_b: Fighter::new(b, "9-1"),
        odds_a: Some("-150".to_string()),
        odds_b: Some("-120".to_string()),
    }
}

pub fn memory_ledger() -> BetLedger {
    BetLedger::new(Box::new(MemoryStore::default()))
}

pub fn prediction(fight_id: &str, winner: &str, confidence: f64) -> Prediction {
    Prediction {
        fight_id: fight_id.to_string(),
        winner: winner.to_string(),
        confidence,
        method: "Decision".to_string(),
        round: None,
        reasoning: "Cardio edge in the later rounds.".to_string(),
        sources: Vec::new(),
    }
}
