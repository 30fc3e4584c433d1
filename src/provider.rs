use std::collections::HashSet;

use crate::state::{Fight, Prediction};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("missing API key (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("Prediction generation failed: {0}")]
    PredictionFailed(String),
}

/// The external intelligence behind the board: one call for the fight card,
/// one per prediction.
pub trait PredictionProvider: Send + Sync {
    fn fetch_fight_card(&self) -> Result<Vec<Fight>, ProviderError>;
    fn fetch_prediction(&self, fight: &Fight) -> Result<Prediction, ProviderError>;
}

/// Loads the upcoming card. A response that cannot be read as a fight list
/// yields an empty card and a warning on `log`; every other failure is
/// returned. Ids stay unique: later duplicates are dropped.
pub fn load_upcoming_fights(
    provider: &dyn PredictionProvider,
    mut log: impl FnMut(String),
) -> Result<Vec<Fight>, ProviderError> {
    let fights = match provider.fetch_fight_card() {
        Ok(fights) => fights,
        Err(ProviderError::Malformed(reason)) => {
            log(format!("[WARN] Failed to parse fights: {reason}"));
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let mut seen = HashSet::with_capacity(fights.len());
    let mut out = Vec::with_capacity(fights.len());
    for fight in fights {
        if seen.insert(fight.id.clone()) {
            out.push(fight);
        } else {
            log(format!("[WARN] Duplicate fight id {} dropped", fight.id));
        }
    }
    Ok(out)
}

pub fn predict(
    provider: &dyn PredictionProvider,
    fight: &Fight,
) -> Result<Prediction, ProviderError> {
    let mut prediction = provider.fetch_prediction(fight)?;
    prediction.fight_id = fight.id.clone();
    Ok(prediction)
}
