use anyhow::Result;
use reqwest::blocking::Client;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::http_client::build_http_client;
use crate::provider::{PredictionProvider, ProviderError};
use crate::state::{Fight, Prediction, Source, value_to_opt_string};

const FIGHT_CARD_PROMPT: &str = "Identify the next scheduled UFC event and list every bout on its main card. \
For each bout give a unique id, the event name, the date, the weight class, both fighters' names \
and professional records, and the current moneyline odds for each side. Answer in JSON.";

const SOURCE_TITLE_FALLBACK: &str = "Source";
const SOURCE_URI_FALLBACK: &str = "#";
const ERROR_BODY_LIMIT: usize = 300;

/// Gemini `generateContent` with Google Search grounding and a JSON response
/// schema.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiProvider {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(cfg.request_timeout)?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            api_base: cfg.api_base.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    fn generate(&self, body: &Value) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|err| ProviderError::Transport(format!("failed reading body: {err}")))?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&text, ERROR_BODY_LIMIT),
            });
        }
        Ok(text)
    }
}

impl PredictionProvider for GeminiProvider {
    fn fetch_fight_card(&self) -> Result<Vec<Fight>, ProviderError> {
        let raw = self.generate(&fight_card_request())?;
        parse_fight_card_response(&raw)
    }

    fn fetch_prediction(&self, fight: &Fight) -> Result<Prediction, ProviderError> {
        let raw = self.generate(&prediction_request(fight))?;
        parse_prediction_response(&raw, fight)
    }
}

pub fn fight_card_request() -> Value {
    generate_body(FIGHT_CARD_PROMPT, fight_card_schema())
}

pub fn prediction_request(fight: &Fight) -> Value {
    generate_body(&prediction_prompt(fight), prediction_schema())
}

pub fn prediction_prompt(fight: &Fight) -> String {
    let a = &fight.fighter_a;
    let b = &fight.fighter_b;
    format!(
        "Analyze the UFC bout {} ({}) vs {} ({}).\n\
         Event: {}. Weight class: {}.\n\
         Pick a winner, give a confidence from 0 to 100, the most likely method of victory \
         (KO/TKO, Submission or Decision), the round if it ends early, and a short reasoning \
         covering recent form, the stylistic matchup and camp news. Search for the latest \
         fighter stats and news before answering.",
        a.name,
        a.record,
        b.name,
        b.record,
        fight.event,
        or_unknown(&fight.weight_class),
    )
}

fn generate_body(prompt: &str, schema: Value) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "tools": [{ "google_search": {} }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        },
    })
}

fn fighter_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "record": { "type": "STRING" },
        },
    })
}

pub fn fight_card_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "event": { "type": "STRING" },
                "date": { "type": "STRING" },
                "weightClass": { "type": "STRING" },
                "fighterA": fighter_schema(),
                "fighterB": fighter_schema(),
                "oddsA": { "type": "STRING" },
                "oddsB": { "type": "STRING" },
            },
            "required": ["id", "event", "fighterA", "fighterB"],
        },
    })
}

pub fn prediction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "fightId": { "type": "STRING" },
            "winner": { "type": "STRING" },
            "confidence": { "type": "NUMBER" },
            "method": { "type": "STRING" },
            "round": { "type": "STRING" },
            "reasoning": { "type": "STRING" },
        },
        "required": ["winner", "confidence", "method", "reasoning"],
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictionBody {
    winner: String,
    #[serde(deserialize_with = "confidence_lenient")]
    confidence: f64,
    method: String,
    #[serde(default, deserialize_with = "opt_text")]
    round: Option<String>,
    reasoning: String,
}

/// Reads a full `generateContent` response for the fight card. Anything that
/// is not a JSON array of fights comes back as `ProviderError::Malformed`.
pub fn parse_fight_card_response(raw: &str) -> Result<Vec<Fight>, ProviderError> {
    let envelope = parse_envelope(raw).map_err(ProviderError::Malformed)?;
    parse_fight_list(&response_text(&envelope))
}

/// Parses the model's answer text. Blank text is an empty card.
pub fn parse_fight_list(text: &str) -> Result<Vec<Fight>, ProviderError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<Fight>>(body)
        .map_err(|err| ProviderError::Malformed(err.to_string()))
}

pub fn parse_prediction_response(raw: &str, fight: &Fight) -> Result<Prediction, ProviderError> {
    let envelope = parse_envelope(raw).map_err(ProviderError::PredictionFailed)?;
    let sources = grounding_sources(&envelope);
    let text = response_text(&envelope);
    let body = match strip_code_fence(&text) {
        "" => "{}",
        body => body,
    };
    let parsed: PredictionBody = serde_json::from_str(body)
        .map_err(|err| ProviderError::PredictionFailed(err.to_string()))?;

    Ok(Prediction {
        fight_id: fight.id.clone(),
        winner: parsed.winner.trim().to_string(),
        confidence: parsed.confidence,
        method: parsed.method.trim().to_string(),
        round: parsed.round,
        reasoning: parsed.reasoning.trim().to_string(),
        sources,
    })
}

fn parse_envelope(raw: &str) -> Result<GenerateResponse, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(GenerateResponse::default());
    }
    serde_json::from_str(trimmed).map_err(|err| format!("invalid generateContent json: {err}"))
}

fn response_text(envelope: &GenerateResponse) -> String {
    let Some(content) = envelope
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
    else {
        return String::new();
    };
    content
        .parts
        .iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .concat()
}

fn grounding_sources(envelope: &GenerateResponse) -> Vec<Source> {
    let Some(metadata) = envelope
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
    else {
        return Vec::new();
    };
    metadata
        .grounding_chunks
        .iter()
        .map(|chunk| {
            let web = chunk.web.as_ref();
            Source {
                title: non_empty(web.and_then(|w| w.title.as_deref()))
                    .unwrap_or(SOURCE_TITLE_FALLBACK)
                    .to_string(),
                uri: non_empty(web.and_then(|w| w.uri.as_deref()))
                    .unwrap_or(SOURCE_URI_FALLBACK)
                    .to_string(),
            }
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "unknown"
    } else {
        value
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

fn confidence_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| de::Error::custom(format!("confidence is not a number: {value}")))
}

fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_opt_string(Value::deserialize(deserializer)?))
}
