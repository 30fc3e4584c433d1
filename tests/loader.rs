mod common;

use common::{CardReply, MockProvider, PredictionReply, fight};
use octagon_oracle::provider::{ProviderError, load_upcoming_fights, predict};

fn pick() -> PredictionReply {
    PredictionReply::Pick {
        winner: "B".to_string(),
        confidence: 72.0,
    }
}

#[test]
fn loads_fights_in_service_order() {
    let provider = MockProvider::new(
        CardReply::Fights(vec![fight("f1", "A", "B"), fight("f2", "C", "D")]),
        pick(),
    );
    let mut logs = Vec::new();
    let fights = load_upcoming_fights(&provider, |line| logs.push(line)).expect("load");
    let matchups: Vec<String> = fights.iter().map(|f| f.matchup()).collect();
    assert_eq!(matchups, ["A vs B", "C vs D"]);
    assert!(logs.is_empty());
}

#[test]
fn malformed_card_is_empty_with_a_warning() {
    let provider = MockProvider::new(CardReply::Malformed, pick());
    let mut logs = Vec::new();
    let fights = load_upcoming_fights(&provider, |line| logs.push(line)).expect("load");
    assert!(fights.is_empty());
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("[WARN] Failed to parse fights"));
}

#[test]
fn transport_failure_is_returned() {
    let provider = MockProvider::new(CardReply::Down, pick());
    let err = load_upcoming_fights(&provider, |_| {}).expect_err("service is down");
    assert!(matches!(err, ProviderError::Transport(_)));
}

#[test]
fn duplicate_ids_keep_the_first_fight() {
    let provider = MockProvider::new(
        CardReply::Fights(vec![
            fight("f1", "A", "B"),
            fight("f1", "X", "Y"),
            fight("f2", "C", "D"),
        ]),
        pick(),
    );
    let mut logs = Vec::new();
    let fights = load_upcoming_fights(&provider, |line| logs.push(line)).expect("load");
    assert_eq!(fights.len(), 2);
    assert_eq!(fights[0].matchup(), "A vs B");
    assert!(logs.iter().any(|l| l.contains("Duplicate fight id f1")));
}

#[test]
fn prediction_is_tied_to_the_requested_fight() {
    let provider = MockProvider::new(CardReply::Fights(Vec::new()), pick());
    let prediction = predict(&provider, &fight("f7", "A", "B")).expect("predict");
    assert_eq!(prediction.fight_id, "f7");
    assert_eq!(prediction.winner, "B");
}

#[test]
fn failed_prediction_is_an_error() {
    let provider = MockProvider::new(CardReply::Fights(Vec::new()), PredictionReply::Fail);
    let err = predict(&provider, &fight("f7", "A", "B")).expect_err("should fail");
    assert!(err.to_string().starts_with("Prediction generation failed"));
}
