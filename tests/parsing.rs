use std::fs;
use std::path::PathBuf;

use octagon_oracle::gemini::{parse_fight_card_response, parse_fight_list, parse_prediction_response};
use octagon_oracle::provider::ProviderError;
use octagon_oracle::state::{Fight, Fighter};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fight() -> Fight {
    Fight {
        id: "ufc-320-1".to_string(),
        event: "UFC 320".to_string(),
        date: "2026-11-14".to_string(),
        weight_class: "Lightweight".to_string(),
        fighter_a: Fighter::new("Islam Makhachev", "27-1"),
        fighter_b: Fighter::new("Arman Tsarukyan", "22-3"),
        odds_a: Some("-250".to_string()),
        odds_b: Some("+200".to_string()),
    }
}

#[test]
fn parses_fight_card_fixture_in_order() {
    let raw = read_fixture("gemini_fight_card.json");
    let fights = parse_fight_card_response(&raw).expect("fixture should parse");
    let ids: Vec<&str> = fights.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["ufc-320-1", "ufc-320-2", "ufc-320-3"]);

    let first = &fights[0];
    assert_eq!(first.matchup(), "Islam Makhachev vs Arman Tsarukyan");
    assert_eq!(first.weight_class, "Lightweight");
    assert_eq!(first.fighter_a.age, Some(35));
    assert_eq!(first.fighter_a.stance.as_deref(), Some("Southpaw"));
    assert_eq!(first.odds_a.as_deref(), Some("-250"));
}

#[test]
fn numeric_odds_become_strings_and_missing_odds_stay_absent() {
    let raw = read_fixture("gemini_fight_card.json");
    let fights = parse_fight_card_response(&raw).expect("fixture should parse");
    assert_eq!(fights[1].odds_a.as_deref(), Some("150"));
    assert_eq!(fights[1].odds_b.as_deref(), Some("-180"));
    assert_eq!(fights[2].odds_a, None);
    assert_eq!(fights[2].odds_b, None);
    assert!(fights[2].weight_class.is_empty());
}

#[test]
fn fight_list_that_is_not_an_array_is_malformed() {
    assert!(matches!(
        parse_fight_list(r#"{"fights": []}"#),
        Err(ProviderError::Malformed(_))
    ));
    assert!(matches!(
        parse_fight_list("The next event is UFC 320."),
        Err(ProviderError::Malformed(_))
    ));
}

#[test]
fn minimal_element_without_date_class_or_odds_parses() {
    let text = r#"[{"id":"f1","event":"Card 42","fighterA":{"name":"A","record":"10-0"},"fighterB":{"name":"B","record":"9-1"}}]"#;
    let fights = parse_fight_list(text).expect("minimal element parses");
    assert_eq!(fights.len(), 1);
    assert_eq!(fights[0].id, "f1");
    assert_eq!(fights[0].matchup(), "A vs B");
    assert!(fights[0].date.is_empty());
    assert!(fights[0].weight_class.is_empty());
    assert_eq!(fights[0].odds_a, None);
}

#[test]
fn one_bad_element_spoils_the_whole_list() {
    let text = r#"[
        {"id": "1", "event": "E", "fighterA": {"name": "A", "record": "1-0"}, "fighterB": {"name": "B", "record": "0-1"}},
        {"id": "2", "event": "E"}
    ]"#;
    assert!(matches!(parse_fight_list(text), Err(ProviderError::Malformed(_))));
}

#[test]
fn blank_answer_is_an_empty_card() {
    assert!(parse_fight_list("").expect("blank parses").is_empty());
    assert!(parse_fight_list("[]").expect("empty array parses").is_empty());
    let fights = parse_fight_card_response(r#"{"candidates": []}"#).expect("no candidates");
    assert!(fights.is_empty());
}

#[test]
fn broken_envelope_is_malformed() {
    assert!(matches!(
        parse_fight_card_response("<html>502 Bad Gateway</html>"),
        Err(ProviderError::Malformed(_))
    ));
}

#[test]
fn parses_prediction_fixture_with_grounding_sources() {
    let raw = read_fixture("gemini_prediction.json");
    let prediction = parse_prediction_response(&raw, &fight()).expect("fixture should parse");

    assert_eq!(prediction.fight_id, "ufc-320-1");
    assert_eq!(prediction.winner, "Islam Makhachev");
    assert_eq!(prediction.confidence, 72.0);
    assert_eq!(prediction.method, "Submission");
    assert_eq!(prediction.round.as_deref(), Some("Round 4"));
    assert!(prediction.reasoning.starts_with("Makhachev's top control"));

    let sources: Vec<(&str, &str)> = prediction
        .sources
        .iter()
        .map(|s| (s.title.as_str(), s.uri.as_str()))
        .collect();
    assert_eq!(
        sources,
        [
            ("ESPN MMA", "https://www.espn.com/mma/story"),
            ("Source", "https://www.tapology.com/fightcenter"),
            ("Source", "#"),
            ("Source", "#"),
        ]
    );
}

#[test]
fn prediction_without_citations_has_no_sources() {
    let raw = read_fixture("gemini_prediction_no_sources.json");
    let prediction = parse_prediction_response(&raw, &fight()).expect("fixture should parse");
    assert!(prediction.sources.is_empty());
    assert_eq!(prediction.confidence, 64.5);
    assert_eq!(prediction.round, None);
}

#[test]
fn unreadable_prediction_fails_generation() {
    let missing_winner = r#"{"candidates": [{"content": {"parts": [{"text": "{\"confidence\": 60, \"method\": \"Decision\", \"reasoning\": \"r\"}"}]}}]}"#;
    let err = parse_prediction_response(missing_winner, &fight()).expect_err("winner is required");
    assert!(matches!(err, ProviderError::PredictionFailed(_)));
    assert!(err.to_string().starts_with("Prediction generation failed"));

    let empty = r#"{"candidates": [{"content": {"parts": [{"text": ""}]}}]}"#;
    assert!(matches!(
        parse_prediction_response(empty, &fight()),
        Err(ProviderError::PredictionFailed(_))
    ));
}
