use prompt_bench_core::domain::*;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

#[test]
fn test_batch_status_serialization() {
    let statuses = vec![
        (BatchStatus::Pending, "pending"),
        (BatchStatus::Running, "running"),
        (BatchStatus::Completed, "completed"),
        (BatchStatus::Failed, "failed"),
    ];

    for (status, expected) in statuses {
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json, json!(expected));
        assert_eq!(status.as_str(), expected);
    }
}

#[test]
fn test_candidate_cost_is_decimal() {
    let candidate = Candidate::new("a", "summarize", "fast", 1.5, Some(Decimal::new(12, 4)));
    let value = serde_json::to_value(&candidate).unwrap();

    assert_eq!(value["id"], json!("a"));
    assert_eq!(value["cost_usd"], json!("0.0012"));

    let back: Candidate = serde_json::from_value(value).unwrap();
    assert_eq!(back.cost_usd, Some(Decimal::new(12, 4)));
}

#[test]
fn test_human_ranking_flattens_agreement() {
    let ranking = HumanRanking::new("summarize", "bob", Ranking::from_strs(&["x", "y"]).unwrap())
        .with_agreement(AgreementSummary {
            changes_from_ai: vec![PositionChange::new("x".into(), 2, 1)],
            ai_agreement_score: Some(-1.0),
            top_3_overlap: Some(2),
            exact_position_matches: Some(0),
        });

    let value = serde_json::to_value(&ranking).unwrap();
    assert_eq!(value["ranking"], json!(["x", "y"]));
    assert_eq!(value["ai_agreement_score"], json!(-1.0));
    assert_eq!(value["changes_from_ai"][0]["direction"], json!("up"));

    let back: HumanRanking = serde_json::from_value(value).unwrap();
    assert_eq!(back, ranking);
}

#[test]
fn test_ranking_weights_rejects_invalid_json() {
    let value = json!({
        "prompt_name": "_default",
        "weights": { "quality": 0.9, "speed": 0.3, "cost": 0.1 },
        "updated_by": "alice",
        "updated_at": "2024-01-01T00:00:00Z"
    });

    assert!(serde_json::from_value::<RankingWeights>(value).is_err());
}

#[test]
fn test_recommendation_outcome_tagging() {
    let outcome = RecommendationOutcome::NoData {
        prompt_name: "summarize".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "outcome": "no_data", "prompt_name": "summarize" })
    );
}

#[test]
fn test_template_defaults_on_deserialize() {
    let value = json!({
        "id": TemplateId::new(),
        "name": "Reviewer",
        "template": "Rate {result}",
        "default_model": "gpt-4o"
    });

    let template: EvaluationTemplate = serde_json::from_value(value).unwrap();
    assert!(template.is_active);
    assert_eq!(template.created_by, "system");
    assert!(template.criteria.is_empty());
}
