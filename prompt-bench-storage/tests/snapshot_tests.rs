use pretty_assertions::assert_eq;
use prompt_bench_core::domain::{
    Candidate, EvaluationBatch, EvaluationTemplate, HumanRanking, Ranking, RankingWeights,
    Weights, DEFAULT_WEIGHTS_KEY,
};
use prompt_bench_core::error::CoreError;
use prompt_bench_core::traits::{BatchStore, CandidateStore, RankingStore, TemplateStore, WeightsStore};
use prompt_bench_storage::{InMemoryStore, Snapshot};
use rust_decimal::Decimal;
use tempfile::tempdir;

const SEED: &str = r#"{
  "candidates": [
    {"id": "a1", "prompt_name": "summarize", "config_name": "A", "duration_seconds": 2.0, "cost_usd": "0.0012", "success": true},
    {"id": "b1", "prompt_name": "summarize", "config_name": "B", "duration_seconds": 1.0, "success": true},
    {"id": "c1", "prompt_name": "summarize", "config_name": "C", "duration_seconds": 4.0, "success": false}
  ],
  "weights": [
    {"prompt_name": "_default", "weights": {"quality": 0.5, "speed": 0.5, "cost": 0.0}, "updated_by": "ops", "updated_at": "2026-01-01T00:00:00Z"}
  ]
}"#;

#[tokio::test]
async fn test_seed_from_json() {
    let store = Snapshot::from_json(SEED).unwrap().into_store().unwrap();

    let candidates = store.list_successful_candidates("summarize", None).await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].cost_usd, Some(Decimal::new(12, 4)));

    let weights = store.get_weights(DEFAULT_WEIGHTS_KEY).await.unwrap().unwrap();
    assert_eq!(weights.weights.quality(), 0.5);
    assert!(store.list_batches("summarize").await.unwrap().is_empty());
}

#[test]
fn test_invalid_weights_in_seed_are_rejected() {
    let json = r#"{"weights": [{"prompt_name": "p", "weights": {"quality": 0.9, "speed": 0.9, "cost": 0.0}, "updated_by": "ops", "updated_at": "2026-01-01T00:00:00Z"}]}"#;
    assert!(matches!(Snapshot::from_json(json), Err(CoreError::Serialization(_))));
}

#[test]
fn test_invalid_template_in_seed_is_rejected() {
    let snapshot = Snapshot {
        templates: vec![EvaluationTemplate::new("Reviewer", "", vec![], "gpt-4o")],
        ..Snapshot::default()
    };
    assert!(matches!(snapshot.into_store(), Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn test_store_survives_save_and_load() {
    let store = InMemoryStore::new();
    store.insert_candidate(Candidate::new("a1", "summarize", "A", 2.0, Some(Decimal::new(5, 3))));
    store.insert_candidate(Candidate::new("t1", "translate", "A", 1.0, None));

    let template = EvaluationTemplate::new("Reviewer", "{result}", vec!["accuracy".to_string()], "gpt-4o");
    store.save_template(&template).await.unwrap();
    store
        .save_batch(&EvaluationBatch::new("summarize", None, template.id, "gpt-4o", 1))
        .await
        .unwrap();
    store
        .save_ranking(&HumanRanking::new("summarize", "alice", Ranking::from_strs(&["a1"]).unwrap()))
        .await
        .unwrap();
    store
        .save_weights(&RankingWeights::new("summarize", Weights::default(), "alice"))
        .await
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.json");
    let snapshot = store.snapshot();
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    assert_eq!(loaded, snapshot);

    let restored = loaded.into_store().unwrap();
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.list_rankings("summarize").await.unwrap().len(), 1);
    assert_eq!(restored.list_active_templates().await.unwrap(), vec![template]);
}

#[test]
fn test_load_missing_file_is_internal_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        Snapshot::load(dir.path().join("missing.json")),
        Err(CoreError::Internal(_))
    ));
}

#[tokio::test]
async fn test_demo_snapshot_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/summarize.json");
    let store = Snapshot::load(path).unwrap().into_store().unwrap();

    assert_eq!(store.list_successful_candidates("summarize", Some("run1")).await.unwrap().len(), 3);
    assert_eq!(store.list_rankings("summarize").await.unwrap().len(), 2);
    assert_eq!(store.list_active_templates().await.unwrap().len(), 1);
    assert!(store.get_weights(DEFAULT_WEIGHTS_KEY).await.unwrap().is_some());
}
