mod common;

use approx::assert_relative_eq;
use common::ScriptedJudge;
use pretty_assertions::assert_eq;
use prompt_bench_core::domain::{
    BatchId, BatchStatus, Candidate, CandidateId, ConfidenceLevel, EvaluationBatch, NewHumanRanking,
    QualitySource, TemplateId, Weights, DEFAULT_WEIGHTS_KEY,
};
use prompt_bench_core::error::CoreError;
use prompt_bench_core::traits::{BatchStore, RankingStore, TemplateStore, WeightsStore};
use prompt_bench_metrics::Variability;
use prompt_bench_storage::InMemoryStore;
use prompt_bench_workflow::{default_template, BenchService, OrchestratorConfig, StartBatchRequest};
use rstest::rstest;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    service: BenchService,
    store: Arc<InMemoryStore>,
    template_id: TemplateId,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    store.insert_candidates(vec![
        Candidate::new("a", "summarize", "A", 10.0, Some(Decimal::new(5, 2))),
        Candidate::new("b", "summarize", "B", 5.0, Some(Decimal::new(2, 2))),
        Candidate::new("c", "summarize", "C", 20.0, Some(Decimal::new(10, 2))),
        Candidate::new("d", "summarize", "D", 1.0, None).failed(),
    ]);

    let template = default_template("gpt-4o");
    store.save_template(&template).await.unwrap();

    let judge = Arc::new(ScriptedJudge::with_scores(&[("a", 9.0), ("b", 7.0), ("c", 8.0)]));
    let config = OrchestratorConfig {
        retry_delay: Duration::from_millis(1),
        ..OrchestratorConfig::default()
    };

    Fixture {
        service: BenchService::new(store.clone(), judge, config),
        store,
        template_id: template.id,
    }
}

fn start(template_id: TemplateId) -> StartBatchRequest {
    StartBatchRequest {
        prompt_name: "summarize".to_string(),
        template_id,
        judge_model: None,
        run_id: None,
        parallel: true,
    }
}

fn human(evaluator: &str, ids: &[&str], batch: Option<BatchId>) -> NewHumanRanking {
    NewHumanRanking {
        prompt_name: "summarize".to_string(),
        evaluator_name: evaluator.to_string(),
        ranked_ids: ids.iter().map(|id| CandidateId::new(*id)).collect(),
        based_on_batch_id: batch,
        notes: None,
        time_spent_seconds: 42.0,
    }
}

#[tokio::test]
async fn test_batch_judges_only_successful_candidates() {
    let f = fixture().await;
    let batch = f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.judge_model, "gpt-4o");
    assert_eq!(
        batch.ranked_candidate_ids,
        vec![CandidateId::new("a"), CandidateId::new("c"), CandidateId::new("b")]
    );

    let view = f.service.batch_status(&batch.id).await.unwrap();
    assert_eq!(view.num_experiments, 3);
    assert_eq!(view.progress, 1.0);
    assert_eq!(view.ranked_ids, Some(batch.ranked_candidate_ids.clone()));
}

#[tokio::test]
async fn test_background_batch_can_be_polled() {
    let f = fixture().await;
    let batch_id = f.service.start_batch_evaluation(start(f.template_id)).await.unwrap();

    let view = loop {
        let view = f.service.batch_status(&batch_id).await.unwrap();
        if view.status.is_terminal() {
            break view;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    assert_eq!(view.status, BatchStatus::Completed);
    assert_eq!(view.num_completed, 3);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_batch_errors() {
    let f = fixture().await;

    let unknown_template = f.service.run_batch_evaluation(start(TemplateId::new())).await;
    assert!(matches!(unknown_template, Err(CoreError::NotFound(_))));

    let mut no_candidates = start(f.template_id);
    no_candidates.prompt_name = "translate".to_string();
    assert!(matches!(
        f.service.run_batch_evaluation(no_candidates).await,
        Err(CoreError::Validation(_))
    ));

    assert!(matches!(
        f.service.batch_status(&BatchId::new()).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_judge_model_override() {
    let f = fixture().await;
    let mut request = start(f.template_id);
    request.judge_model = Some("claude-judge".to_string());
    request.parallel = false;

    let batch = f.service.run_batch_evaluation(request).await.unwrap();
    assert_eq!(batch.judge_model, "claude-judge");
}

#[tokio::test]
async fn test_human_ranking_records_agreement_with_ai() {
    let f = fixture().await;
    let batch = f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();

    let ranking = f
        .service
        .save_human_ranking(human("alice", &["b", "a", "c"], Some(batch.id)))
        .await
        .unwrap();

    assert_relative_eq!(ranking.agreement.ai_agreement_score.unwrap(), -1.0 / 3.0, epsilon = 1e-9);
    assert_eq!(ranking.agreement.top_3_overlap, Some(3));
    assert_eq!(ranking.agreement.exact_position_matches, Some(0));
    assert_eq!(ranking.agreement.changes_from_ai.len(), 3);
}

#[tokio::test]
async fn test_human_ranking_validation() {
    let f = fixture().await;

    assert!(matches!(
        f.service.save_human_ranking(human("alice", &["a", "a"], None)).await,
        Err(CoreError::InvalidRanking(_))
    ));
    assert!(matches!(
        f.service.save_human_ranking(human("", &["a"], None)).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        f.service
            .save_human_ranking(human("alice", &["a"], Some(BatchId::new())))
            .await,
        Err(CoreError::NotFound(_))
    ));

    // Rankings without a batch store no agreement.
    let ranking = f.service.save_human_ranking(human("bob", &["c", "b", "a"], None)).await.unwrap();
    assert!(ranking.agreement.ai_agreement_score.is_none());
}

#[rstest]
#[case::missing_candidate(vec!["a", "c"], "missing b")]
#[case::unknown_candidate(vec!["a", "b", "c", "zzz"], "unknown zzz")]
#[case::failed_candidate(vec!["a", "b", "c", "d"], "unknown d")]
#[case::swapped_candidate(vec!["a", "b", "zzz"], "missing c; unknown zzz")]
#[tokio::test]
async fn test_human_ranking_must_cover_candidates(#[case] ids: Vec<&str>, #[case] problem: &str) {
    let f = fixture().await;

    let err = f.service.save_human_ranking(human("alice", &ids, None)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidRanking(_)));
    assert!(err.to_string().contains(problem), "{}", err);
    assert!(f.store.list_rankings("summarize").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_human_ranking_must_match_batch_candidates() {
    let f = fixture().await;
    let batch = f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();

    let err = f
        .service
        .save_human_ranking(human("alice", &["a", "b", "zzz"], Some(batch.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRanking(_)));
    assert!(err.to_string().contains("missing c; unknown zzz"));

    // Nothing was stored, so consensus for the prompt stays computable.
    f.service.save_human_ranking(human("bob", &["b", "a", "c"], Some(batch.id))).await.unwrap();
    let consensus = f.service.consensus("summarize").await.unwrap().unwrap();
    assert_eq!(consensus.num_rankers, 1);
}

#[tokio::test]
async fn test_human_ranking_rejects_batch_of_other_prompt() {
    let f = fixture().await;
    let batch = f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();

    let mut request = human("alice", &["q", "r"], Some(batch.id));
    request.prompt_name = "translate".to_string();

    let err = f.service.save_human_ranking(request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(err.to_string().contains("belongs to prompt 'summarize'"));
    assert!(f.store.list_rankings("translate").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_human_ranking_on_unfinished_batch_has_no_agreement() {
    let f = fixture().await;
    let pending = EvaluationBatch::new("summarize", None, f.template_id, "gpt-4o", 3);
    f.store.save_batch(&pending).await.unwrap();

    let ranking = f
        .service
        .save_human_ranking(human("alice", &["c", "a", "b"], Some(pending.id)))
        .await
        .unwrap();
    assert_eq!(ranking.based_on_batch_id, Some(pending.id));
    assert!(ranking.agreement.ai_agreement_score.is_none());
    assert!(ranking.agreement.changes_from_ai.is_empty());

    // Still checked against the prompt's successful candidates.
    assert!(matches!(
        f.service
            .save_human_ranking(human("bob", &["c", "a"], Some(pending.id)))
            .await,
        Err(CoreError::InvalidRanking(_))
    ));
}

#[tokio::test]
async fn test_human_ranking_for_prompt_without_candidates() {
    let f = fixture().await;
    let mut request = human("alice", &["q", "r"], None);
    request.prompt_name = "translate".to_string();

    assert!(matches!(
        f.service.save_human_ranking(request).await,
        Err(CoreError::InvalidRanking(_))
    ));
}

#[tokio::test]
async fn test_consensus_against_latest_ai_ranking() {
    let f = fixture().await;
    assert!(f.service.consensus("summarize").await.unwrap().is_none());

    f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();
    f.service.save_human_ranking(human("alice", &["b", "a", "c"], None)).await.unwrap();
    f.service.save_human_ranking(human("bob", &["b", "c", "a"], None)).await.unwrap();

    let consensus = f.service.consensus("summarize").await.unwrap().unwrap();

    let order: Vec<&str> = consensus.consensus_ranking.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    assert_eq!(consensus.num_rankers, 2);
    assert_eq!(consensus.confidence_scores[&CandidateId::new("b")], 6);
    assert_eq!(consensus.variability, Variability::High);
    assert!(consensus.agreement_with_ai.is_some());
}

#[tokio::test]
async fn test_recommendation_follows_evidence() {
    let f = fixture().await;
    assert!(!f.service.recommendation("summarize").await.unwrap().is_no_data());
    assert!(f.service.recommendation("translate").await.unwrap().is_no_data());

    f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();
    let outcome = f.service.recommendation("summarize").await.unwrap();
    let rec = outcome.recommendation().unwrap();
    assert_eq!(rec.recommended_config, "A");
    assert_relative_eq!(rec.final_score, 7.4, epsilon = 1e-9);
    assert_eq!(rec.quality_source, QualitySource::AiEvaluations);
    assert_eq!(rec.num_ai_evaluations, 3);

    f.service.save_human_ranking(human("alice", &["b", "a", "c"], None)).await.unwrap();
    f.service.save_human_ranking(human("bob", &["b", "c", "a"], None)).await.unwrap();

    let outcome = f.service.recommendation("summarize").await.unwrap();
    let rec = outcome.recommendation().unwrap();
    assert_eq!(rec.recommended_config, "B");
    assert_eq!(rec.quality_source, QualitySource::HumanRankings);
    assert_eq!(rec.confidence, ConfidenceLevel::High);
    assert_eq!(rec.num_human_rankings, 2);
}

#[tokio::test]
async fn test_weights_fallback_chain() {
    let f = fixture().await;
    assert_eq!(f.service.weights("summarize").await.unwrap(), Weights::default());

    f.service.set_weights(DEFAULT_WEIGHTS_KEY, 0.5, 0.5, 0.0, "ops").await.unwrap();
    assert_eq!(
        f.service.weights("summarize").await.unwrap(),
        Weights::new(0.5, 0.5, 0.0).unwrap()
    );

    let record = f.service.set_weights("summarize", 0.0, 1.0, 0.0, "alice").await.unwrap();
    assert_eq!(record.updated_by, "alice");
    assert_eq!(f.service.weights("summarize").await.unwrap(), record.weights);
    assert_eq!(
        f.service.weights("translate").await.unwrap(),
        Weights::new(0.5, 0.5, 0.0).unwrap()
    );

    f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();
    let outcome = f.service.recommendation("summarize").await.unwrap();
    assert_eq!(outcome.recommendation().unwrap().recommended_config, "B");
}

#[tokio::test]
async fn test_invalid_weights_are_not_stored() {
    let f = fixture().await;

    let result = f.service.set_weights("summarize", 0.6, 0.3, 0.3, "alice").await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
    assert!(f.store.get_weights("summarize").await.unwrap().is_none());
}

#[tokio::test]
async fn test_config_comparison_uses_completed_batches() {
    let f = fixture().await;
    f.store
        .insert_candidate(Candidate::new("t1", "translate", "A", 3.0, Some(Decimal::new(1, 2))));

    let before = f.service.compare_configs("summarize").await.unwrap();
    assert_eq!(before.total_experiments, 4);
    assert_eq!(before.total_evaluations, 0);
    assert_eq!(before.best_by_score, None);
    assert_eq!(before.best_by_speed.as_deref(), Some("B"));
    assert_eq!(before.stats("D").unwrap().success_rate, 0.0);

    f.service.run_batch_evaluation(start(f.template_id)).await.unwrap();

    let after = f.service.compare_configs("summarize").await.unwrap();
    assert_eq!(after.total_evaluations, 3);
    assert_eq!(after.best_by_score.as_deref(), Some("A"));
    assert_eq!(after.best_by_cost.as_deref(), Some("B"));

    let prompts: Vec<String> = f
        .service
        .compare_all_prompts()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.prompt_name)
        .collect();
    assert_eq!(prompts, vec!["summarize".to_string(), "translate".to_string()]);

    let overall = f.service.overall_rankings().await.unwrap();
    let names: Vec<&str> = overall.iter().map(|s| s.config_name.as_str()).collect();
    assert_eq!(names, vec!["A", "C", "B", "D"]);
    assert_eq!(overall[0].total_runs, 2);
    assert_eq!(overall[0].num_evaluations, 1);
}
