//! Integration tests for full pipeline runs
//!
//! Each test uploads a report into the in-memory store, runs the pipeline
//! through a retrying client backed by a scripted provider, and checks both
//! the outcome and the number of model calls made.

mod common;

use common::{TestPipeline, BUCKET, MAX_ATTEMPTS};
use remedia_llm::{LLMError, MockProvider, FATAL_MARKER};
use remedia_pipeline::{
    AnalysisStatus, ArtifactStatus, ObjectStore, ObjectTrigger, Plan, Stage,
};
use serde_json::json;

fn unreachable_model() -> MockProvider {
    (0..MAX_ATTEMPTS).fold(MockProvider::new(), |p, _| {
        p.then_error(LLMError::Transient("connection refused".into()))
    })
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_full_run_persists_script() {
    let t = TestPipeline::new(
        MockProvider::new()
            .then_text("1. Set a 7 day retention on app-logs")
            .then_text("```python\nimport boto3\nlogs = boto3.client('logs')\n```"),
    );
    let trigger = t
        .upload(
            "input/acme.json",
            &json!({"hallazgos_criticos": {"top_log_consumers": [{"name": "app-logs", "size_gb": 120}]}}),
        )
        .await;

    let outcome = t.pipeline.run(&trigger).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.last_stage, Stage::Generate);
    assert!(outcome.gated_reason.is_none());

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact.text, "import boto3\nlogs = boto3.client('logs')");
    assert_eq!(artifact.persistence_key.as_deref(), Some("remediations/acme.py"));

    let stored = t.store.get(BUCKET, "remediations/acme.py").await.unwrap();
    assert_eq!(String::from_utf8(stored).unwrap(), artifact.text);
    assert_eq!(t.llm_calls(), 2);

    let prompts = t.provider.prompts();
    assert!(prompts[0].contains("LOG: app-logs (120 GB)"));
    assert!(prompts[1].contains("1. Set a 7 day retention on app-logs"));
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let t = TestPipeline::new(
        MockProvider::new()
            .then_error(LLMError::Transient("503".into()))
            .then_text("1. plan")
            .then_text("print('fixed')"),
    );
    let trigger = t
        .upload(
            "input/r.json",
            &json!({"hallazgos": [{"id": "SEC-01", "riesgo": "ALTO", "desc": "open ssh"}]}),
        )
        .await;

    let outcome = t.pipeline.run(&trigger).await;

    assert!(outcome.is_success());
    assert_eq!(t.llm_calls(), 3);
}

// ============================================================================
// Gating
// ============================================================================

#[tokio::test]
async fn test_unreachable_model_skips_generation() {
    let t = TestPipeline::new(unreachable_model());
    let trigger = t
        .upload(
            "input/acme.json",
            &json!({"hallazgos_criticos": {"top_log_consumers": [{"name": "app-logs", "size_gb": 120}]}}),
        )
        .await;

    let outcome = t.pipeline.run(&trigger).await;

    let strategy = outcome.strategy.as_ref().unwrap();
    assert!(matches!(strategy.plan, Plan::Failed(_)));
    assert!(strategy.plan.as_text().starts_with(FATAL_MARKER));
    assert!(strategy.plan.as_text().contains("3 attempts"));

    let artifact = outcome.artifact.as_ref().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Skipped);
    assert!(outcome.gated_reason.unwrap().starts_with(FATAL_MARKER));

    // Only the strategy attempts; generation never reaches the model
    assert_eq!(t.llm_calls(), MAX_ATTEMPTS as usize);
    assert!(t.store.keys(BUCKET).await.iter().all(|k| !k.starts_with("remediations/")));
}

#[tokio::test]
async fn test_forbidden_makes_single_call() {
    let t = TestPipeline::new(MockProvider::new().then_error(LLMError::Authorization {
        status: 403,
        body: "billing disabled".into(),
    }));
    let trigger = t
        .upload("input/r.json", &json!({"aws_data": {"last_month_costs": {"AmazonEC2": 900.0}}}))
        .await;

    let outcome = t.pipeline.run(&trigger).await;

    assert_eq!(t.llm_calls(), 1);
    assert_eq!(outcome.artifact.unwrap().status, ArtifactStatus::Skipped);
}

#[tokio::test]
async fn test_invalid_report_is_error_without_llm_calls() {
    let t = TestPipeline::new(MockProvider::new());
    let trigger = t.upload_raw("input/broken.json", b"{not json").await;

    let outcome = t.pipeline.run(&trigger).await;

    assert_eq!(outcome.analysis.status, AnalysisStatus::Error);
    assert_eq!(outcome.last_stage, Stage::Analyze);
    assert!(outcome.strategy.is_none());
    assert!(outcome.artifact.is_none());
    assert!(outcome.gated_reason.is_some());
    assert_eq!(t.llm_calls(), 0);
}

#[tokio::test]
async fn test_missing_object_is_error() {
    let t = TestPipeline::new(MockProvider::new());

    let outcome = t
        .pipeline
        .run(&ObjectTrigger::new(BUCKET, "input/nope.json"))
        .await;

    assert_eq!(outcome.analysis.status, AnalysisStatus::Error);
    assert_eq!(t.llm_calls(), 0);
}

#[tokio::test]
async fn test_empty_findings_need_no_model() {
    let t = TestPipeline::new(MockProvider::new());
    let trigger = t
        .upload("input/clean.json", &json!({"hallazgos_criticos": {"top_log_consumers": []}}))
        .await;

    let outcome = t.pipeline.run(&trigger).await;

    assert_eq!(outcome.analysis.status, AnalysisStatus::Ok);
    assert_eq!(outcome.strategy.unwrap().plan, Plan::NothingToDo);
    assert_eq!(outcome.artifact.unwrap().status, ArtifactStatus::Skipped);
    assert_eq!(t.llm_calls(), 0);
}

// ============================================================================
// Output re-entry
// ============================================================================

#[tokio::test]
async fn test_persisted_script_does_not_retrigger() {
    let t = TestPipeline::new(
        MockProvider::new()
            .then_text("1. plan")
            .then_text("print('ok')"),
    );
    let trigger = t
        .upload(
            "input/loop.json",
            &json!({"hallazgos": [{"id": "LOG-1", "riesgo": "BAJO", "desc": "verbose"}]}),
        )
        .await;

    let first = t.pipeline.run(&trigger).await;
    let key = first.artifact.unwrap().persistence_key.unwrap();
    let calls_after_first = t.llm_calls();

    let second = t.pipeline.run(&ObjectTrigger::new(BUCKET, key)).await;

    assert_eq!(second.analysis.status, AnalysisStatus::Skip);
    assert_eq!(second.last_stage, Stage::Analyze);
    assert_eq!(t.llm_calls(), calls_after_first);
}
