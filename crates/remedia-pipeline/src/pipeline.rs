//! RemediationPipeline - analysis, strategy and generation stages
//!
//! One run is a sequential chain: `Analyze -> Strategize -> Generate`. Each
//! stage returns a tagged result and gates itself on the previous one, so a
//! stage can also be invoked on its own (the way separate functions would be
//! wired by an external state machine).
//!
//! Gating rules:
//! - analysis `ERROR`/`SKIP` ends the run; no LLM call is made
//! - no findings yields [`Plan::NothingToDo`] without an LLM call
//! - a plan that is not ready yields a `SKIPPED` artifact without an LLM call

use crate::config::PipelineConfig;
use crate::extractor::Extractor;
use crate::model::{
    AnalysisContext, AnalysisResult, AnalysisStatus, ArtifactStatus, GeneratedArtifact, Plan,
    StrategyResult,
};
use crate::prompts::{generation_prompt, strategy_prompt, strip_code_fences};
use crate::storage::ObjectStore;
use crate::trigger::ObjectTrigger;
use remedia_llm::{Generation, TextGenerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyze,
    Strategize,
    Generate,
}

/// Result of a full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub analysis: AnalysisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<GeneratedArtifact>,
    /// Last stage that was invoked
    pub last_stage: Stage,
    /// Why the run stopped short of a generated script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gated_reason: Option<String>,
    pub processing_time_ms: u64,
}

impl PipelineOutcome {
    /// Whether a script was generated
    pub fn is_success(&self) -> bool {
        self.artifact
            .as_ref()
            .map(|a| a.status == ArtifactStatus::Success)
            .unwrap_or(false)
    }
}

/// The remediation pipeline
pub struct RemediationPipeline {
    store: Arc<dyn ObjectStore>,
    generator: Arc<dyn TextGenerator>,
    extractor: Extractor,
    config: PipelineConfig,
}

impl RemediationPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        generator: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            generator,
            extractor: Extractor::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for one stored object
    pub async fn run(&self, trigger: &ObjectTrigger) -> PipelineOutcome {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, bucket = %trigger.bucket, key = %trigger.key, "Pipeline run started");

        let analysis = self.analyze(trigger).await;
        if analysis.status != AnalysisStatus::Ok {
            let reason = analysis
                .message
                .clone()
                .unwrap_or_else(|| format!("analysis status {:?}", analysis.status));
            info!(%run_id, status = ?analysis.status, reason = %reason, "Run gated after analysis");
            return PipelineOutcome {
                run_id,
                analysis,
                strategy: None,
                artifact: None,
                last_stage: Stage::Analyze,
                gated_reason: Some(reason),
                processing_time_ms: start.elapsed().as_millis() as u64,
            };
        }

        let strategy = self.strategize(analysis.clone()).await;
        let artifact = self.generate(strategy.clone()).await;

        let gated_reason = match artifact.status {
            ArtifactStatus::Success => None,
            _ => artifact.reason.clone(),
        };

        info!(
            %run_id,
            status = ?artifact.status,
            persisted = artifact.persistence_key.is_some(),
            "Pipeline run finished"
        );

        PipelineOutcome {
            run_id,
            analysis,
            strategy: Some(strategy),
            artifact: Some(artifact),
            last_stage: Stage::Generate,
            gated_reason,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Analysis stage: read the object and extract findings
    pub async fn analyze(&self, trigger: &ObjectTrigger) -> AnalysisResult {
        let context = AnalysisContext {
            bucket: trigger.bucket.clone(),
            key: trigger.key.clone(),
            ..Default::default()
        };

        // Our own output must not re-enter the pipeline
        if self.config.is_output_key(&trigger.key) {
            info!(key = %trigger.key, "Skipping pipeline output object");
            return AnalysisResult::skip(
                format!("key is under the output prefix {}", self.config.output_prefix),
                context,
            );
        }

        let bytes = match self.store.get(&trigger.bucket, &trigger.key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(bucket = %trigger.bucket, key = %trigger.key, error = %e, "Failed to read report");
                return AnalysisResult::error(format!("failed to read report: {}", e), context);
            }
        };

        self.extractor.extract(&bytes, context)
    }

    /// Strategy stage: ask the model for a remediation plan
    pub async fn strategize(&self, analysis: AnalysisResult) -> StrategyResult {
        let context = analysis.context.clone();

        if analysis.status != AnalysisStatus::Ok {
            let reason = analysis
                .message
                .unwrap_or_else(|| format!("analysis status {:?}", analysis.status));
            return StrategyResult {
                plan: Plan::Failed(reason),
                context,
                diagnostic: false,
            };
        }

        if !analysis.has_findings() {
            info!(key = %context.key, "No findings; nothing to plan");
            return StrategyResult {
                plan: Plan::NothingToDo,
                context,
                diagnostic: false,
            };
        }

        info!(
            key = %context.key,
            findings = analysis.finding_count(),
            "Requesting remediation plan"
        );
        let prompt = strategy_prompt(&analysis);

        match self.generator.generate(&prompt).await {
            Generation::Success(text) => StrategyResult {
                plan: Plan::Ready(text),
                context,
                diagnostic: false,
            },
            Generation::Unexpected(raw) => {
                warn!(key = %context.key, "Model returned an unexpected payload; passing it through");
                StrategyResult {
                    plan: Plan::Ready(raw),
                    context,
                    diagnostic: true,
                }
            }
            failure => {
                error!(key = %context.key, failure = %failure, "Strategy generation failed");
                StrategyResult {
                    plan: Plan::Failed(failure.into_text()),
                    context,
                    diagnostic: false,
                }
            }
        }
    }

    /// Generation stage: ask the model for a script and persist it
    pub async fn generate(&self, strategy: StrategyResult) -> GeneratedArtifact {
        let plan = match &strategy.plan {
            Plan::Ready(text) => text.clone(),
            other => {
                info!(key = %strategy.context.key, "Plan not ready; skipping generation");
                return GeneratedArtifact::skipped(other.as_text());
            }
        };

        let generation = self.generator.generate(&generation_prompt(&plan)).await;
        if generation.is_failure() {
            error!(key = %strategy.context.key, failure = %generation, "Script generation failed");
            return GeneratedArtifact::failed(generation.into_text());
        }

        let script = strip_code_fences(&generation.into_text());
        let mut artifact = GeneratedArtifact::success(script, self.generator.generator_name());

        if self.config.persist_artifacts && !strategy.context.key.is_empty() {
            artifact.persistence_key = self.persist(&strategy.context, &artifact.text).await;
        }

        artifact
    }

    /// Write a script under the output prefix; failures are logged only
    async fn persist(&self, context: &AnalysisContext, script: &str) -> Option<String> {
        let key = self.config.script_key_for(&context.key);
        let bucket = if context.bucket.is_empty() {
            self.config.bucket.as_str()
        } else {
            context.bucket.as_str()
        };

        match self
            .store
            .put(
                bucket,
                &key,
                script.as_bytes().to_vec(),
                &self.config.script_content_type,
            )
            .await
        {
            Ok(()) => {
                info!(bucket, key = %key, "Persisted remediation script");
                Some(key)
            }
            Err(e) => {
                error!(bucket, key = %key, error = %e, "Failed to persist remediation script");
                None
            }
        }
    }
}
