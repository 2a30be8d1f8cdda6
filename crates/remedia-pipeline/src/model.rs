//! Stage result types
//!
//! Every stage returns one of these tagged objects; nothing is thrown across a
//! stage boundary. The orchestrator inspects the tags to decide whether the next
//! stage runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category names used by the extractor
pub mod category {
    pub const COST: &str = "cost";
    pub const SECURITY: &str = "security";
    pub const LOGS: &str = "logs";
    pub const MISCONFIGURATIONS: &str = "misconfigurations";
}

/// Sentinel text for "nothing to remediate"
pub const NOTHING_TO_DO: &str = "SIN_HALLAZGOS";

/// Analysis status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Ok,
    Error,
    Skip,
}

/// Pass-through fields describing where the report came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub bucket: String,
    pub key: String,
    /// Report kind declared by the client, e.g. "Deep Dive Logs"
    pub analysis_type: String,
    /// Extraction strategy that produced the findings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Output of the analysis stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub categories: BTreeMap<String, Vec<String>>,
    pub context: AnalysisContext,
    /// Diagnostic for ERROR, reason for SKIP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisResult {
    /// Successful analysis
    pub fn ok(categories: BTreeMap<String, Vec<String>>, context: AnalysisContext) -> Self {
        Self {
            status: AnalysisStatus::Ok,
            categories,
            context,
            message: None,
        }
    }

    /// Failed analysis; never carries findings
    pub fn error(message: impl Into<String>, context: AnalysisContext) -> Self {
        Self {
            status: AnalysisStatus::Error,
            categories: BTreeMap::new(),
            context,
            message: Some(message.into()),
        }
    }

    /// Input deliberately not analyzed
    pub fn skip(reason: impl Into<String>, context: AnalysisContext) -> Self {
        Self {
            status: AnalysisStatus::Skip,
            categories: BTreeMap::new(),
            context,
            message: Some(reason.into()),
        }
    }

    /// Total findings across categories
    pub fn finding_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn has_findings(&self) -> bool {
        self.finding_count() > 0
    }

    /// Findings of one category, empty if absent
    pub fn findings(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Remediation plan produced by the strategy stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Plan {
    /// Model-written plan
    Ready(String),
    /// No findings; nothing to plan
    NothingToDo,
    /// Upstream failure or gating; carries the reason
    Failed(String),
}

impl Plan {
    pub fn is_ready(&self) -> bool {
        matches!(self, Plan::Ready(_))
    }

    /// Text form; sentinels render as fixed strings
    pub fn as_text(&self) -> &str {
        match self {
            Plan::Ready(text) | Plan::Failed(text) => text,
            Plan::NothingToDo => NOTHING_TO_DO,
        }
    }
}

/// Output of the strategy stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub plan: Plan,
    pub context: AnalysisContext,
    /// Whether the model answered with an unexpected payload
    #[serde(default)]
    pub diagnostic: bool,
}

/// Artifact status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactStatus {
    Success,
    Skipped,
    Failed,
}

/// Terminal entity of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub status: ArtifactStatus,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_key: Option<String>,
    /// Why the artifact was skipped or failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Client that produced the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    pub fn success(text: impl Into<String>, generated_by: impl Into<String>) -> Self {
        Self {
            status: ArtifactStatus::Success,
            text: text.into(),
            persistence_key: None,
            reason: None,
            generated_by: Some(generated_by.into()),
            generated_at: Utc::now(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            status: ArtifactStatus::Skipped,
            text: String::new(),
            persistence_key: None,
            reason: Some(reason),
            generated_by: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            status: ArtifactStatus::Failed,
            reason: Some(text.clone()),
            text,
            persistence_key: None,
            generated_by: None,
            generated_at: Utc::now(),
        }
    }
}
