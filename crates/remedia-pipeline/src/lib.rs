//! Remedia Pipeline
//!
//! Turns a client report landing in object storage into a remediation script:
//! 1. **Analyze**: extract normalized findings from the JSON report
//! 2. **Strategize**: ask the model for a prioritized plan
//! 3. **Generate**: ask the model for a script and store it under the output prefix
//!
//! # Example
//! ```no_run
//! use remedia_llm::{MockProvider, ResilientClient, RetryConfig};
//! use remedia_pipeline::{InMemoryObjectStore, ObjectStore, ObjectTrigger, PipelineConfig, RemediationPipeline};
//! use std::sync::Arc;
//!
//! # async fn example() -> remedia_pipeline::Result<()> {
//! let store = Arc::new(InMemoryObjectStore::new());
//! store
//!     .put("remedia-reports", "input/report.json", br#"{"hallazgos_criticos":{}}"#.to_vec(), "application/json")
//!     .await?;
//!
//! let client = ResilientClient::from_config(Arc::new(MockProvider::new()), RetryConfig::default());
//! let pipeline = RemediationPipeline::new(store, Arc::new(client), PipelineConfig::default());
//!
//! let outcome = pipeline
//!     .run(&ObjectTrigger::new("remedia-reports", "input/report.json"))
//!     .await;
//! println!("{:?}", outcome.last_stage);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod model;
pub mod pipeline;
pub mod presign;
pub mod prompts;
pub mod storage;
pub mod trigger;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use extractor::Extractor;
pub use model::{
    AnalysisContext, AnalysisResult, AnalysisStatus, ArtifactStatus, GeneratedArtifact, Plan,
    StrategyResult, NOTHING_TO_DO,
};
pub use pipeline::{PipelineOutcome, RemediationPipeline, Stage};
pub use presign::{
    LocalPresigner, PresignAction, PresignConfig, PresignRequest, PresignedUrl, Presigner,
};
pub use storage::{FileSystemObjectStore, InMemoryObjectStore, ObjectStore};
pub use trigger::ObjectTrigger;
