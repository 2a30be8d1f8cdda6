//! Pipeline configuration and object key layout

use serde::{Deserialize, Serialize};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bucket holding client reports and generated scripts
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Prefix for uploaded reports
    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,

    /// Reserved prefix for pipeline output; never analyzed
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Write successful scripts back to storage
    #[serde(default = "default_true")]
    pub persist_artifacts: bool,

    /// Upper bound for any descriptive field copied into a finding
    #[serde(default = "default_max_field_chars")]
    pub max_field_chars: usize,

    /// Content type for persisted scripts
    #[serde(default = "default_script_content_type")]
    pub script_content_type: String,

    /// Extension for persisted scripts
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
}

fn default_bucket() -> String {
    "remedia-reports".to_string()
}

fn default_input_prefix() -> String {
    "input/".to_string()
}

fn default_output_prefix() -> String {
    "remediations/".to_string()
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_max_field_chars() -> usize {
    200
}

fn default_script_content_type() -> String {
    "text/x-python".to_string()
}

fn default_script_extension() -> String {
    "py".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            input_prefix: default_input_prefix(),
            output_prefix: default_output_prefix(),
            persist_artifacts: true,
            max_field_chars: default_max_field_chars(),
            script_content_type: default_script_content_type(),
            script_extension: default_script_extension(),
        }
    }
}

impl PipelineConfig {
    /// Set bucket
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Enable or disable persistence of generated scripts
    pub fn with_persistence(mut self, enable: bool) -> Self {
        self.persist_artifacts = enable;
        self
    }

    /// Whether a key belongs to the pipeline's own output
    pub fn is_output_key(&self, key: &str) -> bool {
        key.starts_with(&self.output_prefix)
    }

    /// Key under which an uploaded file lands
    pub fn input_key_for(&self, file_name: &str) -> String {
        format!("{}{}", self.input_prefix, file_name)
    }

    /// Key of a file under the output prefix
    pub fn output_key_for(&self, file_name: &str) -> String {
        format!("{}{}", self.output_prefix, file_name)
    }

    /// Key of the script generated from an input object: `report.json` -> `remediations/report.py`
    pub fn script_key_for(&self, input_key: &str) -> String {
        let file_name = input_key.rsplit('/').next().unwrap_or(input_key);
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        self.output_key_for(&format!("{}.{}", stem, self.script_extension))
    }
}
