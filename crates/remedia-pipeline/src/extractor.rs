//! Finding extraction from client reports
//!
//! Reports arrive in one of several schema generations. Parsers are tried
//! newest first and the first one that yields findings wins:
//!
//! 1. `deep_dive`: `hallazgos_criticos.top_log_consumers` / `ecs_misconfigurations`
//! 2. `findings_list`: `hallazgos: [{id, riesgo, desc}]`
//! 3. `legacy_costs`: `aws_data.last_month_costs`
//!
//! A report matching none of them is a valid, empty analysis. Only bytes that
//! are not a JSON object produce `status=ERROR`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{default_max_field_chars, PipelineConfig};
use crate::model::{category, AnalysisContext, AnalysisResult};

type Categories = BTreeMap<String, Vec<String>>;

/// Monthly cost above which a legacy cost line becomes a finding
const LEGACY_COST_THRESHOLD: f64 = 50.0;

/// Default report kind when the document does not declare one
pub const DEFAULT_ANALYSIS_TYPE: &str = "General";

/// One schema generation
struct SchemaParser {
    name: &'static str,
    parse: fn(&Map<String, Value>, &Extractor) -> Categories,
}

/// Newest first
const SCHEMAS: &[SchemaParser] = &[
    SchemaParser {
        name: "deep_dive",
        parse: parse_deep_dive,
    },
    SchemaParser {
        name: "findings_list",
        parse: parse_findings_list,
    },
    SchemaParser {
        name: "legacy_costs",
        parse: parse_legacy_costs,
    },
];

/// Maps raw reports to normalized findings
#[derive(Debug, Clone)]
pub struct Extractor {
    max_field_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(default_max_field_chars())
    }
}

impl Extractor {
    pub fn new(max_field_chars: usize) -> Self {
        Self {
            max_field_chars: max_field_chars.max(1),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_field_chars)
    }

    pub fn max_field_chars(&self) -> usize {
        self.max_field_chars
    }

    /// Extract findings from raw report bytes
    pub fn extract(&self, bytes: &[u8], context: AnalysisContext) -> AnalysisResult {
        let document: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %context.key, error = %e, "Report is not valid JSON");
                return AnalysisResult::error(format!("report is not valid JSON: {}", e), context);
            }
        };
        self.extract_value(&document, context)
    }

    /// Extract findings from an already parsed report
    pub fn extract_value(&self, document: &Value, mut context: AnalysisContext) -> AnalysisResult {
        let Some(root) = document.as_object() else {
            return AnalysisResult::error(
                format!("report must be a JSON object, found {}", json_kind(document)),
                context,
            );
        };

        context.analysis_type = root
            .get("analisis_tipo")
            .or_else(|| root.get("analysis_type"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ANALYSIS_TYPE)
            .to_string();

        for schema in SCHEMAS {
            let categories = (schema.parse)(root, self);
            let count: usize = categories.values().map(Vec::len).sum();
            if count > 0 {
                info!(
                    key = %context.key,
                    schema = schema.name,
                    findings = count,
                    "Findings extracted"
                );
                context.schema = Some(schema.name.to_string());
                return AnalysisResult::ok(categories, context);
            }
            debug!(schema = schema.name, "Schema yielded no findings");
        }

        info!(key = %context.key, "Report has no actionable findings");
        AnalysisResult::ok(Categories::new(), context)
    }

    /// Clip a descriptive field to the configured length
    fn clip(&self, text: &str) -> String {
        truncate(text.trim(), self.max_field_chars)
    }
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Text of a scalar field; numbers keep their JSON spelling
fn scalar(record: &Map<String, Value>, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn records<'a>(parent: &'a Map<String, Value>, field: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    parent
        .get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn push(categories: &mut Categories, name: &str, finding: String) {
    categories.entry(name.to_string()).or_default().push(finding);
}

fn parse_deep_dive(root: &Map<String, Value>, ex: &Extractor) -> Categories {
    let mut categories = Categories::new();
    let Some(critical) = root.get("hallazgos_criticos").and_then(Value::as_object) else {
        return categories;
    };

    for log in records(critical, "top_log_consumers") {
        match (scalar(log, "name"), scalar(log, "size_gb")) {
            (Some(name), Some(size)) => push(
                &mut categories,
                category::LOGS,
                format!("LOG: {} ({} GB)", ex.clip(&name), size),
            ),
            _ => warn!("Skipping log consumer without name/size_gb"),
        }
    }

    for issue in records(critical, "ecs_misconfigurations") {
        match (
            scalar(issue, "cluster"),
            scalar(issue, "service"),
            scalar(issue, "bad_config"),
        ) {
            (Some(cluster), Some(service), Some(config)) => push(
                &mut categories,
                category::MISCONFIGURATIONS,
                format!(
                    "ECS: Cluster: {} | Svc: {} | Config: {}",
                    ex.clip(&cluster),
                    ex.clip(&service),
                    ex.clip(&config)
                ),
            ),
            _ => warn!("Skipping ECS misconfiguration without cluster/service/bad_config"),
        }
    }

    categories
}

fn category_for_id(id: &str) -> &'static str {
    let id = id.to_ascii_uppercase();
    if id.starts_with("SEC") {
        category::SECURITY
    } else if id.starts_with("COST") {
        category::COST
    } else if id.starts_with("LOG") {
        category::LOGS
    } else {
        category::MISCONFIGURATIONS
    }
}

fn parse_findings_list(root: &Map<String, Value>, ex: &Extractor) -> Categories {
    let mut categories = Categories::new();

    for finding in records(root, "hallazgos") {
        let Some(desc) = scalar(finding, "desc") else {
            warn!("Skipping finding without desc");
            continue;
        };
        let id = scalar(finding, "id").unwrap_or_else(|| "N/A".to_string());
        let text = match scalar(finding, "riesgo") {
            Some(risk) => format!("[{}] {}: {}", risk, id, ex.clip(&desc)),
            None => format!("{}: {}", id, ex.clip(&desc)),
        };
        push(&mut categories, category_for_id(&id), text);
    }

    categories
}

fn parse_legacy_costs(root: &Map<String, Value>, ex: &Extractor) -> Categories {
    let mut categories = Categories::new();
    let Some(costs) = root
        .get("aws_data")
        .and_then(|d| d.get("last_month_costs"))
        .and_then(Value::as_object)
    else {
        return categories;
    };

    for (service, amount) in costs {
        match amount.as_f64() {
            Some(amount) if amount > LEGACY_COST_THRESHOLD => push(
                &mut categories,
                category::COST,
                format!("COST: {} (${:.2})", ex.clip(service), amount),
            ),
            Some(_) => {}
            None => warn!(service = %service, "Skipping non-numeric cost entry"),
        }
    }

    categories
}
