//! Prompt templates and model-output cleanup

use crate::model::{category, AnalysisResult};

/// Prompt template for the strategy stage
pub const STRATEGY_PROMPT: &str = r#"You are a senior AWS architect reviewing a client report of type: {analysis_type}.

FINDINGS:
{findings}

GOAL:
Write a technical remediation plan that:
- Removes the most expensive or most dangerous issues first.
- Corrects the configurations that caused each finding.
- Prevents recurrence.

Answer ONLY with the numbered list of steps.
"#;

/// Prompt template for the generation stage
pub const GENERATION_PROMPT: &str = r#"You are a DevOps expert writing Python (boto3).
Write a single script that executes this plan:
{plan}

RULES:
1. For oversized log groups, set a 7 day retention (put_retention_policy).
2. For ECS services logging at DEBUG/TRACE, show how the task definition would be updated, commented out or simulated.
3. Never delete resources; changes must be reversible.
4. Do NOT include markdown. Output code only.
"#;

/// Display order and headings for categories
const SECTIONS: &[(&str, &str)] = &[
    (category::SECURITY, "Security issues"),
    (category::COST, "Cost anomalies"),
    (category::LOGS, "Logs with critical volume"),
    (category::MISCONFIGURATIONS, "Misconfigurations"),
];

/// Render findings as numbered sections; unknown categories follow the known ones
pub fn render_findings(analysis: &AnalysisResult) -> String {
    let mut sections = Vec::new();
    let known: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();

    let mut order: Vec<(&str, &str)> = SECTIONS.to_vec();
    order.extend(
        analysis
            .categories
            .keys()
            .filter(|name| !known.contains(&name.as_str()))
            .map(|name| (name.as_str(), name.as_str())),
    );

    for (name, heading) in order {
        let findings = analysis.findings(name);
        if findings.is_empty() {
            continue;
        }
        let lines: Vec<String> = findings.iter().map(|f| format!("   - {}", f)).collect();
        sections.push(format!("{}. {}:\n{}", sections.len() + 1, heading, lines.join("\n")));
    }

    sections.join("\n")
}

/// Build the strategy prompt for an analysis
pub fn strategy_prompt(analysis: &AnalysisResult) -> String {
    STRATEGY_PROMPT
        .replace("{analysis_type}", &analysis.context.analysis_type)
        .replace("{findings}", &render_findings(analysis))
}

/// Build the generation prompt for a plan
pub fn generation_prompt(plan: &str) -> String {
    GENERATION_PROMPT.replace("{plan}", plan.trim())
}

/// Strip markdown code fences the model adds despite instructions
///
/// Every fence line is removed together with its language tag, whatever the
/// tag looks like. All other lines are kept, so multi-block replies lose no
/// code. Output without fences is only trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(|line| {
            let end = line.trim_end();
            end.strip_suffix("```").unwrap_or(line)
        })
        .collect();

    lines.join("\n").trim().to_string()
}
