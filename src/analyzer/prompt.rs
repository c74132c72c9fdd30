use crate::analyzer::{AnalysisResult, AnalysisSeverity, HealthStatus, QueryContext, QueryResult};
use crate::buffer::{Issue, IssueBatch};
use serde_json::Value;
use std::fmt::Write;

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a log analysis expert. Analyze logs and identify \
issues, root causes, and solutions. Always respond with valid JSON.";

pub const QUERY_SYSTEM_PROMPT: &str = "You are a log monitoring assistant. Answer questions about \
system health based on log data. Always respond with valid JSON.";

const QUERY_MAX_ISSUES: usize = 10;
const QUERY_MAX_LINES: usize = 50;

/// One issue with its context, the trigger marked by severity
pub fn format_issue(issue: &Issue) -> String {
    let mut lines = Vec::new();

    if !issue.context_before.is_empty() {
        lines.push("--- Context (before) ---".to_string());
        lines.extend(issue.context_before.iter().map(|l| format!("  {}", l.content)));
    }

    lines.push(format!(
        ">>> [{}] {}",
        issue.severity().as_str().to_ascii_uppercase(),
        issue.trigger_line.content
    ));

    if !issue.context_after.is_empty() {
        lines.push("--- Context (after) ---".to_string());
        lines.extend(issue.context_after.iter().map(|l| format!("  {}", l.content)));
    }

    lines.join("\n")
}

pub fn format_batch(batch: &IssueBatch) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Log source: {}", batch.source);
    let _ = writeln!(
        out,
        "Time range: {} to {}",
        batch.opened_at.to_rfc3339(),
        batch.closed_at.to_rfc3339()
    );
    let _ = writeln!(out, "Issues detected: {}", batch.len());
    out.push('\n');

    for (i, issue) in batch.issues.iter().enumerate() {
        let _ = writeln!(out, "=== Issue {} ===", i + 1);
        out.push_str(&format_issue(issue));
        out.push_str("\n\n");
    }

    out
}

pub fn batch_prompt(batch: &IssueBatch) -> String {
    format!(
        "Analyze the following log issues and provide a structured analysis.

{}
Respond in JSON format with these fields:
- summary: A brief (1-2 sentence) summary of what's happening
- severity: One of \"critical\", \"high\", \"medium\", \"low\"
- root_cause: Your best assessment of the root cause (or null if unclear)
- suggested_actions: List of recommended actions to investigate or fix
- affected_components: List of system components that appear affected

Be concise and actionable.",
        format_batch(batch)
    )
}

pub fn query_prompt(context: &QueryContext) -> String {
    let summary = &context.summary;

    let mut issues_text = String::new();
    if !context.recent_issues.is_empty() {
        issues_text.push_str("\nRecent issues detected:\n");
        let skip = context.recent_issues.len().saturating_sub(QUERY_MAX_ISSUES);
        for (i, issue) in context.recent_issues.iter().skip(skip).enumerate() {
            let _ = writeln!(
                issues_text,
                "{}. [{}] {}",
                i + 1,
                issue.severity(),
                issue.trigger_line.content
            );
        }
    }

    let mut logs_text = String::new();
    if !context.recent_lines.is_empty() {
        logs_text.push_str("\nSample of recent logs:\n");
        let skip = context.recent_lines.len().saturating_sub(QUERY_MAX_LINES);
        let sample: Vec<&str> = context
            .recent_lines
            .iter()
            .skip(skip)
            .map(|l| l.content.as_str())
            .collect();
        logs_text.push_str(&sample.join("\n"));
        logs_text.push('\n');
    }

    format!(
        "Based on the log monitoring data below, answer the user's question.

Summary:
- Time range: Last {} minutes
- Total log lines: {}
- Errors detected: {}
- Warnings detected: {}
{}{}
User question: {}

Respond in JSON format with:
- answer: Direct answer to the question
- health_status: \"healthy\", \"degraded\", or \"unhealthy\"
- issues_found: Number of significant issues found
- recommendations: List of recommendations (if any)

Be concise and direct.",
        summary.window_minutes,
        summary.total_lines,
        summary.error_count,
        summary.warning_count,
        issues_text,
        logs_text,
        context.query
    )
}

/// Decode a batch analysis reply. Missing fields take defaults; a reply that
/// is not a JSON object yields the fallback result.
pub fn parse_analysis(raw: &str) -> AnalysisResult {
    let Some(data) = parse_object(raw) else {
        return AnalysisResult::fallback(raw);
    };

    AnalysisResult {
        summary: string_field(&data, "summary").unwrap_or_else(|| "No summary available".to_string()),
        severity: string_field(&data, "severity")
            .map(|s| AnalysisSeverity::from_label(&s))
            .unwrap_or(AnalysisSeverity::Medium),
        root_cause: string_field(&data, "root_cause").filter(|s| !s.trim().is_empty()),
        suggested_actions: string_list(&data, "suggested_actions"),
        affected_components: string_list(&data, "affected_components"),
        raw_response: raw.to_string(),
    }
}

pub fn parse_query(raw: &str) -> QueryResult {
    let Some(data) = parse_object(raw) else {
        return QueryResult::fallback();
    };

    let issues_found = match data.get("issues_found") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    QueryResult {
        answer: string_field(&data, "answer").unwrap_or_else(|| "No answer available".to_string()),
        health_status: string_field(&data, "health_status")
            .map(|s| HealthStatus::from_label(&s))
            .unwrap_or(HealthStatus::Unknown),
        issues_found,
        recommendations: string_list(&data, "recommendations"),
    }
}

fn parse_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            tracing::debug!("Model reply is JSON but not an object");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Model reply is not valid JSON");
            None
        }
    }
}

fn string_field(data: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(data: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
