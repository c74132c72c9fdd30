use crate::analyzer::{AnalysisResult, AnalysisSeverity, HealthStatus, QueryResult};
use crate::buffer::{IssueBatch, Summary};
use crate::classify::{Classification, Severity};
use console::{style, StyledObject};

fn severity_prefix(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "[ERR]",
        Severity::Warning => "[WRN]",
        Severity::Info => "[INF]",
        Severity::Ignore => "",
    }
}

fn analysis_badge(severity: AnalysisSeverity) -> StyledObject<&'static str> {
    match severity {
        AnalysisSeverity::Critical => style("[!!!]").white().on_red().bold(),
        AnalysisSeverity::High => style("[!!]").red().bold(),
        AnalysisSeverity::Medium => style("[!]").yellow(),
        AnalysisSeverity::Low => style("[i]").blue(),
    }
}

fn health_badge(status: HealthStatus) -> StyledObject<&'static str> {
    match status {
        HealthStatus::Healthy => style("HEALTHY").green().bold(),
        HealthStatus::Degraded => style("DEGRADED").yellow().bold(),
        HealthStatus::Unhealthy => style("UNHEALTHY").red().bold(),
        HealthStatus::Unknown => style("UNKNOWN").dim(),
    }
}

pub fn render_startup(source: &str, analysis_enabled: bool) -> String {
    let mut out = format!(
        "{} is watching {}\n{}",
        style("Hawkeye").cyan().bold(),
        style(source).green(),
        style("Press Ctrl+C to stop").dim()
    );
    if !analysis_enabled {
        out.push_str(&format!("\n{}", style("AI analysis disabled").yellow()));
    }
    out
}

/// One ingested line. Flagged lines carry the text that matched.
pub fn render_line(content: &str, classification: &Classification) -> String {
    let prefix = severity_prefix(classification.severity);
    let text = format!("{} {}", prefix, content);
    let mut out = match classification.severity {
        Severity::Error => style(text).red().bold().to_string(),
        Severity::Warning => style(text).yellow().to_string(),
        _ => style(content).dim().to_string(),
    };
    if let Some(pattern) = classification.matched_pattern.as_deref() {
        out.push_str(&format!("  {}", style(format!("(matched: {})", pattern)).dim()));
    }
    out
}

pub fn render_batch_header(batch: &IssueBatch) -> String {
    let errors = batch.count(Severity::Error);
    let warnings = batch.count(Severity::Warning);
    format!(
        "{} {} issue(s) from {} ({} error, {} warning)",
        style("Analyzing").cyan().bold(),
        batch.len(),
        batch.source,
        errors,
        warnings
    )
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let rule = style("─".repeat(60)).dim();
    let mut out = format!("{}\n{} {}\n", rule, analysis_badge(result.severity), result.summary);

    if let Some(root_cause) = &result.root_cause {
        out.push_str(&format!("\n{} {}\n", style("Root cause:").bold(), root_cause));
    }

    if !result.affected_components.is_empty() {
        out.push_str(&format!(
            "\n{} {}\n",
            style("Affected:").bold(),
            result.affected_components.join(", ")
        ));
    }

    if !result.suggested_actions.is_empty() {
        out.push_str(&format!("\n{}\n", style("Suggested actions:").bold()));
        for action in &result.suggested_actions {
            out.push_str(&format!("  - {}\n", action));
        }
    }

    out.push_str(&rule.to_string());
    out
}

pub fn render_query(result: &QueryResult) -> String {
    let mut out = format!("Status: {}\n\n{}\n", health_badge(result.health_status), result.answer);

    if result.issues_found > 0 {
        out.push_str(&format!(
            "\n{}\n",
            style(format!("Issues found: {}", result.issues_found)).yellow()
        ));
    }

    if !result.recommendations.is_empty() {
        out.push_str(&format!("\n{}\n", style("Recommendations:").bold()));
        for rec in &result.recommendations {
            out.push_str(&format!("  - {}\n", rec));
        }
    }

    out
}

pub fn render_summary(summary: &Summary) -> String {
    let count = |n: usize, style_nonzero: fn(StyledObject<String>) -> StyledObject<String>| {
        let styled = style(n.to_string());
        if n > 0 {
            style_nonzero(styled).to_string()
        } else {
            styled.green().to_string()
        }
    };

    [
        style("Status Summary").bold().to_string(),
        format!("  {:<14}Last {} minutes", "Time Range", summary.window_minutes),
        format!("  {:<14}{}", "Log Lines", summary.total_lines),
        format!("  {:<14}{}", "Total Issues", summary.total_issues),
        format!("  {:<14}{}", "Errors", count(summary.error_count, |s| s.red())),
        format!("  {:<14}{}", "Warnings", count(summary.warning_count, |s| s.yellow())),
    ]
    .join("\n")
}

pub fn print_startup(source: &str, analysis_enabled: bool) {
    println!("\n{}\n", render_startup(source, analysis_enabled));
}

pub fn print_line(content: &str, classification: &Classification) {
    println!("{}", render_line(content, classification));
}

pub fn print_batch_header(batch: &IssueBatch) {
    println!("\n{}", render_batch_header(batch));
}

pub fn print_analysis(result: &AnalysisResult) {
    println!("{}\n", render_analysis(result));
}

pub fn print_query(result: &QueryResult) {
    println!("\n{}", render_query(result));
}

pub fn print_summary(summary: &Summary) {
    println!("\n{}\n", render_summary(summary));
}

pub fn print_info(message: &str) {
    println!("{}", style(message).cyan());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}
