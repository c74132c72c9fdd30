//! LLM-backed analysis of issue batches and free-form questions.
//!
//! The watch loop only talks to the [`Analyzer`] trait. Failures never stop a
//! session: [`analyze_or_fallback`] and [`answer_or_fallback`] swap any error
//! for a fixed placeholder result.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiAnalyzer;

use crate::buffer::{Issue, IssueBatch, Summary};
use crate::source::LogLine;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API returned error status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("no API key configured (set OPENAI_API_KEY or pass --api-key)")]
    MissingApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl AnalysisSeverity {
    /// Lenient parse of a model-supplied label; anything unrecognised is medium
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for AnalysisSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "healthy" => Self::Healthy,
            "degraded" => Self::Degraded,
            "unhealthy" => Self::Unhealthy,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub severity: AnalysisSeverity,
    pub root_cause: Option<String>,
    pub suggested_actions: Vec<String>,
    pub affected_components: Vec<String>,
    pub raw_response: String,
}

impl AnalysisResult {
    pub const FALLBACK_SUMMARY: &'static str = "Failed to parse analysis";

    pub fn fallback(raw_response: impl Into<String>) -> Self {
        Self {
            summary: Self::FALLBACK_SUMMARY.to_string(),
            severity: AnalysisSeverity::Medium,
            root_cause: None,
            suggested_actions: Vec::new(),
            affected_components: Vec::new(),
            raw_response: raw_response.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub health_status: HealthStatus,
    pub issues_found: u64,
    pub recommendations: Vec<String>,
}

impl QueryResult {
    pub const FALLBACK_ANSWER: &'static str = "Unable to process query";

    pub fn fallback() -> Self {
        Self {
            answer: Self::FALLBACK_ANSWER.to_string(),
            health_status: HealthStatus::Unknown,
            issues_found: 0,
            recommendations: Vec::new(),
        }
    }
}

/// History snapshot a question is answered against
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query: String,
    pub summary: Summary,
    pub recent_issues: Vec<Issue>,
    pub recent_lines: Vec<LogLine>,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze_batch(&self, batch: &IssueBatch) -> Result<AnalysisResult, AnalyzerError>;

    async fn answer_query(&self, context: &QueryContext) -> Result<QueryResult, AnalyzerError>;
}

pub async fn analyze_or_fallback(analyzer: &dyn Analyzer, batch: &IssueBatch) -> AnalysisResult {
    match analyzer.analyze_batch(batch).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                batch_id = %batch.batch_id,
                issues = batch.len(),
                error = %e,
                "Batch analysis failed, using fallback"
            );
            AnalysisResult::fallback(String::new())
        }
    }
}

pub async fn answer_or_fallback(analyzer: &dyn Analyzer, context: &QueryContext) -> QueryResult {
    match analyzer.answer_query(context).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Query failed, using fallback");
            QueryResult::fallback()
        }
    }
}
