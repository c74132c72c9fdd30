use crate::analyzer::prompt::{self, ANALYSIS_SYSTEM_PROMPT, QUERY_SYSTEM_PROMPT};
use crate::analyzer::{AnalysisResult, Analyzer, AnalyzerError, QueryContext, QueryResult};
use crate::buffer::IssueBatch;
use crate::config::AnalyzerConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for any OpenAI-compatible `chat/completions` endpoint
#[derive(Debug)]
pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnalyzerError::MissingApiKey)?;

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system/user exchange and return the raw message content
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AnalyzerError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.1,
        });

        tracing::debug!(url = %url, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let reply: Value = serde_json::from_str(&text)?;

        reply
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(Value::as_str)
            .filter(|content| !content.trim().is_empty())
            .map(str::to_string)
            .ok_or(AnalyzerError::EmptyResponse)
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalyzerError {
        if e.is_timeout() {
            AnalyzerError::Timeout(self.timeout)
        } else {
            AnalyzerError::Http(e)
        }
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn analyze_batch(&self, batch: &IssueBatch) -> Result<AnalysisResult, AnalyzerError> {
        let raw = self
            .complete(ANALYSIS_SYSTEM_PROMPT, &prompt::batch_prompt(batch))
            .await?;
        Ok(prompt::parse_analysis(&raw))
    }

    async fn answer_query(&self, context: &QueryContext) -> Result<QueryResult, AnalyzerError> {
        let raw = self
            .complete(QUERY_SYSTEM_PROMPT, &prompt::query_prompt(context))
            .await?;
        Ok(prompt::parse_query(&raw))
    }
}
