use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub min_severity: MinSeverity,
    #[serde(default = "default_error_patterns")]
    pub error_patterns: Vec<String>,
    #[serde(default = "default_warning_patterns")]
    pub warning_patterns: Vec<String>,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_severity: MinSeverity::default(),
            error_patterns: default_error_patterns(),
            warning_patterns: default_warning_patterns(),
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

/// Lowest severity that is flagged for analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinSeverity {
    Error,
    #[default]
    Warning,
    Info,
}

impl MinSeverity {
    /// Whether warning rules are evaluated at all under this threshold
    pub fn admits_warnings(self) -> bool {
        matches!(self, MinSeverity::Warning | MinSeverity::Info)
    }
}

pub fn default_error_patterns() -> Vec<String> {
    [
        r"\berror\b",
        r"\bfail(ed|ure|ing)?\b",
        r"\bexception\b",
        r"\bcritical\b",
        r"\bfatal\b",
        r"\bpanic\b",
        r"\bcrash(ed|ing)?\b",
        r"\btimeout\b",
        r"\brefused\b",
        r"\bdenied\b",
        r"\bunauthorized\b",
        r"\bforbidden\b",
        r"\binvalid\b",
        r"\bcorrupt(ed|ion)?\b",
        r"\bout of memory\b",
        r"\boom\b",
        r"\bkill(ed|ing)?\b",
        r"\bsegfault\b",
        r"\bsegmentation fault\b",
        r"\babort(ed|ing)?\b",
        r"\bnot found\b",
        r"\b404\b",
        r"\b50[0-9]\b",
        r"\btraceback\b",
        r"\bstack\s*trace\b",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

pub fn default_warning_patterns() -> Vec<String> {
    [
        r"\bwarn(ing)?\b",
        r"\bdeprecated\b",
        r"\bretry(ing)?\b",
        r"\breconnect(ing)?\b",
        r"\bslow\b",
        r"\blatency\b",
        r"\bdelayed?\b",
        r"\bbackoff\b",
        r"\bthrottled?\b",
        r"\brate.?limit\b",
        r"\bhigh.?(cpu|memory|load)\b",
        r"\blow.?(disk|space|memory)\b",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

pub fn default_ignore_patterns() -> Vec<String> {
    [
        r"^$",
        r"^\s*#",
        r"health.?check",
        r"readiness.?probe",
        r"liveness.?probe",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_batch_window", with = "humantime_serde")]
    pub batch_window: Duration,
    #[serde(default = "default_history_retention", with = "humantime_serde")]
    pub history_retention: Duration,
    #[serde(default = "default_max_history_lines")]
    pub max_history_lines: usize,
    #[serde(default = "default_max_history_issues")]
    pub max_history_issues: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            batch_window: default_batch_window(),
            history_retention: default_history_retention(),
            max_history_lines: default_max_history_lines(),
            max_history_issues: default_max_history_issues(),
        }
    }
}

fn default_context_lines() -> usize {
    5
}

fn default_batch_window() -> Duration {
    Duration::from_secs(10)
}

fn default_history_retention() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_max_history_lines() -> usize {
    10000
}

fn default_max_history_issues() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Falls back to OPENAI_API_KEY when unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_analyzer_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            timeout: default_analyzer_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_analyzer_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// How often the ticker asks for a ready batch
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default)]
    pub quiet: bool,
    /// Existing container lines to replay before following
    #[serde(default)]
    pub container_tail: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            quiet: false,
            container_tail: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_channel_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.buffer.context_lines, 5);
        assert_eq!(config.buffer.batch_window, Duration::from_secs(10));
        assert_eq!(config.buffer.history_retention, Duration::from_secs(3600));
        assert_eq!(config.buffer.max_history_lines, 10000);
        assert_eq!(config.buffer.max_history_issues, 1000);
        assert_eq!(config.filter.min_severity, MinSeverity::Warning);
        assert_eq!(config.watch.poll_interval, Duration::from_secs(1));
        assert!(config.analyzer.api_key.is_none());
    }

    #[test]
    fn test_humantime_durations() {
        let yaml = r#"
buffer:
  batch_window: 2500ms
  history_retention: 15m
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.buffer.batch_window, Duration::from_millis(2500));
        assert_eq!(config.buffer.history_retention, Duration::from_secs(900));
    }

    #[test]
    fn test_partial_filter_keeps_other_defaults() {
        let yaml = r#"
filter:
  min_severity: error
  error_patterns: ["boom"]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.filter.min_severity, MinSeverity::Error);
        assert_eq!(config.filter.error_patterns, vec!["boom".to_string()]);
        assert_eq!(config.filter.warning_patterns, default_warning_patterns());
        assert_eq!(config.filter.ignore_patterns, default_ignore_patterns());
    }

    #[test]
    fn test_min_severity_admits_warnings() {
        assert!(!MinSeverity::Error.admits_warnings());
        assert!(MinSeverity::Warning.admits_warnings());
        assert!(MinSeverity::Info.admits_warnings());
    }
}
