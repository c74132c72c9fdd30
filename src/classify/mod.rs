pub mod rule;

pub use rule::{CompiledRule, RuleError, RuleSet};

use crate::config::{FilterConfig, MinSeverity};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignore,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ignore => "ignore",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub severity: Severity,
    pub should_flag: bool,
    pub matched_pattern: Option<String>,
}

impl Classification {
    fn unflagged(severity: Severity) -> Self {
        Self {
            severity,
            should_flag: false,
            matched_pattern: None,
        }
    }

    fn flagged(severity: Severity, matched: &str) -> Self {
        Self {
            severity,
            should_flag: true,
            matched_pattern: Some(matched.to_string()),
        }
    }
}

/// Rule-based severity classifier. Holds only compiled rules, so `classify`
/// is deterministic and can be shared freely.
#[derive(Debug)]
pub struct Classifier {
    ignore: RuleSet,
    error: RuleSet,
    warning: RuleSet,
    min_severity: MinSeverity,
}

impl Classifier {
    pub fn from_config(config: &FilterConfig) -> Result<Self, RuleError> {
        Ok(Self {
            ignore: RuleSet::compile("ignore", &config.ignore_patterns)?,
            error: RuleSet::compile("error", &config.error_patterns)?,
            warning: RuleSet::compile("warning", &config.warning_patterns)?,
            min_severity: config.min_severity,
        })
    }

    /// Classify one line. Ignore rules take absolute precedence, then error
    /// rules, then (if the threshold admits them) warning rules.
    pub fn classify(&self, line: &str) -> Classification {
        if line.is_empty() || self.ignore.is_match(line) {
            return Classification::unflagged(Severity::Ignore);
        }

        if let Some(matched) = self.error.first_match(line) {
            return Classification::flagged(Severity::Error, matched);
        }

        if self.min_severity.admits_warnings() {
            if let Some(matched) = self.warning.first_match(line) {
                return Classification::flagged(Severity::Warning, matched);
            }
        }

        Classification::unflagged(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_classifier() -> Classifier {
        Classifier::from_config(&FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_error_line() {
        let result = default_classifier().classify("2024-01-05 ERROR connection refused");

        assert_eq!(result.severity, Severity::Error);
        assert!(result.should_flag);
        assert_eq!(result.matched_pattern.as_deref(), Some("ERROR"));
    }

    #[test]
    fn test_http_5xx_is_error() {
        let result = default_classifier().classify("GET /api/users 503 12ms");

        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.matched_pattern.as_deref(), Some("503"));
    }

    #[test]
    fn test_warning_line() {
        let result = default_classifier().classify("Retrying request in 2s");

        assert_eq!(result.severity, Severity::Warning);
        assert!(result.should_flag);
        assert_eq!(result.matched_pattern.as_deref(), Some("Retrying"));
    }

    #[test]
    fn test_info_line() {
        let result = default_classifier().classify("server listening on :8080");

        assert_eq!(result, Classification::unflagged(Severity::Info));
    }

    #[test]
    fn test_ignore_beats_error() {
        let classifier = default_classifier();

        for line in [
            "healthcheck failed with error",
            "# error: commented out",
            "Readiness probe timeout",
            "liveness-probe exception",
        ] {
            let result = classifier.classify(line);
            assert_eq!(result.severity, Severity::Ignore, "line: {line}");
            assert!(!result.should_flag, "line: {line}");
            assert!(result.matched_pattern.is_none());
        }
    }

    #[test]
    fn test_empty_line_ignored_even_without_rules() {
        let config = FilterConfig {
            ignore_patterns: Vec::new(),
            error_patterns: vec![".*".to_string()],
            ..FilterConfig::default()
        };
        let classifier = Classifier::from_config(&config).unwrap();

        assert_eq!(classifier.classify("").severity, Severity::Ignore);
        assert_eq!(classifier.classify("x").severity, Severity::Error);
    }

    #[test]
    fn test_error_rules_checked_before_warning() {
        let result = default_classifier().classify("warning: disk error");
        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.matched_pattern.as_deref(), Some("error"));
    }

    #[test]
    fn test_min_severity_error_suppresses_warnings() {
        let config = FilterConfig {
            min_severity: MinSeverity::Error,
            ..FilterConfig::default()
        };
        let classifier = Classifier::from_config(&config).unwrap();

        for line in ["WARN cache miss", "deprecated API used", "request throttled"] {
            let result = classifier.classify(line);
            assert_eq!(result.severity, Severity::Info, "line: {line}");
            assert!(!result.should_flag, "line: {line}");
        }

        assert!(classifier.classify("fatal: out of memory").should_flag);
    }

    #[test]
    fn test_classification_is_stateless() {
        let classifier = default_classifier();
        let first = classifier.classify("panic: nil pointer");
        classifier.classify("ok");
        let second = classifier.classify("panic: nil pointer");
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let config = FilterConfig {
            warning_patterns: vec!["[oops".to_string()],
            ..FilterConfig::default()
        };
        assert!(matches!(
            Classifier::from_config(&config),
            Err(RuleError::RegexCompilation { list: "warning", .. })
        ));
    }
}
