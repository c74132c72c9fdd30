/// Starter config written by `heye config init`. Every value shown is the built-in default.
pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# HAWKEYE CONFIGURATION
# =============================================================================
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/hawkeye/config.yml
#   3. /etc/hawkeye/config.yml
# Command line flags override values from this file.
# Values written as $env followed by {NAME} are read from the environment
# variable NAME when loading.

# =============================================================================
# FILTER
# =============================================================================
# Lines are matched case-insensitively. Ignore rules win over everything,
# then error rules, then warning rules. Rules run in list order and the text
# matched by the first hit is reported.
filter:
  # Lowest severity that gets flagged: 'error', 'warning' or 'info'
  min_severity: warning
  error_patterns:
    - '\berror\b'
    - '\bfail(ed|ure|ing)?\b'
    - '\bexception\b'
    - '\bcritical\b'
    - '\bfatal\b'
    - '\bpanic\b'
    - '\bcrash(ed|ing)?\b'
    - '\btimeout\b'
    - '\brefused\b'
    - '\bdenied\b'
    - '\bunauthorized\b'
    - '\bforbidden\b'
    - '\binvalid\b'
    - '\bcorrupt(ed|ion)?\b'
    - '\bout of memory\b'
    - '\boom\b'
    - '\bkill(ed|ing)?\b'
    - '\bsegfault\b'
    - '\bsegmentation fault\b'
    - '\babort(ed|ing)?\b'
    - '\bnot found\b'
    - '\b404\b'
    - '\b50[0-9]\b'
    - '\btraceback\b'
    - '\bstack\s*trace\b'
  warning_patterns:
    - '\bwarn(ing)?\b'
    - '\bdeprecated\b'
    - '\bretry(ing)?\b'
    - '\breconnect(ing)?\b'
    - '\bslow\b'
    - '\blatency\b'
    - '\bdelayed?\b'
    - '\bbackoff\b'
    - '\bthrottled?\b'
    - '\brate.?limit\b'
    - '\bhigh.?(cpu|memory|load)\b'
    - '\blow.?(disk|space|memory)\b'
  ignore_patterns:
    - '^$'
    - '^\s*#'
    - 'health.?check'
    - 'readiness.?probe'
    - 'liveness.?probe'

# =============================================================================
# BUFFER
# =============================================================================
buffer:
  # Lines of context captured before and after each flagged line
  context_lines: 5
  # Issues are batched for this long before being sent for analysis
  batch_window: 10s
  # History kept for 'ask' and 'status' queries
  history_retention: 60m
  max_history_lines: 10000
  max_history_issues: 1000

# =============================================================================
# ANALYZER
# =============================================================================
# Any OpenAI-compatible chat completions endpoint works.
analyzer:
  model: gpt-4o-mini
  base_url: https://api.openai.com/v1
  # api_key is read from OPENAI_API_KEY or --api-key when not set here
  timeout: 60s

# =============================================================================
# WATCH
# =============================================================================
watch:
  # How often the open batch is checked for readiness
  poll_interval: 1s
  # Only print flagged lines
  quiet: false
  # Existing container log lines to replay before following
  container_tail: 0
  # Lines buffered between the container reader and the classifier
  channel_capacity: 1024
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse::parse_config;
    use crate::config::types::{default_error_patterns, default_ignore_patterns, default_warning_patterns};

    #[test]
    fn test_starter_config_has_no_env_references() {
        assert!(!generate_starter_config().contains("$env{"));
    }

    #[test]
    fn test_starter_config_matches_defaults() {
        let config = parse_config(&generate_starter_config()).unwrap();

        assert_eq!(config.filter.error_patterns, default_error_patterns());
        assert_eq!(config.filter.warning_patterns, default_warning_patterns());
        assert_eq!(config.filter.ignore_patterns, default_ignore_patterns());
        assert_eq!(config.buffer.context_lines, 5);
        assert_eq!(config.watch.channel_capacity, 1024);
    }
}
