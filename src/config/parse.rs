use super::types::*;
use crate::config::{env_var_regex, expand_env_vars};
use regex::RegexBuilder;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate config text (after `$env{}` expansion)
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    // An empty file is a valid "all defaults" config
    let config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let env_var = env_var_regex();
    // Comment lines are never deserialized
    let mut unexpanded_vars: Vec<String> = yaml_string
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| env_var.captures_iter(line))
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}\n\
         Set them (e.g. export OPENAI_API_KEY=...) or replace the $env{{}} references in the config file",
        unexpanded_vars.join(", ")
    )))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_patterns("filter.error_patterns", &config.filter.error_patterns, &mut errors);
    validate_patterns("filter.warning_patterns", &config.filter.warning_patterns, &mut errors);
    validate_patterns("filter.ignore_patterns", &config.filter.ignore_patterns, &mut errors);

    if config.buffer.max_history_lines == 0 {
        errors.push("buffer.max_history_lines must be greater than 0".to_string());
    }
    if config.buffer.max_history_issues == 0 {
        errors.push("buffer.max_history_issues must be greater than 0".to_string());
    }
    if config.buffer.history_retention.is_zero() {
        errors.push("buffer.history_retention must be greater than 0".to_string());
    }
    if config.watch.poll_interval.is_zero() {
        errors.push("watch.poll_interval must be greater than 0".to_string());
    }
    if config.watch.channel_capacity == 0 {
        errors.push("watch.channel_capacity must be greater than 0".to_string());
    }
    if config.analyzer.base_url.trim().is_empty() {
        errors.push("analyzer.base_url cannot be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_patterns(context: &str, patterns: &[String], errors: &mut Vec<String>) {
    for (i, pattern) in patterns.iter().enumerate() {
        if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
            errors.push(format!("{}[{}]: invalid regex '{}': {}", context, i, pattern, e));
        }
    }
}
