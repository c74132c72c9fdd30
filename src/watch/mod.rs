pub mod runner;

pub use runner::run_watch;

use crate::analyzer::AnalyzerError;
use crate::classify::RuleError;
use crate::config::{ConfigError, WatchConfig};
use crate::source::SourceError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can end a watch or query command
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("rule error: {0}")]
    Rules(#[from] RuleError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("batch ticker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// How often the ticker polls for a ready batch
    pub poll_interval: Duration,
    /// Only print flagged lines
    pub quiet: bool,
}

impl From<&WatchConfig> for WatchOptions {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            quiet: config.quiet,
        }
    }
}

/// Totals for one finished watch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub lines: u64,
    pub flagged: u64,
    pub batches: u64,
    pub issues: u64,
}

impl WatchStats {
    fn add_batch(&mut self, issues: usize) {
        self.batches += 1;
        self.issues += issues as u64;
    }
}
