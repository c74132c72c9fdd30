pub mod container;
pub mod file;
pub mod stdin;
pub mod timestamp;

use crate::config::WatchConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub use container::ContainerSource;
pub use file::{FileSource, ReadStart};
pub use stdin::{StdinSource, StreamSource};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("container '{container}' unavailable: {reason}")]
    ContainerUnavailable { container: String, reason: String },

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("log stream for '{name}' ended unexpectedly: {reason}")]
    StreamEnded { name: String, reason: String },
}

/// A single line of log output. The timestamp is assigned by the source adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl LogLine {
    pub fn new(content: impl Into<String>, timestamp: DateTime<Utc>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp,
            source: source.into(),
        }
    }

    /// A line stamped with the current time
    pub fn now(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(content, Utc::now(), source)
    }
}

/// Producer of log lines for a watch session.
///
/// `next_line` is polled inside `tokio::select!` and must be cancel safe:
/// dropping the future before it completes must not lose a line.
#[async_trait]
pub trait LineSource: Send {
    /// Identifier carried by every line and batch from this source
    fn name(&self) -> &str;

    /// Next line, or `None` once the source is exhausted
    async fn next_line(&mut self) -> Result<Option<LogLine>, SourceError>;

    /// Release any underlying resources
    async fn close(&mut self) {}
}

/// Where a watch session reads from, as written on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    File(PathBuf),
    Container(String),
}

impl SourceSpec {
    /// `-` is stdin, `docker:NAME` a container, anything else a file path
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            SourceSpec::Stdin
        } else if let Some(container) = arg.strip_prefix("docker:") {
            SourceSpec::Container(container.to_string())
        } else {
            SourceSpec::File(PathBuf::from(arg))
        }
    }

    /// Open the source for a live watch session
    pub async fn open(&self, start: ReadStart, config: &WatchConfig) -> Result<Box<dyn LineSource>, SourceError> {
        match self {
            SourceSpec::Stdin => Ok(Box::new(StdinSource::stdin())),
            SourceSpec::File(path) => {
                let mut source = FileSource::new(path.clone(), start, true);
                source.open()?;
                Ok(Box::new(source))
            }
            SourceSpec::Container(name) => {
                let source =
                    ContainerSource::spawn(name, config.container_tail, config.channel_capacity).await?;
                Ok(Box::new(source))
            }
        }
    }
}
