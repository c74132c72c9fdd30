use crate::buffer::{BatchAccumulator, HistoryStore, Issue, IssueAssembler, IssueBatch, Summary};
use crate::classify::{Classification, Classifier, RuleError};
use crate::config::Config;
use crate::source::LogLine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Session state shared between the ingestion loop and the batch ticker
pub type SharedSession = Arc<Mutex<WatchSession>>;

/// What happened to one ingested line
#[derive(Debug, Clone)]
pub struct LineOutcome {
    pub classification: Classification,
    /// Issues sealed by this line, oldest first
    pub sealed: Vec<Issue>,
}

/// Everything one watch needs: the classifier plus the buffers it feeds.
///
/// Passed explicitly to whichever command needs it; `ask` and `status` build
/// their own from a file.
#[derive(Debug)]
pub struct WatchSession {
    source: String,
    classifier: Classifier,
    assembler: IssueAssembler,
    accumulator: BatchAccumulator,
    history: HistoryStore,
    lines_seen: u64,
}

impl WatchSession {
    pub fn new(config: &Config, source: impl Into<String>) -> Result<Self, RuleError> {
        let buffer = &config.buffer;
        Ok(Self {
            source: source.into(),
            classifier: Classifier::from_config(&config.filter)?,
            assembler: IssueAssembler::new(buffer.context_lines),
            accumulator: BatchAccumulator::new(buffer.batch_window),
            history: HistoryStore::new(
                buffer.max_history_lines,
                buffer.max_history_issues,
                buffer.history_retention,
            ),
            lines_seen: 0,
        })
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ingest(&mut self, line: LogLine) -> LineOutcome {
        self.ingest_at(line, Utc::now())
    }

    /// Classify, assemble and record one line
    pub fn ingest_at(&mut self, line: LogLine, now: DateTime<Utc>) -> LineOutcome {
        self.lines_seen += 1;
        let classification = self.classifier.classify(&line.content);

        self.history.record_line(line.clone());
        let sealed = self.assembler.observe_at(line, &classification, now);
        for issue in &sealed {
            self.history.record_issue(issue.clone());
            self.accumulator.add_issue_at(issue.clone(), now);
        }

        LineOutcome {
            classification,
            sealed,
        }
    }

    pub fn poll_ready(&mut self) -> Option<IssueBatch> {
        self.poll_ready_at(Utc::now())
    }

    pub fn poll_ready_at(&mut self, now: DateTime<Utc>) -> Option<IssueBatch> {
        self.accumulator.poll_ready_at(&self.source, now)
    }

    pub fn force_flush(&mut self) -> Option<IssueBatch> {
        self.force_flush_at(Utc::now())
    }

    /// Seal every pending issue and close the open batch regardless of age
    pub fn force_flush_at(&mut self, now: DateTime<Utc>) -> Option<IssueBatch> {
        let drained = self.assembler.force_seal();
        for issue in &drained {
            self.history.record_issue(issue.clone());
        }
        self.accumulator.force_flush_at(drained, &self.source, now)
    }

    pub fn prune_history(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        self.history.prune_expired(now)
    }

    pub fn summarize(&self, window: Duration) -> Summary {
        self.history.summarize(window)
    }

    pub fn recent_issues(&self, window: Duration) -> Vec<Issue> {
        self.history.recent_issues(window)
    }

    pub fn recent_lines(&self, window: Duration) -> Vec<LogLine> {
        self.history.recent_lines(window)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn pending_issues(&self) -> usize {
        self.assembler.pending_count()
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }
}
