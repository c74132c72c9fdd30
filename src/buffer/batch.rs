use crate::buffer::issue::Issue;
use crate::classify::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// A closed, time-boxed group of sealed issues handed to the analyzer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueBatch {
    pub batch_id: Uuid,
    pub source: String,
    pub issues: Vec<Issue>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl IssueBatch {
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity() == severity).count()
    }
}

#[derive(Debug)]
struct OpenBatch {
    issues: Vec<Issue>,
    opened_at: DateTime<Utc>,
}

/// Groups sealed issues into batches that close after a fixed window
#[derive(Debug)]
pub struct BatchAccumulator {
    window: Duration,
    open: Option<OpenBatch>,
}

impl BatchAccumulator {
    pub fn new(window: Duration) -> Self {
        Self { window, open: None }
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.add_issue_at(issue, Utc::now());
    }

    /// Append to the open batch, opening one at `now` if needed
    pub fn add_issue_at(&mut self, issue: Issue, now: DateTime<Utc>) {
        self.open
            .get_or_insert_with(|| OpenBatch {
                issues: Vec::new(),
                opened_at: now,
            })
            .issues
            .push(issue);
    }

    pub fn poll_ready(&mut self, source: &str) -> Option<IssueBatch> {
        self.poll_ready_at(source, Utc::now())
    }

    /// Close and return the open batch once its window has elapsed
    pub fn poll_ready_at(&mut self, source: &str, now: DateTime<Utc>) -> Option<IssueBatch> {
        let open = self.open.as_ref()?;
        // A clock that went backwards reads as not yet elapsed
        let elapsed = (now - open.opened_at).to_std().ok()?;
        if elapsed < self.window {
            return None;
        }
        self.close(source, now)
    }

    pub fn force_flush(&mut self, drained: Vec<Issue>, source: &str) -> Option<IssueBatch> {
        self.force_flush_at(drained, source, Utc::now())
    }

    /// Add the force-sealed issues, then close whatever is open regardless of age
    pub fn force_flush_at(
        &mut self,
        drained: Vec<Issue>,
        source: &str,
        now: DateTime<Utc>,
    ) -> Option<IssueBatch> {
        for issue in drained {
            self.add_issue_at(issue, now);
        }
        self.close(source, now)
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn has_open_batch(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_len(&self) -> usize {
        self.open.as_ref().map_or(0, |b| b.issues.len())
    }

    fn close(&mut self, source: &str, now: DateTime<Utc>) -> Option<IssueBatch> {
        let open = self.open.take()?;
        if open.issues.is_empty() {
            return None;
        }

        let batch = IssueBatch {
            batch_id: Uuid::new_v4(),
            source: source.to_string(),
            issues: open.issues,
            opened_at: open.opened_at,
            closed_at: now,
        };
        tracing::debug!(
            batch_id = %batch.batch_id,
            source = %batch.source,
            issues = batch.len(),
            "Batch closed"
        );
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::source::LogLine;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn issue(content: &str) -> Issue {
        Issue {
            id: Uuid::new_v4(),
            trigger_line: LogLine::now(content, "test"),
            classification: Classification {
                severity: Severity::Error,
                should_flag: true,
                matched_pattern: Some("error".to_string()),
            },
            context_before: Vec::new(),
            context_after: Vec::new(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_not_ready_before_window() {
        let mut acc = BatchAccumulator::new(Duration::from_secs(10));
        acc.add_issue_at(issue("e1"), t(0));

        assert!(acc.poll_ready_at("src", t(0)).is_none());
        assert!(acc.poll_ready_at("src", t(9)).is_none());
        assert!(acc.has_open_batch());

        let batch = acc.poll_ready_at("src", t(10)).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.opened_at, t(0));
        assert_eq!(batch.closed_at, t(10));
        assert_eq!(batch.source, "src");
        assert!(!acc.has_open_batch());
    }

    #[test]
    fn test_window_measured_from_first_issue() {
        let mut acc = BatchAccumulator::new(Duration::from_secs(10));
        acc.add_issue_at(issue("e1"), t(0));
        acc.add_issue_at(issue("e2"), t(8));

        let batch = acc.poll_ready_at("src", t(10)).unwrap();
        let triggers: Vec<_> = batch
            .issues
            .iter()
            .map(|i| i.trigger_line.content.as_str())
            .collect();
        assert_eq!(triggers, vec!["e1", "e2"]);
    }

    #[test]
    fn test_poll_without_batch() {
        let mut acc = BatchAccumulator::new(Duration::ZERO);
        assert!(acc.poll_ready_at("src", t(100)).is_none());
    }

    #[test]
    fn test_zero_window_ready_immediately() {
        let mut acc = BatchAccumulator::new(Duration::ZERO);
        acc.add_issue_at(issue("e1"), t(5));
        assert!(acc.poll_ready_at("src", t(5)).is_some());
    }

    #[test]
    fn test_clock_going_backwards_is_not_ready() {
        let mut acc = BatchAccumulator::new(Duration::ZERO);
        acc.add_issue_at(issue("e1"), t(5));
        assert!(acc.poll_ready_at("src", t(4)).is_none());
    }

    #[test]
    fn test_force_flush_ignores_window() {
        let mut acc = BatchAccumulator::new(Duration::from_secs(3600));
        acc.add_issue_at(issue("e1"), t(0));

        let batch = acc
            .force_flush_at(vec![issue("partial")], "src", t(1))
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.issues[1].trigger_line.content, "partial");
        assert!(!acc.has_open_batch());
    }

    #[test]
    fn test_force_flush_opens_for_drained_issues() {
        let mut acc = BatchAccumulator::new(Duration::from_secs(10));
        let batch = acc.force_flush_at(vec![issue("e1")], "src", t(3)).unwrap();
        assert_eq!(batch.opened_at, t(3));
    }

    #[test]
    fn test_force_flush_empty() {
        let mut acc = BatchAccumulator::new(Duration::from_secs(10));
        assert!(acc.force_flush_at(Vec::new(), "src", t(0)).is_none());
        assert!(!acc.has_open_batch());
    }

    #[test]
    fn test_batch_ids_unique() {
        let mut acc = BatchAccumulator::new(Duration::ZERO);
        acc.add_issue_at(issue("e1"), t(0));
        let first = acc.poll_ready_at("src", t(0)).unwrap();
        acc.add_issue_at(issue("e2"), t(1));
        let second = acc.poll_ready_at("src", t(1)).unwrap();
        assert_ne!(first.batch_id, second.batch_id);
    }
}
