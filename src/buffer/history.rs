use crate::buffer::issue::Issue;
use crate::classify::Severity;
use crate::source::LogLine;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Counts over a trailing window of history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub window_minutes: u64,
    pub total_lines: usize,
    pub total_issues: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Bounded record of recent lines and sealed issues.
///
/// Both logs evict oldest-first when full. Retention is enforced by
/// [`HistoryStore::prune_expired`] and by clamping every query window.
#[derive(Debug)]
pub struct HistoryStore {
    lines: VecDeque<LogLine>,
    issues: VecDeque<Issue>,
    max_lines: usize,
    max_issues: usize,
    retention: Duration,
}

impl HistoryStore {
    pub fn new(max_lines: usize, max_issues: usize, retention: Duration) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(10_000)),
            issues: VecDeque::with_capacity(max_issues.min(1_000)),
            max_lines,
            max_issues,
            retention,
        }
    }

    pub fn record_line(&mut self, line: LogLine) {
        push_bounded(&mut self.lines, line, self.max_lines);
    }

    pub fn record_issue(&mut self, issue: Issue) {
        push_bounded(&mut self.issues, issue, self.max_issues);
    }

    pub fn recent_lines(&self, window: Duration) -> Vec<LogLine> {
        self.recent_lines_at(window, Utc::now())
    }

    pub fn recent_lines_at(&self, window: Duration, now: DateTime<Utc>) -> Vec<LogLine> {
        let cutoff = self.cutoff(window, now);
        self.lines
            .iter()
            .filter(|l| l.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn recent_issues(&self, window: Duration) -> Vec<Issue> {
        self.recent_issues_at(window, Utc::now())
    }

    pub fn recent_issues_at(&self, window: Duration, now: DateTime<Utc>) -> Vec<Issue> {
        let cutoff = self.cutoff(window, now);
        self.issues
            .iter()
            .filter(|i| i.detected_at >= cutoff)
            .cloned()
            .collect()
    }

    pub fn summarize(&self, window: Duration) -> Summary {
        self.summarize_at(window, Utc::now())
    }

    pub fn summarize_at(&self, window: Duration, now: DateTime<Utc>) -> Summary {
        let cutoff = self.cutoff(window, now);
        let issues: Vec<&Issue> = self
            .issues
            .iter()
            .filter(|i| i.detected_at >= cutoff)
            .collect();

        Summary {
            window_minutes: window.as_secs() / 60,
            total_lines: self.lines.iter().filter(|l| l.timestamp >= cutoff).count(),
            total_issues: issues.len(),
            error_count: issues.iter().filter(|i| i.severity() == Severity::Error).count(),
            warning_count: issues
                .iter()
                .filter(|i| i.severity() == Severity::Warning)
                .count(),
        }
    }

    /// Drop everything older than the retention window. Returns (lines, issues) removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        let cutoff = window_start(now, self.retention);
        let lines_before = self.lines.len();
        let issues_before = self.issues.len();

        self.lines.retain(|l| l.timestamp >= cutoff);
        self.issues.retain(|i| i.detected_at >= cutoff);

        let pruned = (
            lines_before - self.lines.len(),
            issues_before - self.issues.len(),
        );
        if pruned != (0, 0) {
            tracing::trace!(lines = pruned.0, issues = pruned.1, "Pruned expired history");
        }
        pruned
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn cutoff(&self, window: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
        window_start(now, window.min(self.retention))
    }
}

fn push_bounded<T>(log: &mut VecDeque<T>, item: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while log.len() >= capacity {
        log.pop_front();
    }
    log.push_back(item);
}

fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
