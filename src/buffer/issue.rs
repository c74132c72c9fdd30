use crate::buffer::window::ContextWindow;
use crate::classify::{Classification, Severity};
use crate::source::LogLine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// A flagged line with its surrounding context. Immutable once sealed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: Uuid,
    pub trigger_line: LogLine,
    pub classification: Classification,
    pub context_before: Vec<LogLine>,
    pub context_after: Vec<LogLine>,
    pub detected_at: DateTime<Utc>,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        self.classification.severity
    }
}

/// An issue still collecting trailing context
#[derive(Debug)]
struct PendingIssue {
    issue: Issue,
    needed: usize,
}

impl PendingIssue {
    fn is_complete(&self) -> bool {
        self.issue.context_after.len() >= self.needed
    }
}

/// Opens issues on flagged lines and seals them once their trailing context
/// is complete.
///
/// Sealed issues leave in the order they were opened. An issue that fills up
/// behind an older, still-pending one stops collecting and waits its turn.
#[derive(Debug)]
pub struct IssueAssembler {
    window: ContextWindow,
    context_size: usize,
    pending: VecDeque<PendingIssue>,
}

impl IssueAssembler {
    pub fn new(context_size: usize) -> Self {
        Self {
            window: ContextWindow::new(context_size),
            context_size,
            pending: VecDeque::new(),
        }
    }

    /// Feed one classified line; returns the issues it sealed, oldest first
    pub fn observe(&mut self, line: LogLine, classification: &Classification) -> Vec<Issue> {
        self.observe_at(line, classification, Utc::now())
    }

    /// Like [`observe`](Self::observe), stamping new issues with `now`
    pub fn observe_at(
        &mut self,
        line: LogLine,
        classification: &Classification,
        now: DateTime<Utc>,
    ) -> Vec<Issue> {
        for pending in self.pending.iter_mut().filter(|p| !p.is_complete()) {
            pending.issue.context_after.push(line.clone());
        }

        if classification.should_flag {
            self.pending.push_back(PendingIssue {
                issue: Issue {
                    id: Uuid::new_v4(),
                    trigger_line: line.clone(),
                    classification: classification.clone(),
                    context_before: self.window.snapshot(),
                    context_after: Vec::with_capacity(self.context_size),
                    detected_at: now,
                },
                needed: self.context_size,
            });
        }

        let sealed = self.drain_complete();
        self.window.push(line);
        sealed
    }

    /// Seal every pending issue with whatever trailing context it has
    pub fn force_seal(&mut self) -> Vec<Issue> {
        self.pending.drain(..).map(|p| p.issue).collect()
    }

    /// Change the context size for issues opened from now on
    pub fn set_context_size(&mut self, context_size: usize) {
        self.context_size = context_size;
        self.window.resize(context_size);
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn drain_complete(&mut self) -> Vec<Issue> {
        let mut sealed = Vec::new();
        while self.pending.front().is_some_and(PendingIssue::is_complete) {
            if let Some(pending) = self.pending.pop_front() {
                tracing::debug!(
                    issue_id = %pending.issue.id,
                    severity = %pending.issue.severity(),
                    after = pending.issue.context_after.len(),
                    "Issue sealed"
                );
                sealed.push(pending.issue);
            }
        }
        sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::config::FilterConfig;

    struct Harness {
        classifier: Classifier,
        assembler: IssueAssembler,
    }

    impl Harness {
        fn new(context_size: usize) -> Self {
            Self {
                classifier: Classifier::from_config(&FilterConfig::default()).unwrap(),
                assembler: IssueAssembler::new(context_size),
            }
        }

        fn feed(&mut self, content: &str) -> Vec<Issue> {
            let classification = self.classifier.classify(content);
            self.assembler
                .observe(LogLine::now(content, "test"), &classification)
        }

        fn feed_all(&mut self, lines: &[&str]) -> Vec<Issue> {
            lines.iter().flat_map(|l| self.feed(l)).collect()
        }
    }

    fn contents(lines: &[LogLine]) -> Vec<&str> {
        lines.iter().map(|l| l.content.as_str()).collect()
    }

    #[test]
    fn test_seals_after_exact_context() {
        let mut h = Harness::new(2);

        assert!(h.feed_all(&["ok", "ERROR boom", "a"]).is_empty());
        let sealed = h.feed("b");

        assert_eq!(sealed.len(), 1);
        let issue = &sealed[0];
        assert_eq!(issue.trigger_line.content, "ERROR boom");
        assert_eq!(contents(&issue.context_before), vec!["ok"]);
        assert_eq!(contents(&issue.context_after), vec!["a", "b"]);
        assert_eq!(h.assembler.pending_count(), 0);

        assert!(h.feed("c").is_empty());
    }

    #[test]
    fn test_before_context_capped() {
        let mut h = Harness::new(2);
        h.feed_all(&["one", "two", "three", "fatal crash"]);

        let sealed = h.assembler.force_seal();
        assert_eq!(contents(&sealed[0].context_before), vec!["two", "three"]);
        assert!(sealed[0].context_after.is_empty());
    }

    #[test]
    fn test_overlapping_issues() {
        let mut h = Harness::new(3);
        let sealed = h.feed_all(&["E1-error", "x", "E2-error", "y", "z", "w"]);

        assert_eq!(sealed.len(), 2);
        let (e1, e2) = (&sealed[0], &sealed[1]);

        assert_eq!(e1.trigger_line.content, "E1-error");
        assert!(e1.context_before.is_empty());
        assert_eq!(contents(&e1.context_after), vec!["x", "E2-error", "y"]);

        assert_eq!(e2.trigger_line.content, "E2-error");
        assert_eq!(contents(&e2.context_before), vec!["E1-error", "x"]);
        assert_eq!(contents(&e2.context_after), vec!["y", "z", "w"]);
    }

    #[test]
    fn test_younger_issue_waits_for_older() {
        let mut h = Harness::new(2);
        h.feed("ERROR first");
        h.assembler.set_context_size(0);

        // Opens with no trailing context needed but must wait behind "first"
        assert!(h.feed("ERROR second").is_empty());
        assert_eq!(h.assembler.pending_count(), 2);

        let sealed = h.feed("tail");
        assert_eq!(sealed.len(), 2);
        assert_eq!(sealed[0].trigger_line.content, "ERROR first");
        assert_eq!(contents(&sealed[0].context_after), vec!["ERROR second", "tail"]);
        assert_eq!(sealed[1].trigger_line.content, "ERROR second");
        assert!(sealed[1].context_after.is_empty());
    }

    #[test]
    fn test_zero_context_seals_immediately() {
        let mut h = Harness::new(0);
        h.feed("before");

        let sealed = h.feed("panic: boom");
        assert_eq!(sealed.len(), 1);
        assert!(sealed[0].context_before.is_empty());
        assert!(sealed[0].context_after.is_empty());
    }

    #[test]
    fn test_force_seal_partial_context() {
        let mut h = Harness::new(5);
        h.feed_all(&["ERROR boom", "a", "b"]);

        let sealed = h.assembler.force_seal();
        assert_eq!(sealed.len(), 1);
        assert_eq!(contents(&sealed[0].context_after), vec!["a", "b"]);

        assert!(h.assembler.force_seal().is_empty());
    }

    #[test]
    fn test_ignored_line_never_opens_issue() {
        let mut h = Harness::new(1);
        h.feed_all(&["healthcheck error", "# fatal", ""]);

        assert_eq!(h.assembler.pending_count(), 0);
        assert!(h.assembler.force_seal().is_empty());
    }

    #[test]
    fn test_pending_issue_keeps_its_own_size() {
        let mut h = Harness::new(3);
        h.feed("ERROR boom");
        h.assembler.set_context_size(1);

        assert!(h.feed_all(&["a", "b"]).is_empty());
        let sealed = h.feed("c");
        assert_eq!(contents(&sealed[0].context_after), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_observe_at_stamps_detection_time() {
        let classifier = Classifier::from_config(&FilterConfig::default()).unwrap();
        let mut assembler = IssueAssembler::new(0);
        let at: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();

        let line = LogLine::new("fatal: disk", at, "test");
        let classification = classifier.classify(&line.content);
        let sealed = assembler.observe_at(line, &classification, at);

        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].detected_at, at);
    }
}
