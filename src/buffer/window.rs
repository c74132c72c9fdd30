use crate::source::LogLine;
use std::collections::VecDeque;

/// Sliding window of the most recent lines, used as leading context
#[derive(Debug, Clone)]
pub struct ContextWindow {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: LogLine) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Ordered copy, oldest first
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lines.iter().cloned().collect()
    }

    /// Change capacity, dropping the oldest lines that no longer fit
    pub fn resize(&mut self, capacity: usize) {
        while self.lines.len() > capacity {
            self.lines.pop_front();
        }
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(content: &str) -> LogLine {
        LogLine::now(content, "test")
    }

    fn contents(lines: &[LogLine]) -> Vec<&str> {
        lines.iter().map(|l| l.content.as_str()).collect()
    }

    #[test]
    fn test_evicts_oldest() {
        let mut window = ContextWindow::new(2);
        window.push(line("a"));
        window.push(line("b"));
        window.push(line("c"));

        assert_eq!(window.len(), 2);
        assert_eq!(contents(&window.snapshot()), vec!["b", "c"]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut window = ContextWindow::new(3);
        window.push(line("a"));
        let snapshot = window.snapshot();
        window.push(line("b"));

        assert_eq!(contents(&snapshot), vec!["a"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut window = ContextWindow::new(0);
        window.push(line("a"));
        assert!(window.is_empty());
    }

    #[test]
    fn test_resize_shrinks_from_front() {
        let mut window = ContextWindow::new(4);
        for c in ["a", "b", "c", "d"] {
            window.push(line(c));
        }

        window.resize(2);
        assert_eq!(contents(&window.snapshot()), vec!["c", "d"]);

        window.resize(3);
        window.push(line("e"));
        window.push(line("f"));
        assert_eq!(contents(&window.snapshot()), vec!["d", "e", "f"]);
    }
}
