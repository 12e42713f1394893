//! Short-term conversational memory.
//!
//! The tutor remembers only the most recent question/response pairs so the
//! explanation service can follow up on what was just discussed.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of recent turns kept in a session's context window.
pub const CONTEXT_WINDOW_CAPACITY: usize = 3;

/// A single remembered exchange between the student and the tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub response: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            response: response.into(),
        }
    }
}

/// Bounded, ordered buffer of the last few exchanges.
///
/// Appending past capacity evicts the oldest pair, so the window never holds
/// more than [`CONTEXT_WINDOW_CAPACITY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pairs: VecDeque<QaPair>,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair at the end, dropping from the front once over capacity.
    pub fn append(&mut self, pair: QaPair) {
        self.pairs.push_back(pair);
        while self.pairs.len() > CONTEXT_WINDOW_CAPACITY {
            self.pairs.pop_front();
        }
    }

    /// Oldest-first view of the remembered pairs.
    pub fn snapshot(&self) -> Vec<QaPair> {
        self.pairs.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the window for embedding in a prompt, `None` when empty.
    pub fn render(&self) -> String {
        if self.pairs.is_empty() {
            return "None".to_string();
        }
        self.pairs
            .iter()
            .map(|pair| format!("Q: {}\nA: {}", pair.question, pair.response))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: usize) -> QaPair {
        QaPair::new(format!("question {n}"), format!("answer {n}"))
    }

    #[test]
    fn test_new_window_is_empty() {
        let window = ContextWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert!(window.snapshot().is_empty());
    }

    #[test]
    fn test_append_keeps_order_under_capacity() {
        let mut window = ContextWindow::new();
        window.append(pair(1));
        window.append(pair(2));

        assert_eq!(window.snapshot(), vec![pair(1), pair(2)]);
    }

    #[test]
    fn test_append_evicts_oldest_first() {
        for total in 4..=10 {
            let mut window = ContextWindow::new();
            for n in 1..=total {
                window.append(pair(n));
                assert!(window.len() <= CONTEXT_WINDOW_CAPACITY);
            }
            let expected: Vec<QaPair> = (total - 2..=total).map(pair).collect();
            assert_eq!(window.snapshot(), expected);
        }
    }

    #[test]
    fn test_snapshot_is_detached_from_window() {
        let mut window = ContextWindow::new();
        window.append(pair(1));

        let mut snapshot = window.snapshot();
        snapshot.clear();

        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_render_marks_empty_window() {
        assert_eq!(ContextWindow::new().render(), "None");
    }

    #[test]
    fn test_render_lists_pairs_oldest_first() {
        let mut window = ContextWindow::new();
        window.append(QaPair::new("What is 2+2?", "Four."));
        window.append(QaPair::new("And 3+3?", "Six."));

        assert_eq!(
            window.render(),
            "Q: What is 2+2?\nA: Four.\n\nQ: And 3+3?\nA: Six."
        );
    }
}
