//! Ordered log of conversation turns.
//!
//! Insertion order is display order is conversation order. Every turn is
//! immutable once committed except the single open assistant turn, which
//! accepts appends until it is closed.

use crate::api::ChatMessage;
use crate::core::message::Turn;

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The assistant turn currently receiving fragments, if any.
    pub fn open_turn(&self) -> Option<&Turn> {
        self.open.and_then(|index| self.turns.get(index))
    }

    pub fn has_open_turn(&self) -> bool {
        self.open.is_some()
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.open == Some(index)
    }

    /// Commit a closed user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.close_open_turn();
        self.turns.push(Turn::user(content));
    }

    /// Commit a closed failure marker.
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.close_open_turn();
        self.turns.push(Turn::failure(reason));
    }

    /// Start a new open assistant turn holding `content`.
    ///
    /// Any previously open turn is closed first so there is never more than
    /// one.
    pub fn open_assistant(&mut self, content: impl Into<String>) {
        self.close_open_turn();
        self.turns.push(Turn::assistant(content));
        self.open = Some(self.turns.len() - 1);
    }

    /// Append to the open turn. Returns false when nothing is open.
    pub fn append_to_open(&mut self, fragment: &str) -> bool {
        match self.open.and_then(|index| self.turns.get_mut(index)) {
            Some(turn) => {
                turn.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Freeze the open turn. Returns false when nothing was open.
    pub fn close_open_turn(&mut self) -> bool {
        self.open.take().is_some()
    }

    /// Closed user and assistant turns in order, shaped for the backend.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_open(*index))
            .filter_map(|(_, turn)| {
                turn.role
                    .to_api_role()
                    .map(|role| ChatMessage::new(role, turn.content.clone()))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::TranscriptRole;

    #[test]
    fn opening_a_turn_closes_the_previous_one() {
        let mut transcript = Transcript::new();
        transcript.open_assistant("first");
        transcript.open_assistant("second");

        assert_eq!(transcript.len(), 2);
        assert!(!transcript.is_open(0));
        assert!(transcript.is_open(1));
        assert_eq!(transcript.open_turn().map(|t| t.content.as_str()), Some("second"));
    }

    #[test]
    fn append_without_open_turn_is_refused() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        assert!(!transcript.append_to_open("ignored"));
        assert_eq!(transcript.turns()[0].content, "hi");
    }

    #[test]
    fn committing_user_turn_freezes_open_turn() {
        let mut transcript = Transcript::new();
        transcript.open_assistant("partial");
        transcript.push_user("next");

        assert!(!transcript.has_open_turn());
        assert!(!transcript.append_to_open("more"));
        assert_eq!(transcript.turns()[0].content, "partial");
    }

    #[test]
    fn history_skips_failures_and_open_turn() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        transcript.open_assistant("hi");
        transcript.close_open_turn();
        transcript.push_failure("network down");
        transcript.push_user("again");
        transcript.open_assistant("stream");

        let history = transcript.history();
        let roles: Vec<&str> = history.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(history[2].content, "again");
    }

    #[test]
    fn clear_discards_everything() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        transcript.open_assistant("hi");
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(!transcript.has_open_turn());
    }

    #[test]
    fn failure_marker_role_is_distinct() {
        let mut transcript = Transcript::new();
        transcript.push_failure("boom");
        assert_eq!(transcript.last().map(|t| t.role), Some(TranscriptRole::AppError));
    }
}
