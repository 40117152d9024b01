//! Input validation and control state for the message composer.
//!
//! Every method here is a pure state transition; the renderer reads
//! [`Composer::can_send`] and [`Composer::remaining_chars`] after each event
//! so the send control always reflects the latest keystroke or selection.

use std::fmt;

use crate::core::constants::DEFAULT_MAX_INPUT_CHARS;
use crate::core::transport::TransportState;
use crate::utils::input::sanitize_text_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Editing,
    Sending,
    Disabled,
}

/// Why a submit was refused. None of these reach the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    EmptyInput,
    NoModelSelected,
    TooLong { len: usize, max: usize },
    Busy,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::EmptyInput => write!(f, "Type a message first"),
            ComposeError::NoModelSelected => write!(f, "Select a model first"),
            ComposeError::TooLong { len, max } => {
                write!(f, "Message is {len} characters; the limit is {max}")
            }
            ComposeError::Busy => write!(f, "Waiting for the current reply"),
        }
    }
}

impl std::error::Error for ComposeError {}

/// A validated submission handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Composer {
    state: ComposerState,
    input: String,
    max_chars: usize,
    models: Vec<String>,
    selected: Option<String>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl Composer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            state: ComposerState::Disabled,
            input: String::new(),
            max_chars: max_chars.max(1),
            models: Vec::new(),
            selected: None,
        }
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn remaining_chars(&self) -> usize {
        self.max_chars.saturating_sub(self.input_len())
    }

    /// Send control rule: editing, something to say, and a model to say it to.
    pub fn can_send(&self) -> bool {
        self.state == ComposerState::Editing
            && !self.input.trim().is_empty()
            && self.selected.is_some()
    }

    /// Whether the text field and selector accept edits.
    pub fn accepts_edits(&self) -> bool {
        self.state != ComposerState::Sending
    }

    /// Insert text at the end of the input, truncated at the character budget.
    /// Returns the number of characters actually inserted.
    pub fn insert_str(&mut self, text: &str) -> usize {
        if !self.accepts_edits() {
            return 0;
        }
        let sanitized = sanitize_text_input(text);
        let room = self.remaining_chars();
        let accepted: String = sanitized.chars().take(room).collect();
        let inserted = accepted.chars().count();
        self.input.push_str(&accepted);
        inserted
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buf)) == 1
    }

    pub fn backspace(&mut self) -> bool {
        if !self.accepts_edits() {
            return false;
        }
        self.input.pop().is_some()
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Replace the selectable models, keeping the selection when it survives.
    pub fn set_models(&mut self, models: Vec<String>) {
        self.models = models;
        let keep = self
            .selected
            .as_ref()
            .is_some_and(|selected| self.models.contains(selected));
        if !keep {
            self.selected = None;
        }
        self.refresh_state();
    }

    /// Select `model`, or clear the selection with `None`.
    ///
    /// Refused while a request is in flight and for names outside the catalog.
    pub fn select_model(&mut self, model: Option<&str>) -> bool {
        if self.state == ComposerState::Sending {
            return false;
        }
        match model {
            Some(name) if self.models.iter().any(|m| m == name) => {
                self.selected = Some(name.to_string());
            }
            Some(_) => return false,
            None => self.selected = None,
        }
        self.refresh_state();
        true
    }

    /// Move the selection forward (or backward) through the catalog.
    pub fn cycle_model(&mut self, forward: bool) -> bool {
        if self.models.is_empty() {
            return false;
        }
        let len = self.models.len();
        let next = match self
            .selected
            .as_ref()
            .and_then(|selected| self.models.iter().position(|m| m == selected))
        {
            Some(index) if forward => (index + 1) % len,
            Some(index) => (index + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        let name = self.models[next].clone();
        self.select_model(Some(&name))
    }

    /// Validate and take the current input. On success the composer is
    /// `Sending` and the input is cleared.
    pub fn submit(&mut self, transport: TransportState) -> Result<Submission, ComposeError> {
        if self.state == ComposerState::Sending || transport != TransportState::Idle {
            return Err(ComposeError::Busy);
        }
        let model = self
            .selected
            .clone()
            .ok_or(ComposeError::NoModelSelected)?;
        let content = self.input.trim();
        if content.is_empty() {
            return Err(ComposeError::EmptyInput);
        }
        let len = self.input_len();
        if len > self.max_chars {
            return Err(ComposeError::TooLong {
                len,
                max: self.max_chars,
            });
        }

        let submission = Submission {
            content: content.to_string(),
            model,
        };
        self.input.clear();
        self.state = ComposerState::Sending;
        Ok(submission)
    }

    /// The transport is idle again; re-enable editing.
    pub fn on_transport_idle(&mut self) {
        if self.state == ComposerState::Sending {
            self.state = ComposerState::Editing;
        }
        self.refresh_state();
    }

    fn refresh_state(&mut self) {
        self.state = match (self.state, self.selected.is_some()) {
            (ComposerState::Sending, _) => ComposerState::Sending,
            (_, true) => ComposerState::Editing,
            (_, false) => ComposerState::Disabled,
        };
    }
}
