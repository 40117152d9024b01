//! Raw-mode single-line prompt used for credentials.

use std::fmt;
use std::io::{self, Write};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use unicode_width::UnicodeWidthStr;

use crate::utils::input::sanitize_single_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    Visible,
    /// Every character is shown as `*`.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEditorError {
    Cancelled,
    Terminal(String),
}

impl fmt::Display for LineEditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEditorError::Cancelled => write!(f, "Cancelled by user"),
            LineEditorError::Terminal(detail) => write!(f, "Terminal error: {detail}"),
        }
    }
}

impl std::error::Error for LineEditorError {}

impl From<io::Error> for LineEditorError {
    fn from(err: io::Error) -> Self {
        LineEditorError::Terminal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Continue,
    Submit(String),
    Cancel,
}

/// Text and cursor (in characters) of the line being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptLine {
    text: String,
    cursor: usize,
}

impl PromptLine {
    pub fn new(initial: &str) -> Self {
        let text = sanitize_single_line(initial);
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_at(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    pub fn insert(&mut self, text: &str) {
        let at = self.byte_at(self.cursor);
        self.text.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_at(self.cursor - 1);
        let end = self.byte_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: &KeyEvent) -> EditOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return EditOutcome::Submit(self.text.clone()),
            KeyCode::Esc => return EditOutcome::Cancel,
            KeyCode::Char('c') if ctrl => return EditOutcome::Cancel,
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.text.chars().count(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.chars().count(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.text.chars().count());
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(ch) if !ctrl => {
                let mut buf = [0u8; 4];
                self.insert(ch.encode_utf8(&mut buf));
            }
            _ => {}
        }
        EditOutcome::Continue
    }

    /// Pasted text is inserted up to its first newline, which submits.
    pub fn handle_paste(&mut self, pasted: &str) -> EditOutcome {
        let normalized = pasted.replace("\r\n", "\n").replace('\r', "\n");
        let (line, submits) = match normalized.split_once('\n') {
            Some((line, _)) => (line, true),
            None => (normalized.as_str(), false),
        };
        self.insert(&sanitize_single_line(line));
        if submits {
            EditOutcome::Submit(self.text.clone())
        } else {
            EditOutcome::Continue
        }
    }

    pub fn display(&self, mask: MaskMode) -> String {
        match mask {
            MaskMode::Visible => self.text.clone(),
            MaskMode::Hidden => "*".repeat(self.text.chars().count()),
        }
    }

    fn cursor_column(&self, mask: MaskMode) -> usize {
        let shown: String = self.display(mask).chars().take(self.cursor).collect();
        UnicodeWidthStr::width(shown.as_str())
    }
}

/// Read one line from the terminal in raw mode.
pub fn prompt_line(label: &str, initial: &str, mask: MaskMode) -> Result<String, LineEditorError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, event::EnableBracketedPaste) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }

    let mut line = PromptLine::new(initial);
    let result = read_until_done(label, &mut line, mask);

    let restore = disable_raw_mode().and_then(|_| execute!(stdout, event::DisableBracketedPaste));
    println!();
    let value = result?;
    restore?;
    Ok(value)
}

fn read_until_done(
    label: &str,
    line: &mut PromptLine,
    mask: MaskMode,
) -> Result<String, LineEditorError> {
    loop {
        redraw(label, line, mask)?;
        let outcome = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => line.handle_key(&key),
            Event::Paste(text) => line.handle_paste(&text),
            _ => EditOutcome::Continue,
        };
        match outcome {
            EditOutcome::Continue => {}
            EditOutcome::Submit(value) => return Ok(value),
            EditOutcome::Cancel => return Err(LineEditorError::Cancelled),
        }
    }
}

fn redraw(label: &str, line: &PromptLine, mask: MaskMode) -> io::Result<()> {
    let column = UnicodeWidthStr::width(label) + line.cursor_column(mask);
    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[K{label}{}", line.display(mask))?;
    if column > 0 {
        write!(stdout, "\r\x1b[{column}C")?;
    } else {
        write!(stdout, "\r")?;
    }
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn typing_and_cursor_movement() {
        let mut line = PromptLine::new("");
        line.handle_key(&key(KeyCode::Char('a')));
        line.handle_key(&key(KeyCode::Left));
        line.handle_key(&key(KeyCode::Char('é')));
        assert_eq!(line.text(), "éa");
        assert_eq!(line.cursor(), 1);
        line.handle_key(&key(KeyCode::Backspace));
        assert_eq!(line.text(), "a");
        assert_eq!(
            line.handle_key(&key(KeyCode::Enter)),
            EditOutcome::Submit("a".into())
        );
    }

    #[test]
    fn control_keys_edit_and_cancel() {
        let mut line = PromptLine::new("alice");
        line.handle_key(&ctrl('a'));
        assert_eq!(line.cursor(), 0);
        line.handle_key(&ctrl('e'));
        assert_eq!(line.cursor(), 5);
        line.handle_key(&ctrl('u'));
        assert_eq!(line.text(), "");
        assert_eq!(line.handle_key(&ctrl('c')), EditOutcome::Cancel);
        assert_eq!(line.handle_key(&key(KeyCode::Esc)), EditOutcome::Cancel);
    }

    #[test]
    fn paste_stops_at_newline() {
        let mut line = PromptLine::new("");
        assert_eq!(line.handle_paste("sec"), EditOutcome::Continue);
        assert_eq!(
            line.handle_paste("ret\r\nignored"),
            EditOutcome::Submit("secret".into())
        );
    }

    #[test]
    fn hidden_mask_shows_stars() {
        let line = PromptLine::new("pässword");
        assert_eq!(line.display(MaskMode::Hidden), "********");
        assert_eq!(line.display(MaskMode::Visible), "pässword");
        assert_eq!(line.cursor_column(MaskMode::Hidden), 8);
    }
}
