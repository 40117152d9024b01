use crate::utils::line_editor::{prompt_line, LineEditorError, MaskMode};

/// Source of credentials typed by a person.
pub trait CredentialPrompt {
    fn username(&mut self, suggestion: Option<&str>) -> Result<String, LineEditorError>;
    fn password(&mut self, username: &str) -> Result<String, LineEditorError>;
    /// Tell the user something went wrong before asking again.
    fn notify(&mut self, message: &str);
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn username(&mut self, suggestion: Option<&str>) -> Result<String, LineEditorError> {
        let value = prompt_line("Username: ", suggestion.unwrap_or_default(), MaskMode::Visible)?;
        Ok(value.trim().to_string())
    }

    fn password(&mut self, username: &str) -> Result<String, LineEditorError> {
        prompt_line(&format!("Password for {username}: "), "", MaskMode::Hidden)
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}
