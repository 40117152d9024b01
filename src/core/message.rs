use std::fmt;

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptRole {
    User,
    Assistant,
    /// Failure marker appended when an exchange ends in a transport error.
    AppError,
}

impl TranscriptRole {
    /// Role name used on the wire, or `None` for turns that never leave the client.
    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            TranscriptRole::User => Some("user"),
            TranscriptRole::Assistant => Some("assistant"),
            TranscriptRole::AppError => None,
        }
    }
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_api_role().unwrap_or("failure"))
    }
}

/// One message unit of the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: TranscriptRole,
    pub content: String,
    pub created_at: DateTime<Local>,
}

impl Turn {
    fn with_role(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(TranscriptRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(TranscriptRole::Assistant, content)
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::with_role(TranscriptRole::AppError, reason)
    }

    pub fn is_user(&self) -> bool {
        self.role == TranscriptRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TranscriptRole::Assistant
    }

    pub fn is_failure(&self) -> bool {
        self.role == TranscriptRole::AppError
    }

    /// Short local time label shown next to the turn.
    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}
