//! Wire payloads exchanged with the chat server.

use serde::{Deserialize, Serialize};

pub mod client;
pub mod errors;
pub mod models;

pub use client::BackendClient;
pub use errors::ApiError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Body of a successful one-shot reply.
///
/// The server relays the model runner's `{"message": {"content": ...}}`
/// object; a flat `{"content": ...}` is accepted as well.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ChatReply {
    Wrapped { message: ChatReplyMessage },
    Flat { content: String },
}

#[derive(Deserialize, Debug)]
pub struct ChatReplyMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatReply {
    pub fn into_content(self) -> String {
        match self {
            ChatReply::Wrapped { message } => message.content,
            ChatReply::Flat { content } => content,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: String,
}

impl ModelInfo {
    /// Label shown in selectors, e.g. `llama3 (4.7 GB)`.
    pub fn label(&self) -> String {
        if self.size.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.size)
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthStatus {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_admin: bool,
    pub error: Option<String>,
}

/// Event the client emits on the persistent channel to start an exchange.
pub const CHAT_MESSAGE_EVENT: &str = "chat_message";

/// Events read from the persistent channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    ChatResponse { content: String },
    ChatDone,
    ChatError { error: String },
}

#[derive(Deserialize)]
struct ContentPayload {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: String,
}

impl ServerEvent {
    /// Decode an event by name. Names this client does not handle yield
    /// `Ok(None)`.
    pub fn from_parts(
        name: &str,
        data: Option<serde_json::Value>,
    ) -> Result<Option<Self>, serde_json::Error> {
        let data = data.unwrap_or(serde_json::Value::Null);
        let event = match name {
            "chat_response" => ServerEvent::ChatResponse {
                content: serde_json::from_value::<ContentPayload>(data)?.content,
            },
            "chat_done" => ServerEvent::ChatDone,
            "chat_error" => ServerEvent::ChatError {
                error: serde_json::from_value::<ErrorPayload>(data)?.error,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
