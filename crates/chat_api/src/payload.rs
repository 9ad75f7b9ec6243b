use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Multipart field names of the stream endpoint.
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_SESSION_ID: &str = "sessionId";
pub const FIELD_FILE: &str = "file";

/// One outgoing chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    /// Existing conversation to continue; omitted from the form when `None`.
    pub session_id: Option<String>,
    pub file: Option<FileUpload>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            file: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }

    /// Session id to send, ignoring blank values.
    pub fn effective_session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// File bytes uploaded alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ConversationsResponse {
    #[serde(default)]
    pub conversations: Vec<ConversationRecord>,
}

/// Conversation list row as sent by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// Stored message as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub id: Option<Value>,
    pub sender: String,
    #[serde(default)]
    pub text: Value,
    #[serde(rename = "attachmentUrl", default)]
    pub attachment_url: Option<String>,
    #[serde(rename = "attachmentType", default)]
    pub attachment_type: Option<String>,
    #[serde(alias = "createdAt", default)]
    pub timestamp: Option<String>,
}

impl HistoryMessage {
    /// Message text; non-string values are rendered as compact JSON.
    pub fn text_string(&self) -> String {
        match &self.text {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Identifier as a string, whether the service sent a string or a number.
    pub fn id_string(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn is_from_user(&self) -> bool {
        matches!(self.sender.as_str(), "user" | "human")
    }
}
