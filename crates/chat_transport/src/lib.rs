//! Minimal transport-agnostic contract between the chat engine and the remote
//! assistant service.
//!
//! This crate defines only the collaborator surface the engine consumes
//! (send a message and read its reply as text chunks, list conversations,
//! load and delete history) plus the transcript data model shared by both
//! sides. It excludes wire formats, HTTP details and stream framing.

use std::sync::{atomic::AtomicBool, Arc};

use thiserror::Error;

/// Identifier for one local send operation.
pub type OperationId = u64;

/// Shared cancellation flag for an in-flight stream.
pub type CancelSignal = Arc<AtomicBool>;

/// Title shown for conversations the service has not named yet.
pub const UNTITLED_CONVERSATION: &str = "Untitled Chat";

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport initialization failed: {0}")]
    Init(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("stream read failed: {0}")]
    Read(String),
    #[error("request was cancelled")]
    Cancelled,
}

impl TransportError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    Human,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Image,
    Document,
}

impl AttachmentKind {
    /// `image/*` is an image; every other MIME type is a document.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
        {
            Self::Image
        } else {
            Self::Document
        }
    }
}

/// Attachment reference owned by a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
}

/// One human or assistant turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Service-assigned id; `None` until the service has persisted the entry.
    pub id: Option<String>,
    pub sender: Sender,
    pub text: String,
    pub attachment: Option<Attachment>,
    /// Server-assigned creation timestamp, verbatim.
    pub created_at: Option<String>,
    /// Local send operation that produced this entry. Never set by transports.
    pub operation: Option<OperationId>,
}

impl TranscriptEntry {
    #[must_use]
    pub fn human(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: None,
            sender: Sender::Human,
            text: text.into(),
            attachment,
            created_at: None,
            operation: None,
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: None,
            sender: Sender::Assistant,
            text: text.into(),
            attachment: None,
            created_at: None,
            operation: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: OperationId) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// File bytes sent with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_content_type(&self.content_type)
    }
}

/// Input required to send one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub attachment: Option<AttachmentUpload>,
}

/// Conversation list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub updated_at: Option<String>,
}

impl ConversationSummary {
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED_CONVERSATION)
    }
}

/// Pull-based reader over a reply stream.
pub trait ChunkReader: Send {
    /// Blocks until the next text chunk arrives.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    fn next_chunk(&mut self) -> Result<Option<String>, TransportError>;
}

/// Remote assistant service as seen by the engine.
pub trait ChatTransport: Send + Sync + 'static {
    /// Dispatches a message and returns a reader over the reply stream.
    ///
    /// Fails when the request itself fails (network error, non-success
    /// status). Setting `cancel` aborts an in-flight read with
    /// [`TransportError::Cancelled`].
    fn send_message(
        &self,
        request: SendRequest,
        cancel: CancelSignal,
    ) -> Result<Box<dyn ChunkReader>, TransportError>;

    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError>;

    /// Loads a stored conversation; a stale or deleted id is
    /// [`TransportError::NotFound`].
    fn load_history(&self, conversation_id: &str) -> Result<Vec<TranscriptEntry>, TransportError>;

    fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;

    struct QueueReader {
        chunks: VecDeque<String>,
    }

    impl ChunkReader for QueueReader {
        fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
            Ok(self.chunks.pop_front())
        }
    }

    struct MinimalTransport;

    impl ChatTransport for MinimalTransport {
        fn send_message(
            &self,
            request: SendRequest,
            _cancel: CancelSignal,
        ) -> Result<Box<dyn ChunkReader>, TransportError> {
            Ok(Box::new(QueueReader {
                chunks: VecDeque::from([format!("echo: {}", request.message)]),
            }))
        }

        fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
            Ok(Vec::new())
        }

        fn load_history(&self, conversation_id: &str) -> Result<Vec<TranscriptEntry>, TransportError> {
            Err(TransportError::NotFound(conversation_id.to_string()))
        }

        fn delete_conversation(&self, _conversation_id: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn reader_drains_chunks_then_reports_end() {
        let transport = MinimalTransport;
        let mut reader = transport
            .send_message(
                SendRequest {
                    message: "hi".to_string(),
                    session_id: None,
                    attachment: None,
                },
                Arc::new(AtomicBool::new(false)),
            )
            .expect("send should open a reader");

        assert_eq!(reader.next_chunk(), Ok(Some("echo: hi".to_string())));
        assert_eq!(reader.next_chunk(), Ok(None));
    }

    #[test]
    fn not_found_is_distinguishable() {
        let error = MinimalTransport
            .load_history("gone")
            .expect_err("minimal transport has no history");
        assert!(error.is_not_found());
        assert!(!TransportError::Cancelled.is_not_found());
    }

    #[test]
    fn attachment_kind_follows_content_type() {
        assert_eq!(
            AttachmentKind::from_content_type("image/png"),
            AttachmentKind::Image
        );
        assert_eq!(
            AttachmentKind::from_content_type(" IMAGE/JPEG"),
            AttachmentKind::Image
        );
        assert_eq!(
            AttachmentKind::from_content_type("application/pdf"),
            AttachmentKind::Document
        );
        assert_eq!(
            AttachmentUpload::new("notes.txt", "text/plain", Vec::new()).kind(),
            AttachmentKind::Document
        );
    }

    #[test]
    fn untitled_conversations_get_a_display_title() {
        let mut summary = ConversationSummary {
            id: "c1".to_string(),
            title: None,
            updated_at: None,
        };
        assert_eq!(summary.display_title(), UNTITLED_CONVERSATION);

        summary.title = Some("   ".to_string());
        assert_eq!(summary.display_title(), UNTITLED_CONVERSATION);

        summary.title = Some("Refund request".to_string());
        assert_eq!(summary.display_title(), "Refund request");
    }

    #[test]
    fn transcript_entry_constructors_set_sender() {
        let human = TranscriptEntry::human("hello", None);
        let assistant = TranscriptEntry::assistant("hi").with_operation(3);

        assert_eq!(human.sender, Sender::Human);
        assert_eq!(assistant.sender, Sender::Assistant);
        assert_eq!(assistant.operation, Some(3));
        assert_eq!(human.operation, None);
    }
}
