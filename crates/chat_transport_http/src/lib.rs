//! HTTP implementation of the shared `chat_transport` contract.
//!
//! This adapter drives `chat_api` requests on a private current-thread tokio
//! runtime so the synchronous engine can pull reply text chunk by chunk.
//! Response bytes are decoded as UTF-8 with a carry for code points split
//! across network reads; framing and event decoding stay with the caller.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chat_api::client::await_or_cancel;
use chat_api::{
    ChatApiClient, ChatApiConfig, ChatApiError, ChatEndpoints, ChatRequest, ChunkStream,
    ConversationRecord, FileUpload, HistoryMessage, Utf8ChunkDecoder,
};
use chat_transport::{
    Attachment, AttachmentKind, CancelSignal, ChatTransport, ChunkReader, ConversationSummary,
    SendRequest, TranscriptEntry, TransportError,
};
use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Runtime configuration for the HTTP transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpTransportConfig {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpTransportConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::default();

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

/// Blocking view over the chat service, one call per endpoint.
trait ServiceClient: Send + Sync {
    fn open_stream(
        &self,
        runtime: &Runtime,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<ChunkStream, ChatApiError>;

    fn list_conversations(&self, runtime: &Runtime) -> Result<Vec<ConversationRecord>, ChatApiError>;

    fn load_history(
        &self,
        runtime: &Runtime,
        conversation_id: &str,
    ) -> Result<Vec<HistoryMessage>, ChatApiError>;

    fn delete_conversation(&self, runtime: &Runtime, conversation_id: &str)
        -> Result<(), ChatApiError>;
}

#[derive(Debug)]
struct DefaultServiceClient {
    client: ChatApiClient,
}

impl ServiceClient for DefaultServiceClient {
    fn open_stream(
        &self,
        runtime: &Runtime,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<ChunkStream, ChatApiError> {
        runtime.block_on(self.client.open_stream(request, Some(cancel)))
    }

    fn list_conversations(&self, runtime: &Runtime) -> Result<Vec<ConversationRecord>, ChatApiError> {
        runtime.block_on(self.client.list_conversations(None))
    }

    fn load_history(
        &self,
        runtime: &Runtime,
        conversation_id: &str,
    ) -> Result<Vec<HistoryMessage>, ChatApiError> {
        runtime.block_on(self.client.load_history(conversation_id, None))
    }

    fn delete_conversation(
        &self,
        runtime: &Runtime,
        conversation_id: &str,
    ) -> Result<(), ChatApiError> {
        runtime.block_on(self.client.delete_conversation(conversation_id, None))
    }
}

/// `ChatTransport` adapter backed by `chat_api` HTTP primitives.
pub struct HttpTransport {
    runtime: Arc<Runtime>,
    endpoints: ChatEndpoints,
    service: Arc<dyn ServiceClient>,
}

impl HttpTransport {
    /// Creates a transport talking to the configured chat service.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = ChatApiClient::new(config.into_chat_api_config()).map_err(map_init_error)?;
        let endpoints = client.endpoints().clone();
        debug!(base_url = %endpoints.base(), "http transport initialized");

        Ok(Self {
            runtime: Arc::new(build_runtime()?),
            endpoints,
            service: Arc::new(DefaultServiceClient { client }),
        })
    }

    pub fn endpoints(&self) -> &ChatEndpoints {
        &self.endpoints
    }

    fn history_entry(&self, message: HistoryMessage) -> TranscriptEntry {
        let text = message.text_string();
        let mut entry = if message.is_from_user() {
            TranscriptEntry::human(text, None)
        } else {
            TranscriptEntry::assistant(text)
        };

        entry.attachment = message
            .attachment_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| Attachment {
                url: self.endpoints.resolve_asset(url),
                kind: attachment_kind(message.attachment_type.as_deref()),
            });
        entry.id = message.id_string();
        entry.created_at = message.timestamp;
        entry
    }

    #[cfg(test)]
    fn with_service_client_for_tests(
        base_url: &str,
        service: Arc<dyn ServiceClient>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            runtime: Arc::new(build_runtime()?),
            endpoints: ChatEndpoints::new(base_url).map_err(map_init_error)?,
            service,
        })
    }
}

impl ChatTransport for HttpTransport {
    fn send_message(
        &self,
        request: SendRequest,
        cancel: CancelSignal,
    ) -> Result<Box<dyn ChunkReader>, TransportError> {
        if cancel.load(Ordering::Acquire) {
            return Err(TransportError::Cancelled);
        }

        let request = chat_request(request);
        let chunks = self
            .service
            .open_stream(&self.runtime, &request, &cancel)
            .map_err(map_request_error)?;

        Ok(Box::new(HttpChunkReader {
            runtime: Arc::clone(&self.runtime),
            chunks,
            decoder: Utf8ChunkDecoder::default(),
            cancel,
            done: false,
        }))
    }

    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        let records = self
            .service
            .list_conversations(&self.runtime)
            .map_err(map_request_error)?;

        Ok(records
            .into_iter()
            .map(|record| ConversationSummary {
                id: record.id,
                title: record.title,
                updated_at: record.updated_at,
            })
            .collect())
    }

    fn load_history(&self, conversation_id: &str) -> Result<Vec<TranscriptEntry>, TransportError> {
        match self.service.load_history(&self.runtime, conversation_id) {
            Ok(messages) => Ok(messages
                .into_iter()
                .map(|message| self.history_entry(message))
                .collect()),
            Err(ChatApiError::NotFound(message)) => {
                debug!(conversation_id, %message, "conversation history not found");
                Err(TransportError::NotFound(conversation_id.to_string()))
            }
            Err(error) => Err(map_request_error(error)),
        }
    }

    fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        self.service
            .delete_conversation(&self.runtime, conversation_id)
            .map_err(|error| match error {
                ChatApiError::NotFound(_) => TransportError::NotFound(conversation_id.to_string()),
                other => map_request_error(other),
            })
    }
}

struct HttpChunkReader {
    runtime: Arc<Runtime>,
    chunks: ChunkStream,
    decoder: Utf8ChunkDecoder,
    cancel: CancelSignal,
    done: bool,
}

impl ChunkReader for HttpChunkReader {
    fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
        if self.done {
            return Ok(None);
        }

        loop {
            let next = self
                .runtime
                .block_on(await_or_cancel(self.chunks.next(), Some(&self.cancel)));

            match next {
                Err(ChatApiError::Cancelled) => {
                    self.done = true;
                    return Err(TransportError::Cancelled);
                }
                Err(error) => {
                    self.done = true;
                    return Err(TransportError::Read(error.to_string()));
                }
                Ok(None) => {
                    self.done = true;
                    let tail = self.decoder.finish();
                    return Ok((!tail.is_empty()).then_some(tail));
                }
                Ok(Some(Err(error))) => {
                    self.done = true;
                    warn!(%error, "chat stream read failed");
                    return Err(TransportError::Read(error.to_string()));
                }
                Ok(Some(Ok(bytes))) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                }
            }
        }
    }
}

fn chat_request(request: SendRequest) -> ChatRequest {
    ChatRequest {
        message: request.message,
        session_id: request.session_id,
        file: request.attachment.map(|upload| FileUpload {
            file_name: upload.file_name,
            content_type: upload.content_type,
            bytes: upload.bytes,
        }),
    }
}

/// `"image"` or an `image/*` MIME type is an image; anything else a document.
fn attachment_kind(attachment_type: Option<&str>) -> AttachmentKind {
    match attachment_type.map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("image") => AttachmentKind::Image,
        Some(kind) => AttachmentKind::from_content_type(kind),
        None => AttachmentKind::Document,
    }
}

fn build_runtime() -> Result<Runtime, TransportError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| TransportError::Init(format!("failed to initialize tokio runtime: {error}")))
}

fn map_init_error(error: ChatApiError) -> TransportError {
    TransportError::Init(format!("failed to initialize http transport: {error}"))
}

fn map_request_error(error: ChatApiError) -> TransportError {
    match error {
        ChatApiError::Cancelled => TransportError::Cancelled,
        ChatApiError::NotFound(message) => TransportError::NotFound(message),
        ChatApiError::Status(status, message) => TransportError::Status {
            status: status.as_u16(),
            message,
        },
        other => TransportError::Request(other.to_string()),
    }
}
