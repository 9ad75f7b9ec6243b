use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::events::ProtocolEvent;
use crate::headers::{build_headers, ACCEPT_EVENT_STREAM, ACCEPT_JSON};
use crate::payload::{
    ChatRequest, ConversationRecord, ConversationsResponse, HistoryMessage, HistoryResponse,
    FIELD_FILE, FIELD_MESSAGE, FIELD_SESSION_ID,
};
use crate::sse::{EventStreamParser, Utf8ChunkDecoder};
use crate::url::ChatEndpoints;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

/// Raw response body chunks, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, ChatApiError>>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
    endpoints: ChatEndpoints,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let endpoints = ChatEndpoints::new(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            config,
            endpoints,
        })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ChatEndpoints {
        &self.endpoints
    }

    pub fn header_map(&self, accept: &str) -> Result<HeaderMap, ChatApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config, accept) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_stream_request(&self, request: &ChatRequest) -> Result<RequestBuilder, ChatApiError> {
        Ok(self
            .http
            .post(self.endpoints.stream())
            .headers(self.header_map(ACCEPT_EVENT_STREAM)?)
            .multipart(multipart_form(request)?))
    }

    pub fn build_conversations_request(&self) -> Result<RequestBuilder, ChatApiError> {
        Ok(self
            .http
            .get(self.endpoints.conversations())
            .headers(self.header_map(ACCEPT_JSON)?))
    }

    pub fn build_history_request(&self, conversation_id: &str) -> Result<RequestBuilder, ChatApiError> {
        Ok(self
            .http
            .get(self.endpoints.history(conversation_id))
            .headers(self.header_map(ACCEPT_JSON)?))
    }

    pub fn build_delete_request(&self, conversation_id: &str) -> Result<RequestBuilder, ChatApiError> {
        Ok(self
            .http
            .delete(self.endpoints.conversation(conversation_id))
            .headers(self.header_map(ACCEPT_JSON)?))
    }

    /// Dispatch a chat turn and hand back the raw response body stream.
    ///
    /// Resolves once response headers arrive with a success status.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChunkStream, ChatApiError> {
        debug!(
            has_session = request.effective_session_id().is_some(),
            has_file = request.file.is_some(),
            "opening chat stream"
        );
        let response = await_or_cancel(self.build_stream_request(request)?.send(), cancellation)
            .await??;
        let response = ensure_success(response, cancellation).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ChatApiError::from))
            .boxed())
    }

    /// Stream a chat turn and deliver decoded events until `[DONE]` or end of body.
    pub async fn stream_events<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<(), ChatApiError>
    where
        F: FnMut(ProtocolEvent),
    {
        let mut chunks = self.open_stream(request, cancellation).await?;
        let mut decoder = Utf8ChunkDecoder::default();
        let mut parser = EventStreamParser::default();

        loop {
            let Some(chunk) = await_or_cancel(chunks.next(), cancellation).await? else {
                break;
            };
            let text = decoder.decode(&chunk?);
            for event in parser.feed(&text) {
                let terminal = event.is_terminal();
                on_event(event);
                if terminal {
                    parser.finish();
                    return Ok(());
                }
            }
        }

        parser.finish();
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }
        Ok(())
    }

    pub async fn list_conversations(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<ConversationRecord>, ChatApiError> {
        let response =
            await_or_cancel(self.build_conversations_request()?.send(), cancellation).await??;
        let response = ensure_success(response, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation).await??;
        let parsed = serde_json::from_str::<ConversationsResponse>(&body)?;
        Ok(parsed.conversations)
    }

    pub async fn load_history(
        &self,
        conversation_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<HistoryMessage>, ChatApiError> {
        let response = await_or_cancel(
            self.build_history_request(conversation_id)?.send(),
            cancellation,
        )
        .await??;
        let response = ensure_success(response, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation).await??;
        let parsed = serde_json::from_str::<HistoryResponse>(&body)?;
        Ok(parsed.messages)
    }

    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(), ChatApiError> {
        let response = await_or_cancel(
            self.build_delete_request(conversation_id)?.send(),
            cancellation,
        )
        .await??;
        ensure_success(response, cancellation).await?;
        Ok(())
    }
}

fn multipart_form(request: &ChatRequest) -> Result<Form, ChatApiError> {
    let mut form = Form::new().text(FIELD_MESSAGE, request.message.clone());

    if let Some(session_id) = request.effective_session_id() {
        form = form.text(FIELD_SESSION_ID, session_id.to_owned());
    }

    if let Some(file) = &request.file {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|error| {
                ChatApiError::InvalidHeader(format!(
                    "invalid content type {:?}: {error}",
                    file.content_type
                ))
            })?;
        form = form.part(FIELD_FILE, part);
    }

    Ok(form)
}

async fn ensure_success(
    response: Response,
    cancellation: Option<&CancellationSignal>,
) -> Result<Response, ChatApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = await_or_cancel(response.text(), cancellation)
        .await?
        .unwrap_or_default();
    let message = parse_error_message(status, &body);

    if status == StatusCode::NOT_FOUND {
        return Err(ChatApiError::NotFound(message));
    }
    Err(ChatApiError::Status(status, message))
}

pub fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Await `future`, polling `cancellation` between short timeouts.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::multipart_form;
    use crate::payload::{ChatRequest, FileUpload};

    #[test]
    fn multipart_form_rejects_invalid_content_type() {
        let request = ChatRequest::new("look").with_file(FileUpload {
            file_name: "x.bin".to_string(),
            content_type: "not a mime".to_string(),
            bytes: vec![1, 2, 3],
        });

        assert!(multipart_form(&request).is_err());
    }

    #[test]
    fn multipart_form_boundary_is_set_for_plain_messages() {
        let form = multipart_form(&ChatRequest::new("hello")).expect("text-only form");
        assert!(!form.boundary().is_empty());
    }
}
