//! Deterministic scripted implementation of the shared `chat_transport`
//! contract.
//!
//! Replies are queued up front as raw wire text and handed back chunk by
//! chunk, exactly as a network read would deliver them. This crate contains
//! no HTTP logic and is intended for engine tests and offline runs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};

use chat_transport::{
    CancelSignal, ChatTransport, ChunkReader, ConversationSummary, SendRequest, TranscriptEntry,
    TransportError,
};
use serde_json::Value;

/// Frame boundary used by [`sse_frame`].
const FRAME_END: &str = "\n\n";

/// One scripted outcome of `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Deliver these chunks, then end the stream normally.
    Chunks(Vec<String>),
    /// Deliver these chunks, then fail the next read.
    ChunksThenError(Vec<String>, TransportError),
    /// Fail the request before any stream opens.
    RequestError(TransportError),
}

impl ScriptedReply {
    /// Typical successful reply: session id, typing on, each fragment as its
    /// own frame, typing off, then `[DONE]`. The whole text is delivered as
    /// one chunk.
    #[must_use]
    pub fn assistant(session_id: &str, fragments: &[&str]) -> Self {
        Self::Chunks(vec![assistant_wire(session_id, fragments)])
    }
}

/// Encodes one `data:` frame.
#[must_use]
pub fn sse_frame(payload: &str) -> String {
    format!("data: {payload}{FRAME_END}")
}

/// Wire text for a complete assistant reply.
#[must_use]
pub fn assistant_wire(session_id: &str, fragments: &[&str]) -> String {
    let mut wire = sse_frame(&format!(r#"{{"sessionId":{}}}"#, json_string(session_id)));
    wire.push_str(&sse_frame(r#"{"type":"typing","status":true}"#));
    for fragment in fragments {
        wire.push_str(&sse_frame(&format!(r#"{{"chunk":{}}}"#, json_string(fragment))));
    }
    wire.push_str(&sse_frame(r#"{"type":"typing","status":false}"#));
    wire.push_str(&sse_frame("[DONE]"));
    wire
}

fn json_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Splits `text` into pieces of at most `chunk_chars` characters.
#[must_use]
pub fn rechunk(text: &str, chunk_chars: usize) -> Vec<String> {
    let size = chunk_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Scripted transport used by engine tests.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    conversations: Mutex<Vec<ConversationSummary>>,
    histories: Mutex<BTreeMap<String, Vec<TranscriptEntry>>>,
    list_failure: Mutex<Option<TransportError>>,
    sent: Mutex<Vec<SendRequest>>,
    history_requests: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Adds a conversation to the list and stores its history.
    #[must_use]
    pub fn with_conversation(
        self,
        summary: ConversationSummary,
        history: Vec<TranscriptEntry>,
    ) -> Self {
        lock_unpoisoned(&self.histories).insert(summary.id.clone(), history);
        lock_unpoisoned(&self.conversations).push(summary);
        self
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        lock_unpoisoned(&self.replies).push_back(reply);
    }

    /// Makes the next `list_conversations` call fail with `error`.
    pub fn fail_next_list(&self, error: TransportError) {
        *lock_unpoisoned(&self.list_failure) = Some(error);
    }

    pub fn sent_requests(&self) -> Vec<SendRequest> {
        lock_unpoisoned(&self.sent).clone()
    }

    pub fn history_requests(&self) -> Vec<String> {
        lock_unpoisoned(&self.history_requests).clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        lock_unpoisoned(&self.deleted).clone()
    }

    pub fn pending_replies(&self) -> usize {
        lock_unpoisoned(&self.replies).len()
    }

    fn default_reply(request: &SendRequest) -> ScriptedReply {
        let session_id = request.session_id.as_deref().unwrap_or("mock-session");
        ScriptedReply::assistant(session_id, &["Mock reply."])
    }
}

impl ChatTransport for ScriptedTransport {
    fn send_message(
        &self,
        request: SendRequest,
        cancel: CancelSignal,
    ) -> Result<Box<dyn ChunkReader>, TransportError> {
        let reply = lock_unpoisoned(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Self::default_reply(&request));
        lock_unpoisoned(&self.sent).push(request);

        let (chunks, failure) = match reply {
            ScriptedReply::Chunks(chunks) => (chunks, None),
            ScriptedReply::ChunksThenError(chunks, error) => (chunks, Some(error)),
            ScriptedReply::RequestError(error) => return Err(error),
        };

        Ok(Box::new(ScriptedReader {
            chunks: chunks.into(),
            failure,
            cancel,
        }))
    }

    fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        if let Some(error) = lock_unpoisoned(&self.list_failure).take() {
            return Err(error);
        }
        Ok(lock_unpoisoned(&self.conversations).clone())
    }

    fn load_history(&self, conversation_id: &str) -> Result<Vec<TranscriptEntry>, TransportError> {
        lock_unpoisoned(&self.history_requests).push(conversation_id.to_string());
        lock_unpoisoned(&self.histories)
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(conversation_id.to_string()))
    }

    fn delete_conversation(&self, conversation_id: &str) -> Result<(), TransportError> {
        if lock_unpoisoned(&self.histories)
            .remove(conversation_id)
            .is_none()
        {
            return Err(TransportError::NotFound(conversation_id.to_string()));
        }
        lock_unpoisoned(&self.conversations).retain(|summary| summary.id != conversation_id);
        lock_unpoisoned(&self.deleted).push(conversation_id.to_string());
        Ok(())
    }
}

struct ScriptedReader {
    chunks: VecDeque<String>,
    failure: Option<TransportError>,
    cancel: CancelSignal,
}

impl ChunkReader for ScriptedReader {
    fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
        if self.cancel.load(Ordering::Acquire) {
            self.chunks.clear();
            self.failure = None;
            return Err(TransportError::Cancelled);
        }

        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }

        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
