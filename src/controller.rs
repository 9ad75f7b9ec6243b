//! Stream session controller.
//!
//! Drives one send operation at a time through `Idle -> Sending -> Streaming
//! -> Idle`. A failed request or read appends the fixed fallback entry on the
//! way back to `Idle`. [`ChatController::send`] runs the whole lifecycle
//! against the transport; the step methods (`begin_send`,
//! `on_stream_opened`, `on_chunk`, `on_stream_finished`, `on_stream_failed`)
//! expose the same state machine to callers that own the read loop. Every
//! step is keyed by operation id, and steps for an operation that is no
//! longer active are ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chat_api::EventStreamParser;
use chat_transport::{
    Attachment, AttachmentUpload, CancelSignal, ChatTransport, ConversationSummary, OperationId,
    SendRequest, TranscriptEntry, TransportError,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::reconciler::{Reaction, Reconciliation};
use crate::transcript::{StreamSession, Transcript};

/// Assistant entry appended when a send operation fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message is empty and no attachment is staged")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending { operation: OperationId },
    Streaming { operation: OperationId },
}

/// Result of feeding one chunk to the active operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProgress {
    /// Keep reading.
    Continue,
    /// The terminal sentinel arrived; the operation is back to `Idle`.
    Finished,
    /// The operation is not active; stop reading.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Loaded { entries: usize },
    /// The conversation no longer exists; local session state was reset.
    NotFound,
}

/// Handle for a send operation that has been started but not dispatched.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub operation: OperationId,
    pub request: SendRequest,
    pub cancel: CancelSignal,
}

/// Receives state changes as they happen. Every hook defaults to a no-op.
pub trait ChatObserver {
    fn entry_appended(&mut self, _entry: &TranscriptEntry) {}
    fn entry_updated(&mut self, _entry: &TranscriptEntry) {}
    fn typing_changed(&mut self, _typing: bool) {}
    fn session_assigned(&mut self, _session_id: &str) {}
    /// The active operation left the stream; no more text will arrive for it.
    fn stream_closed(&mut self, _operation: OperationId) {}
    fn transcript_reset(&mut self, _transcript: &Transcript) {}
    fn conversations_refreshed(&mut self, _conversations: &[ConversationSummary]) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl ChatObserver for NoopObserver {}

struct ActiveOperation {
    reconciliation: Reconciliation,
    parser: EventStreamParser,
    cancel: CancelSignal,
}

pub struct ChatController {
    transport: Arc<dyn ChatTransport>,
    observer: Box<dyn ChatObserver>,
    transcript: Transcript,
    session: StreamSession,
    conversations: Vec<ConversationSummary>,
    phase: Phase,
    active: Option<ActiveOperation>,
    next_operation: OperationId,
    last_error: Option<String>,
}

impl ChatController {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            observer: Box::new(NoopObserver),
            transcript: Transcript::new(),
            session: StreamSession::new(),
            conversations: Vec::new(),
            phase: Phase::Idle,
            active: None,
            next_operation: 1,
            last_error: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ChatObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn active_operation(&self) -> Option<OperationId> {
        self.active
            .as_ref()
            .map(|active| active.reconciliation.operation())
    }

    /// Description of the most recent failed operation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sends `text` and drains the reply stream to completion.
    pub fn send(
        &mut self,
        text: &str,
        attachment: Option<AttachmentUpload>,
    ) -> Result<OperationId, SendError> {
        let PendingSend {
            operation,
            request,
            cancel,
        } = self.begin_send(text, attachment)?;

        let mut reader = match self.transport.send_message(request, cancel) {
            Ok(reader) => reader,
            Err(error) => {
                self.on_stream_failed(operation, &error);
                return Ok(operation);
            }
        };
        self.on_stream_opened(operation);

        loop {
            match reader.next_chunk() {
                Ok(Some(chunk)) => {
                    if self.on_chunk(operation, &chunk) != StreamProgress::Continue {
                        break;
                    }
                }
                Ok(None) => {
                    self.on_stream_finished(operation);
                    break;
                }
                Err(error) => {
                    self.on_stream_failed(operation, &error);
                    break;
                }
            }
        }

        Ok(operation)
    }

    /// Starts a send operation: appends the human entry and builds the request.
    ///
    /// A blank message without an attachment is rejected and changes nothing.
    /// Any operation still active is superseded.
    pub fn begin_send(
        &mut self,
        text: &str,
        attachment: Option<AttachmentUpload>,
    ) -> Result<PendingSend, SendError> {
        if text.trim().is_empty() && attachment.is_none() {
            return Err(SendError::EmptyMessage);
        }

        self.supersede_active("new send");

        let operation = self.next_operation;
        self.next_operation += 1;

        let preview = attachment.as_ref().map(|upload| Attachment {
            url: upload.file_name.clone(),
            kind: upload.kind(),
        });
        let entry = self
            .transcript
            .push(TranscriptEntry::human(text, preview))
            .clone();
        self.observer.entry_appended(&entry);

        self.set_typing(false);
        self.last_error = None;

        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        self.active = Some(ActiveOperation {
            reconciliation: Reconciliation::new(operation),
            parser: EventStreamParser::default(),
            cancel: Arc::clone(&cancel),
        });
        self.phase = Phase::Sending { operation };
        debug!(operation, has_attachment = attachment.is_some(), "send started");

        Ok(PendingSend {
            operation,
            request: SendRequest {
                message: text.to_string(),
                session_id: self.session.session_id().map(str::to_string),
                attachment,
            },
            cancel,
        })
    }

    pub fn on_stream_opened(&mut self, operation: OperationId) {
        if !self.is_active(operation, "stream opened") {
            return;
        }
        self.phase = Phase::Streaming { operation };
        debug!(operation, "stream opened");
    }

    /// Feeds one text chunk through framing, decoding and reconciliation.
    pub fn on_chunk(&mut self, operation: OperationId, chunk: &str) -> StreamProgress {
        if !self.is_active(operation, "chunk") {
            return StreamProgress::Ignored;
        }
        let Some(active) = self.active.as_mut() else {
            return StreamProgress::Ignored;
        };

        let mut reactions = Vec::new();
        for event in active.parser.feed(chunk) {
            let reaction =
                active
                    .reconciliation
                    .apply(event, &mut self.transcript, &mut self.session);
            let ended = reaction == Reaction::StreamEnded;
            reactions.push(reaction);
            if ended {
                break;
            }
        }

        let mut ended = false;
        for reaction in reactions {
            match reaction {
                Reaction::None => {}
                Reaction::SessionAssigned(session_id) => {
                    self.observer.session_assigned(&session_id);
                    self.refresh_conversations();
                }
                Reaction::TypingChanged(typing) => self.observer.typing_changed(typing),
                Reaction::EntryStarted => {
                    if let Some(entry) = self.transcript.last() {
                        self.observer.entry_appended(entry);
                    }
                }
                Reaction::EntryExtended => {
                    if let Some(entry) = self.transcript.last() {
                        self.observer.entry_updated(entry);
                    }
                }
                Reaction::StreamEnded => ended = true,
            }
        }

        if ended {
            self.finish_active(operation);
            return StreamProgress::Finished;
        }
        StreamProgress::Continue
    }

    /// The transport reported end of body.
    pub fn on_stream_finished(&mut self, operation: OperationId) {
        if !self.is_active(operation, "stream finished") {
            return;
        }
        self.finish_active(operation);
    }

    /// The request or a read failed. Partial output stays in place and the
    /// fallback entry is appended after it.
    pub fn on_stream_failed(&mut self, operation: OperationId, error: &TransportError) {
        if !self.is_active(operation, "stream failed") {
            return;
        }

        warn!(operation, %error, "chat stream failed");
        self.active = None;
        self.phase = Phase::Idle;
        self.set_typing(false);
        self.observer.stream_closed(operation);
        self.last_error = Some(error.to_string());

        let entry = self
            .transcript
            .push(TranscriptEntry::assistant(FALLBACK_REPLY))
            .clone();
        self.observer.entry_appended(&entry);
    }

    /// Clears the transcript and session so the next send opens a new
    /// conversation.
    pub fn start_new_session(&mut self) {
        self.supersede_active("new session");
        self.transcript.clear();
        self.session.clear();
        self.last_error = None;
        debug!("started new session");
        self.observer.transcript_reset(&self.transcript);
    }

    /// Replaces the transcript with the stored history of `conversation_id`.
    ///
    /// A missing conversation clears the local session and transcript and is
    /// reported as [`SwitchOutcome::NotFound`]. Other failures leave state
    /// unchanged.
    pub fn switch_to_session(
        &mut self,
        conversation_id: &str,
    ) -> Result<SwitchOutcome, TransportError> {
        self.supersede_active("session switch");

        match self.transport.load_history(conversation_id) {
            Ok(entries) => {
                let count = entries.len();
                self.transcript.replace(entries);
                self.session.resume(conversation_id);
                self.last_error = None;
                debug!(conversation_id, entries = count, "switched session");
                self.observer.transcript_reset(&self.transcript);
                Ok(SwitchOutcome::Loaded { entries: count })
            }
            Err(TransportError::NotFound(_)) => {
                debug!(conversation_id, "conversation not found, clearing session");
                self.transcript.clear();
                self.session.clear();
                self.observer.transcript_reset(&self.transcript);
                Ok(SwitchOutcome::NotFound)
            }
            Err(error) => {
                warn!(conversation_id, %error, "failed to load history");
                Err(error)
            }
        }
    }

    /// Reloads the conversation list, keeping the previous one on failure.
    pub fn refresh_conversations(&mut self) -> &[ConversationSummary] {
        match self.transport.list_conversations() {
            Ok(conversations) => {
                self.conversations = conversations;
                self.observer.conversations_refreshed(&self.conversations);
            }
            Err(error) => warn!(%error, "failed to refresh conversations"),
        }
        &self.conversations
    }

    pub fn delete_conversation(&mut self, conversation_id: &str) -> Result<(), TransportError> {
        self.transport.delete_conversation(conversation_id)?;
        debug!(conversation_id, "conversation deleted");
        self.refresh_conversations();

        if self.session.session_id() == Some(conversation_id) {
            self.start_new_session();
        }
        Ok(())
    }

    /// Re-sends the most recent human text without its attachment.
    pub fn retry_last(&mut self) -> Option<Result<OperationId, SendError>> {
        let text = self.transcript.last_human_text()?.to_string();
        Some(self.send(&text, None))
    }

    /// Removes the entry at `index` and hands back its text for re-editing.
    pub fn take_entry_for_edit(&mut self, index: usize) -> Option<String> {
        if self.is_streaming() {
            return None;
        }
        let entry = self.transcript.remove(index)?;
        self.observer.transcript_reset(&self.transcript);
        Some(entry.text)
    }

    fn is_active(&self, operation: OperationId, step: &str) -> bool {
        let active = self.active_operation() == Some(operation);
        if !active {
            debug!(operation, step, current = ?self.active_operation(), "ignoring stale operation");
        }
        active
    }

    fn finish_active(&mut self, operation: OperationId) {
        if let Some(mut active) = self.active.take() {
            active.parser.finish();
        }
        self.phase = Phase::Idle;
        self.set_typing(false);
        self.observer.stream_closed(operation);
        debug!(operation, "stream finished");
    }

    fn supersede_active(&mut self, reason: &str) {
        let Some(active) = self.active.take() else {
            return;
        };
        let operation = active.reconciliation.operation();
        active.cancel.store(true, Ordering::Release);
        self.phase = Phase::Idle;
        self.set_typing(false);
        self.observer.stream_closed(operation);
        debug!(operation, reason, "superseded active operation");
    }

    fn set_typing(&mut self, typing: bool) {
        if self.session.set_typing(typing) {
            self.observer.typing_changed(typing);
        }
    }
}
