//! Transcript and stream session state owned by the controller.

use chat_transport::{OperationId, Sender, TranscriptEntry};
use tracing::debug;

/// Per-conversation stream state shown beside the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSession {
    session_id: Option<String>,
    typing: bool,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn typing(&self) -> bool {
        self.typing
    }

    /// Records `session_id` unless one is already set.
    ///
    /// Blank ids never count. Returns `true` only when the id was stored.
    pub fn assign_session_id(&mut self, session_id: &str) -> bool {
        if session_id.is_empty() {
            return false;
        }

        match self.session_id.as_deref() {
            None => {
                self.session_id = Some(session_id.to_string());
                true
            }
            Some(current) => {
                if current != session_id {
                    debug!(current, ignored = session_id, "session id already assigned");
                }
                false
            }
        }
    }

    /// Replaces the session id outright, as when switching conversations.
    pub fn resume(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
        self.typing = false;
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_typing(&mut self, typing: bool) -> bool {
        let changed = self.typing != typing;
        self.typing = typing;
        changed
    }

    pub fn clear(&mut self) {
        self.session_id = None;
        self.typing = false;
    }
}

/// Ordered human and assistant entries of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<TranscriptEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn push(&mut self, entry: TranscriptEntry) -> &TranscriptEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn replace(&mut self, entries: Vec<TranscriptEntry>) {
        self.entries = entries;
    }

    pub fn remove(&mut self, index: usize) -> Option<TranscriptEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Text of the most recent human entry.
    pub fn last_human_text(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.sender == Sender::Human)
            .map(|entry| entry.text.as_str())
    }

    /// Whether the last entry is the assistant entry owned by `operation`.
    ///
    /// Ownership is decided by the operation tag, never by comparing text.
    pub fn is_in_progress(&self, operation: OperationId) -> bool {
        self.entries.last().is_some_and(|entry| {
            entry.sender == Sender::Assistant && entry.operation == Some(operation)
        })
    }

    /// Overwrites the text of the in-progress entry of `operation`.
    ///
    /// Returns `false` when that entry is not the last one.
    pub fn set_in_progress_text(&mut self, operation: OperationId, text: &str) -> bool {
        if !self.is_in_progress(operation) {
            return false;
        }
        match self.entries.last_mut() {
            Some(entry) => {
                entry.text.clear();
                entry.text.push_str(text);
                true
            }
            None => false,
        }
    }
}
