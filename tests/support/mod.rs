#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use chat_transport::{ChatTransport, ConversationSummary, OperationId, TranscriptEntry};
use chat_transport_mock::ScriptedTransport;
use spur_chat::controller::{ChatController, ChatObserver};
use spur_chat::transcript::Transcript;

/// Observer callbacks in the order they fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Appended(String),
    Updated(String),
    Typing(bool),
    Session(String),
    Closed(OperationId),
    Reset(usize),
    Conversations(usize),
}

pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl RecordingObserver {
    pub fn new() -> (Self, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }

    fn record(&self, event: Seen) {
        lock_unpoisoned(&self.seen).push(event);
    }
}

impl ChatObserver for RecordingObserver {
    fn entry_appended(&mut self, entry: &TranscriptEntry) {
        self.record(Seen::Appended(entry.text.clone()));
    }

    fn entry_updated(&mut self, entry: &TranscriptEntry) {
        self.record(Seen::Updated(entry.text.clone()));
    }

    fn typing_changed(&mut self, typing: bool) {
        self.record(Seen::Typing(typing));
    }

    fn session_assigned(&mut self, session_id: &str) {
        self.record(Seen::Session(session_id.to_string()));
    }

    fn stream_closed(&mut self, operation: OperationId) {
        self.record(Seen::Closed(operation));
    }

    fn transcript_reset(&mut self, transcript: &Transcript) {
        self.record(Seen::Reset(transcript.len()));
    }

    fn conversations_refreshed(&mut self, conversations: &[ConversationSummary]) {
        self.record(Seen::Conversations(conversations.len()));
    }
}

pub struct Harness {
    pub chat: ChatController,
    pub transport: Arc<ScriptedTransport>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl Harness {
    pub fn new(transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let (observer, seen) = RecordingObserver::new();
        let chat = ChatController::new(Arc::clone(&transport) as Arc<dyn ChatTransport>)
            .with_observer(Box::new(observer));
        Self {
            chat,
            transport,
            seen,
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        lock_unpoisoned(&self.seen).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.chat
            .transcript()
            .entries()
            .iter()
            .map(|entry| entry.text.clone())
            .collect()
    }
}

pub fn summary(id: &str, title: Option<&str>) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        title: title.map(str::to_string),
        updated_at: None,
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
