//! Folds decoded protocol events into transcript and session state.
//!
//! One [`Reconciliation`] exists per send operation. It owns the text
//! accumulator for that operation and tags the assistant entry it creates
//! with the operation id, so later fragments find their entry by tag. Two
//! entries with equal text are never confused, and a superseded operation
//! can never write into a newer operation's entry.

use chat_api::ProtocolEvent;
use chat_transport::{OperationId, TranscriptEntry};
use tracing::debug;

use crate::transcript::{StreamSession, Transcript};

/// What the controller must do after one event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing externally visible happened.
    None,
    /// A session id was recorded for the first time; the conversation list
    /// should be refreshed once.
    SessionAssigned(String),
    TypingChanged(bool),
    /// A new assistant entry was appended for this operation.
    EntryStarted,
    /// The in-progress entry text was replaced with the longer accumulator.
    EntryExtended,
    /// The terminal sentinel was seen; draining is complete.
    StreamEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    operation: OperationId,
    accumulator: String,
}

impl Reconciliation {
    pub fn new(operation: OperationId) -> Self {
        Self {
            operation,
            accumulator: String::new(),
        }
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    /// Concatenation of every fragment applied so far.
    pub fn text(&self) -> &str {
        &self.accumulator
    }

    pub fn apply(
        &mut self,
        event: ProtocolEvent,
        transcript: &mut Transcript,
        session: &mut StreamSession,
    ) -> Reaction {
        match event {
            ProtocolEvent::SessionAssigned { session_id } => {
                self.on_session_assigned(&session_id, session)
            }
            ProtocolEvent::TypingStatus { active } => self.on_typing_status(active, session),
            ProtocolEvent::TextDelta { fragment } => self.on_text_delta(&fragment, transcript),
            ProtocolEvent::StreamEnd => self.on_stream_end(),
        }
    }

    pub fn on_session_assigned(&mut self, session_id: &str, session: &mut StreamSession) -> Reaction {
        if session.assign_session_id(session_id) {
            debug!(operation = self.operation, session_id, "session assigned");
            Reaction::SessionAssigned(session_id.to_string())
        } else {
            Reaction::None
        }
    }

    pub fn on_typing_status(&mut self, active: bool, session: &mut StreamSession) -> Reaction {
        if session.set_typing(active) {
            Reaction::TypingChanged(active)
        } else {
            Reaction::None
        }
    }

    pub fn on_text_delta(&mut self, fragment: &str, transcript: &mut Transcript) -> Reaction {
        if fragment.is_empty() {
            return Reaction::None;
        }

        self.accumulator.push_str(fragment);
        if transcript.set_in_progress_text(self.operation, &self.accumulator) {
            return Reaction::EntryExtended;
        }

        transcript.push(
            TranscriptEntry::assistant(self.accumulator.clone()).with_operation(self.operation),
        );
        Reaction::EntryStarted
    }

    pub fn on_stream_end(&mut self) -> Reaction {
        Reaction::StreamEnded
    }
}

#[cfg(test)]
mod tests {
    use chat_transport::Sender;
    use pretty_assertions::assert_eq;

    use super::*;

    fn delta(fragment: &str) -> ProtocolEvent {
        ProtocolEvent::TextDelta {
            fragment: fragment.to_string(),
        }
    }

    #[test]
    fn fragments_fold_into_one_entry() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(1);

        let reactions: Vec<Reaction> = ["Hel", "lo", " world"]
            .into_iter()
            .map(|fragment| pass.apply(delta(fragment), &mut transcript, &mut session))
            .collect();

        assert_eq!(
            reactions,
            vec![
                Reaction::EntryStarted,
                Reaction::EntryExtended,
                Reaction::EntryExtended
            ]
        );
        assert_eq!(
            transcript.entries(),
            &[TranscriptEntry::assistant("Hello world").with_operation(1)]
        );
        assert_eq!(pass.text(), "Hello world");
    }

    #[test]
    fn equal_text_in_an_older_entry_is_not_reused() {
        let mut transcript =
            Transcript::from_entries(vec![TranscriptEntry::assistant("Hi").with_operation(1)]);
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(2);

        pass.apply(delta("Hi"), &mut transcript, &mut session);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[0].operation, Some(1));
        assert_eq!(transcript.entries()[1].operation, Some(2));
    }

    #[test]
    fn new_entry_starts_after_a_human_entry_interrupts() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(3);

        pass.apply(delta("partial"), &mut transcript, &mut session);
        transcript.push(TranscriptEntry::human("interjection", None));
        let reaction = pass.apply(delta(" more"), &mut transcript, &mut session);

        assert_eq!(reaction, Reaction::EntryStarted);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.entries()[2].text, "partial more");
        assert_eq!(transcript.entries()[2].sender, Sender::Assistant);
    }

    #[test]
    fn session_assignment_is_idempotent() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(1);

        let first = pass.apply(
            ProtocolEvent::SessionAssigned {
                session_id: "A".to_string(),
            },
            &mut transcript,
            &mut session,
        );
        let second = pass.apply(
            ProtocolEvent::SessionAssigned {
                session_id: "B".to_string(),
            },
            &mut transcript,
            &mut session,
        );

        assert_eq!(first, Reaction::SessionAssigned("A".to_string()));
        assert_eq!(second, Reaction::None);
        assert_eq!(session.session_id(), Some("A"));
        assert!(transcript.is_empty());
    }

    #[test]
    fn typing_reflects_latest_event() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(1);

        for active in [true, false, true] {
            pass.apply(
                ProtocolEvent::TypingStatus { active },
                &mut transcript,
                &mut session,
            );
        }

        assert!(session.typing());
        assert!(transcript.is_empty());
    }

    #[test]
    fn stream_end_leaves_transcript_untouched() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        let mut pass = Reconciliation::new(1);
        pass.apply(delta("done"), &mut transcript, &mut session);
        let before = transcript.clone();

        let reaction = pass.apply(ProtocolEvent::StreamEnd, &mut transcript, &mut session);

        assert_eq!(reaction, Reaction::StreamEnded);
        assert_eq!(transcript, before);
    }
}
