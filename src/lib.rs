//! Streaming chat client engine.
//!
//! A reply arrives as a text-framed event stream. Chunks are split into
//! frames, frames are decoded into protocol events, and events are folded into
//! the conversation transcript while the reply is still streaming.
//!
//! # Layout
//! - [`chat_api`] owns the wire format: frame splitting, event decoding and the
//!   HTTP client.
//! - [`chat_transport`] is the contract the engine talks to.
//! - [`transcript`] and [`reconciler`] hold the per-conversation state and the
//!   event folding rules.
//! - [`controller`] drives one send operation at a time and owns session,
//!   history and conversation-list handling.
//! - [`app`], [`commands`] and [`view`] form the line-oriented front end used by
//!   the `spur-chat` binary.

pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod logging;
pub mod reconciler;
pub mod transcript;
pub mod view;

pub use crate::app::ChatApp;
pub use crate::controller::{
    ChatController, ChatObserver, NoopObserver, PendingSend, Phase, SendError, StreamProgress,
    SwitchOutcome, FALLBACK_REPLY,
};
pub use crate::reconciler::{Reaction, Reconciliation};
pub use crate::transcript::{StreamSession, Transcript};

pub use chat_transport::{
    Attachment, AttachmentKind, AttachmentUpload, ChatTransport, ConversationSummary, OperationId,
    Sender, TranscriptEntry, TransportError,
};
