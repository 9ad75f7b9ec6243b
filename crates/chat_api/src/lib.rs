//! Transport-only client primitives for the Spur chat service.
//!
//! This crate owns request building, response parsing and stream framing for
//! the chat endpoints only. It contains no transcript state and no UI
//! coupling.
//!
//! The streaming wire format is a sequence of `data: <payload>` frames, each
//! terminated by a blank line. [`FrameSplitter`] recovers frames from
//! arbitrarily split text chunks and [`decode_frame`] turns one frame into
//! zero or more [`ProtocolEvent`]s. [`EventStreamParser`] composes the two.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, ChatApiClient, ChunkStream};
pub use config::ChatApiConfig;
pub use error::{ChatApiError, DecodeError};
pub use events::{decode_frame, ProtocolEvent};
pub use payload::{ChatRequest, ConversationRecord, FileUpload, HistoryMessage};
pub use sse::{EventStreamParser, FrameSplitter, Utf8ChunkDecoder};
pub use url::{normalize_base_url, ChatEndpoints};

pub use reqwest::StatusCode;
