use tracing::{debug, trace};

use crate::events::{decode_frame, ProtocolEvent};

/// Frame boundary of the chat stream wire format.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Incremental splitter that recovers delimiter-terminated frames.
///
/// Each call to [`FrameSplitter::ingest`] appends the chunk to a carry-over
/// buffer and yields every frame completed so far, in arrival order. The
/// trailing piece after the last delimiter (possibly empty) stays buffered
/// until a later chunk completes it.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: String,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one text chunk and drain the frames it completes.
    pub fn ingest(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(split) = self.buffer.find(FRAME_DELIMITER) {
            frames.push(self.buffer[..split].to_owned());
            self.buffer.drain(..split + FRAME_DELIMITER.len());
        }

        frames
    }

    /// Unterminated bytes waiting for a delimiter.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Discard the residual buffer at end of stream.
    ///
    /// A trailing fragment that never saw its delimiter is dropped rather than
    /// treated as a frame. Returns the dropped text for diagnostics.
    pub fn finish(&mut self) -> String {
        let residual = std::mem::take(&mut self.buffer);
        if !residual.is_empty() {
            trace!(bytes = residual.len(), "dropping unterminated trailing frame");
        }
        residual
    }
}

/// Splitter plus decoder: text chunks in, protocol events out.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    splitter: FrameSplitter,
}

impl EventStreamParser {
    /// Feed one text chunk and drain complete events in frame order.
    pub fn feed(&mut self, chunk: &str) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();

        for frame in self.splitter.ingest(chunk) {
            match decode_frame(&frame) {
                Ok(decoded) => events.extend(decoded),
                Err(error) => debug!(%error, "skipping undecodable frame"),
            }
        }

        events
    }

    /// Parse a complete stream body in one shot.
    pub fn parse_frames(input: &str) -> Vec<ProtocolEvent> {
        let mut parser = Self::default();
        let events = parser.feed(input);
        parser.finish();
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.splitter.pending().is_empty()
    }

    pub fn finish(&mut self) -> String {
        self.splitter.finish()
    }
}

/// UTF-8 decoder that carries an incomplete trailing code point between reads.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode `bytes`, holding back a trailing partial sequence.
    ///
    /// Invalid sequences in the middle of the input are replaced with
    /// U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();
        let mut rest: &[u8] = &self.carry;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    // The prefix is valid by construction.
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    match error.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + invalid..];
                        }
                        None => {
                            rest = &rest[valid_up_to..];
                            break;
                        }
                    }
                }
            }
        }

        self.carry = rest.to_vec();
        out
    }

    /// Flush whatever is still carried, lossily.
    pub fn finish(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&carry).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventStreamParser, FrameSplitter, Utf8ChunkDecoder};
    use crate::events::ProtocolEvent;

    #[test]
    fn parse_frames_incrementally() {
        let mut parser = EventStreamParser::default();
        let mut events = Vec::new();

        events.extend(parser.feed("data: {\"chunk\":\"Hello\"}\n\n"));
        assert_eq!(events.len(), 1);

        events.extend(parser.feed("data: [DONE]\n\n"));
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ProtocolEvent::StreamEnd);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn splitter_keeps_trailing_piece_until_completed() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.ingest("data: a\n").is_empty());
        assert_eq!(splitter.pending(), "data: a\n");

        assert_eq!(splitter.ingest("\ndata: b"), vec!["data: a".to_string()]);
        assert_eq!(splitter.pending(), "data: b");
        assert_eq!(splitter.finish(), "data: b");
        assert_eq!(splitter.pending(), "");
    }

    #[test]
    fn splitter_emits_empty_frames_for_consecutive_delimiters() {
        let mut splitter = FrameSplitter::new();
        assert_eq!(
            splitter.ingest("data: a\n\n\n\ndata: b\n\n"),
            vec!["data: a".to_string(), String::new(), "data: b".to_string()]
        );
    }

    #[test]
    fn utf8_decoder_carries_split_code_points() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();

        let first = decoder.decode(&bytes[..2]);
        let second = decoder.decode(&bytes[2..]);

        assert_eq!(first, "h");
        assert_eq!(second, "éllo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn utf8_decoder_replaces_invalid_bytes_in_the_middle() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }
}
