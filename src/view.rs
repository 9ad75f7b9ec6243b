//! Plain-text console rendering of controller state.
//!
//! Assistant text is printed incrementally as fragments arrive; only the new
//! suffix of the in-progress entry is written on each update. Text is printed
//! verbatim.

use std::io::{self, Write};

use chat_transport::{ConversationSummary, OperationId, Sender, TranscriptEntry};
use tracing::warn;

use crate::controller::ChatObserver;
use crate::transcript::Transcript;

pub const TYPING_INDICATOR: &str = "assistant is typing…";

pub struct ConsoleView<W: Write> {
    out: W,
    open_line: Option<OpenLine>,
    write_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenLine {
    operation: OperationId,
    printed: usize,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            open_line: None,
            write_failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Records a failed write; only the first failure is logged.
    fn check(&mut self, result: io::Result<()>) {
        if let Err(error) = result {
            if !self.write_failed {
                warn!(%error, "console write failed");
                self.write_failed = true;
            }
        }
    }

    fn flush(&mut self) {
        let result = self.out.flush();
        self.check(result);
    }

    fn close_line(&mut self) {
        if self.open_line.take().is_some() {
            let result = writeln!(self.out);
            self.check(result);
        }
    }

    fn write_entry(&mut self, entry: &TranscriptEntry) {
        let result = writeln!(self.out, "{}", format_entry(entry));
        self.check(result);
    }
}

impl<W: Write> ChatObserver for ConsoleView<W> {
    fn entry_appended(&mut self, entry: &TranscriptEntry) {
        self.close_line();

        match (entry.sender, entry.operation) {
            (Sender::Human, _) => {
                if let Some(attachment) = &entry.attachment {
                    let result = writeln!(self.out, "  [attached {}]", attachment.url);
                    self.check(result);
                }
            }
            (Sender::Assistant, Some(operation)) => {
                let result = write!(self.out, "assistant: {}", entry.text);
                self.check(result);
                self.open_line = Some(OpenLine {
                    operation,
                    printed: entry.text.len(),
                });
            }
            (Sender::Assistant, None) => self.write_entry(entry),
        }
        self.flush();
    }

    fn entry_updated(&mut self, entry: &TranscriptEntry) {
        let Some(line) = self.open_line else {
            return;
        };
        if entry.operation != Some(line.operation) {
            return;
        }

        if let Some(suffix) = entry.text.get(line.printed..) {
            let result = write!(self.out, "{suffix}");
            self.check(result);
            self.open_line = Some(OpenLine {
                printed: entry.text.len(),
                ..line
            });
        }
        self.flush();
    }

    fn typing_changed(&mut self, typing: bool) {
        if typing && self.open_line.is_none() {
            let result = writeln!(self.out, "{TYPING_INDICATOR}");
            self.check(result);
            self.flush();
        }
    }

    fn stream_closed(&mut self, operation: OperationId) {
        if self
            .open_line
            .is_some_and(|line| line.operation == operation)
        {
            self.close_line();
            self.flush();
        }
    }

    fn transcript_reset(&mut self, transcript: &Transcript) {
        self.close_line();
        let result = writeln!(self.out, "--- {} ---", plural(transcript.len(), "entry", "entries"));
        self.check(result);
        for entry in transcript.entries() {
            self.write_entry(entry);
        }
        self.flush();
    }
}

/// One transcript entry as a single display block.
pub fn format_entry(entry: &TranscriptEntry) -> String {
    let speaker = match entry.sender {
        Sender::Human => "you",
        Sender::Assistant => "assistant",
    };
    let mut line = format!("{speaker}: {}", entry.text);
    if let Some(attachment) = &entry.attachment {
        line.push_str(&format!("\n  [attached {}]", attachment.url));
    }
    line
}

/// Conversation list rows in service order.
pub fn format_conversations(conversations: &[ConversationSummary]) -> Vec<String> {
    if conversations.is_empty() {
        return vec!["No conversations yet.".to_string()];
    }

    conversations
        .iter()
        .map(|summary| match summary.updated_at.as_deref() {
            Some(updated_at) => format!(
                "{}  {}  ({updated_at})",
                summary.id,
                summary.display_title()
            ),
            None => format!("{}  {}", summary.id, summary.display_title()),
        })
        .collect()
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

#[cfg(test)]
mod tests {
    use chat_transport::{Attachment, AttachmentKind};

    use super::*;

    fn output(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).expect("console output should be utf-8")
    }

    #[test]
    fn streamed_text_is_printed_incrementally() {
        let mut view = ConsoleView::new(Vec::new());

        view.typing_changed(true);
        view.entry_appended(&TranscriptEntry::assistant("Hi").with_operation(1));
        view.entry_updated(&TranscriptEntry::assistant("Hi there").with_operation(1));
        view.entry_updated(&TranscriptEntry::assistant("Hi there!").with_operation(2));
        view.stream_closed(1);

        assert_eq!(
            output(view),
            format!("{TYPING_INDICATOR}\nassistant: Hi there\n")
        );
    }

    #[test]
    fn fallback_entry_closes_open_line() {
        let mut view = ConsoleView::new(Vec::new());

        view.entry_appended(&TranscriptEntry::assistant("part").with_operation(1));
        view.entry_appended(&TranscriptEntry::assistant("Sorry"));

        assert_eq!(output(view), "assistant: part\nassistant: Sorry\n");
    }

    #[test]
    fn transcript_reset_prints_every_entry() {
        let mut view = ConsoleView::new(Vec::new());
        let transcript = Transcript::from_entries(vec![
            TranscriptEntry::human(
                "look",
                Some(Attachment {
                    url: "http://localhost:3001/uploads/a.png".to_string(),
                    kind: AttachmentKind::Image,
                }),
            ),
            TranscriptEntry::assistant("nice"),
        ]);

        view.transcript_reset(&transcript);

        assert_eq!(
            output(view),
            "--- 2 entries ---\nyou: look\n  [attached http://localhost:3001/uploads/a.png]\nassistant: nice\n"
        );
    }

    #[test]
    fn write_failures_are_recorded_once() {
        struct BrokenPipe {
            attempts: usize,
        }

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                self.attempts += 1;
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let mut view = ConsoleView::new(BrokenPipe { attempts: 0 });
        assert!(!view.write_failed);

        view.entry_appended(&TranscriptEntry::assistant("one"));
        view.entry_appended(&TranscriptEntry::assistant("two"));

        assert!(view.write_failed);
        assert_eq!(view.into_inner().attempts, 2);
    }

    #[test]
    fn conversations_are_listed_with_titles() {
        let rows = format_conversations(&[
            ConversationSummary {
                id: "c1".to_string(),
                title: Some("Shipping".to_string()),
                updated_at: Some("2026-03-01".to_string()),
            },
            ConversationSummary {
                id: "c2".to_string(),
                title: None,
                updated_at: None,
            },
        ]);

        assert_eq!(
            rows,
            vec![
                "c1  Shipping  (2026-03-01)".to_string(),
                "c2  Untitled Chat".to_string()
            ]
        );
        assert_eq!(format_conversations(&[]), vec!["No conversations yet.".to_string()]);
    }
}
