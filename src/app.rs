//! Line-oriented front end over [`ChatController`].
//!
//! Each submitted line is either a slash command or a message. Messages pick
//! up the staged attachment, if any. Notices for the user (help text, list
//! output, failures) are returned to the caller rather than printed.

use std::fs;
use std::path::Path;

use chat_transport::AttachmentUpload;

use crate::commands::{parse_chat_command, ChatCommand, HELP_TEXT};
use crate::controller::{ChatController, SendError, SwitchOutcome};
use crate::view::format_conversations;

pub struct ChatApp {
    controller: ChatController,
    staged: Option<AttachmentUpload>,
    pub should_exit: bool,
}

impl ChatApp {
    pub fn new(controller: ChatController) -> Self {
        Self {
            controller,
            staged: None,
            should_exit: false,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn staged_attachment(&self) -> Option<&AttachmentUpload> {
        self.staged.as_ref()
    }

    /// Loads the conversation list and resumes `session_id` when given.
    pub fn start(&mut self, session_id: Option<&str>) -> Vec<String> {
        self.controller.refresh_conversations();
        match session_id {
            Some(session_id) => self.switch(session_id),
            None => Vec::new(),
        }
    }

    pub fn on_line(&mut self, line: &str) -> Vec<String> {
        if let Some(command) = parse_chat_command(line) {
            return self.on_command(command);
        }

        let attachment = self.staged.take();
        match self
            .controller
            .send(line.trim_end_matches(&['\r', '\n'][..]), attachment)
        {
            // Blank lines are not sent.
            Ok(_) | Err(SendError::EmptyMessage) => Vec::new(),
        }
    }

    fn on_command(&mut self, command: ChatCommand) -> Vec<String> {
        match command {
            ChatCommand::New => {
                self.controller.start_new_session();
                vec!["Started a new conversation.".to_string()]
            }
            ChatCommand::List => {
                format_conversations(self.controller.refresh_conversations())
            }
            ChatCommand::Switch(id) => self.switch(&id),
            ChatCommand::Delete(id) => match self.controller.delete_conversation(&id) {
                Ok(()) => vec![format!("Deleted conversation {id}.")],
                Err(error) => vec![format!("Failed to delete {id}: {error}")],
            },
            ChatCommand::Retry => match self.controller.retry_last() {
                Some(_) => Vec::new(),
                None => vec!["Nothing to retry.".to_string()],
            },
            ChatCommand::Edit(index) => match self.controller.take_entry_for_edit(index) {
                Some(text) => vec![
                    format!("Removed entry {index}. Its text was:"),
                    text,
                ],
                None => vec![format!("No editable entry at index {index}.")],
            },
            ChatCommand::Attach(path) => match read_attachment(&path) {
                Ok(upload) => {
                    let notice = format!(
                        "Attached {} ({}, {} bytes).",
                        upload.file_name,
                        upload.content_type,
                        upload.bytes.len()
                    );
                    self.staged = Some(upload);
                    vec![notice]
                }
                Err(error) => vec![format!("Cannot attach {}: {error}", path.display())],
            },
            ChatCommand::Detach => match self.staged.take() {
                Some(upload) => vec![format!("Removed attachment {}.", upload.file_name)],
                None => vec!["No attachment staged.".to_string()],
            },
            ChatCommand::Help => vec![HELP_TEXT.to_string()],
            ChatCommand::Quit => {
                self.should_exit = true;
                Vec::new()
            }
            ChatCommand::Usage(usage) => vec![format!("Usage: {usage}")],
            ChatCommand::Unknown(command) => vec![format!("Unknown command: {command}")],
        }
    }

    fn switch(&mut self, id: &str) -> Vec<String> {
        match self.controller.switch_to_session(id) {
            Ok(SwitchOutcome::Loaded { .. }) => Vec::new(),
            Ok(SwitchOutcome::NotFound) => {
                vec![format!("Conversation {id} no longer exists; starting fresh.")]
            }
            Err(error) => vec![format!("Failed to load conversation {id}: {error}")],
        }
    }
}

/// Reads a file for upload, guessing its MIME type from the extension.
pub fn read_attachment(path: &Path) -> std::io::Result<AttachmentUpload> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(AttachmentUpload::new(file_name, guess_content_type(path), bytes))
}

/// MIME type for `path`, from its extension.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
