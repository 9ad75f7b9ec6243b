use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    New,
    List,
    Switch(String),
    Delete(String),
    Retry,
    Edit(usize),
    Attach(PathBuf),
    Detach,
    Help,
    Quit,
    /// A known command with a missing or invalid argument.
    Usage(&'static str),
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: /new, /list, /switch <id>, /delete <id>, /retry, /edit <index>, /attach <path>, /detach, /help, /quit";

pub fn parse_chat_command(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/new" => ChatCommand::New,
        "/list" => ChatCommand::List,
        "/switch" => required(argument, "/switch <id>", |id| ChatCommand::Switch(id.to_string())),
        "/delete" => required(argument, "/delete <id>", |id| ChatCommand::Delete(id.to_string())),
        "/retry" => ChatCommand::Retry,
        "/edit" => match argument.parse::<usize>() {
            Ok(index) => ChatCommand::Edit(index),
            Err(_) => ChatCommand::Usage("/edit <index>"),
        },
        "/attach" => required(argument, "/attach <path>", |path| {
            ChatCommand::Attach(PathBuf::from(path))
        }),
        "/detach" => ChatCommand::Detach,
        "/help" => ChatCommand::Help,
        "/quit" | "/exit" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn required(
    argument: &str,
    usage: &'static str,
    build: impl FnOnce(&str) -> ChatCommand,
) -> ChatCommand {
    if argument.is_empty() {
        ChatCommand::Usage(usage)
    } else {
        build(argument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_chat_command("hello there"), None);
        assert_eq!(parse_chat_command("  not /a command"), None);
    }

    #[test]
    fn commands_with_arguments_are_parsed() {
        assert_eq!(
            parse_chat_command("/switch  abc-123 "),
            Some(ChatCommand::Switch("abc-123".to_string()))
        );
        assert_eq!(
            parse_chat_command("/delete c1"),
            Some(ChatCommand::Delete("c1".to_string()))
        );
        assert_eq!(parse_chat_command("/edit 2"), Some(ChatCommand::Edit(2)));
        assert_eq!(
            parse_chat_command("/attach ./my file.pdf"),
            Some(ChatCommand::Attach(PathBuf::from("./my file.pdf")))
        );
    }

    #[test]
    fn missing_or_bad_arguments_report_usage() {
        assert_eq!(
            parse_chat_command("/switch"),
            Some(ChatCommand::Usage("/switch <id>"))
        );
        assert_eq!(
            parse_chat_command("/edit two"),
            Some(ChatCommand::Usage("/edit <index>"))
        );
        assert_eq!(
            parse_chat_command("/attach   "),
            Some(ChatCommand::Usage("/attach <path>"))
        );
    }

    #[test]
    fn bare_commands_and_unknowns() {
        assert_eq!(parse_chat_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_chat_command("/list"), Some(ChatCommand::List));
        assert_eq!(parse_chat_command("/retry"), Some(ChatCommand::Retry));
        assert_eq!(parse_chat_command("/detach"), Some(ChatCommand::Detach));
        assert_eq!(parse_chat_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_chat_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_chat_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(
            parse_chat_command("/nope extra args"),
            Some(ChatCommand::Unknown("/nope".to_string()))
        );
    }
}
