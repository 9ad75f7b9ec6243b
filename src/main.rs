use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chat_transport::ChatTransport;
use chat_transport_http::HttpTransport;
use chat_transport_mock::ScriptedTransport;
use spur_chat::app::ChatApp;
use spur_chat::commands::HELP_TEXT;
use spur_chat::config::{EnvConfig, TransportKind};
use spur_chat::controller::ChatController;
use spur_chat::logging::init_logging;
use spur_chat::view::ConsoleView;
use tracing::info;

fn main() -> io::Result<()> {
    let config = EnvConfig::from_env().map_err(io::Error::other)?;
    init_logging(config.log_filter.as_deref());

    let transport: Arc<dyn ChatTransport> = match config.transport {
        TransportKind::Http => Arc::new(
            HttpTransport::new(config.http_transport_config()).map_err(io::Error::other)?,
        ),
        TransportKind::Mock => Arc::new(ScriptedTransport::new()),
    };
    info!(transport = ?config.transport, "starting chat client");

    let controller =
        ChatController::new(transport).with_observer(Box::new(ConsoleView::new(io::stdout())));
    let mut app = ChatApp::new(controller);

    println!("{HELP_TEXT}");
    print_notices(&app.start(config.session_id.as_deref()))?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !app.should_exit {
        prompt()?;
        let Some(line) = lines.next() else {
            break;
        };
        print_notices(&app.on_line(&line?))?;
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

fn print_notices(notices: &[String]) -> io::Result<()> {
    let mut stdout = io::stdout();
    for notice in notices {
        writeln!(stdout, "{notice}")?;
    }
    stdout.flush()
}
