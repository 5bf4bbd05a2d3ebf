// ABOUTME: Line-based operator console for the mock relay binary.
// ABOUTME: Reads commands from stdin to push test messages, list agents, and verify logins.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::state::{test_message, RelayState};

const HELP: &str = "\
Commands:
  send [text]     Send a test message to every registered agent
  list            List registered agents
  verify <code>   Mark a pending login code as verified
  help            Show this help";

/// A parsed console line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Send(Option<String>),
    List,
    Verify(String),
    Help,
    Unknown(String),
}

pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    Some(match word {
        "send" if rest.is_empty() => Command::Send(None),
        "send" => Command::Send(Some(rest.to_string())),
        "list" => Command::List,
        "verify" if !rest.is_empty() => Command::Verify(rest.to_string()),
        "help" => Command::Help,
        _ => Command::Unknown(line.to_string()),
    })
}

/// Execute one command and return the text to show the operator.
pub async fn execute(state: &RelayState, command: Command) -> String {
    match command {
        Command::Send(text) => {
            let agents = state.registered_agents().await;
            if agents.is_empty() {
                return "No registered agents".to_string();
            }
            let mut lines = Vec::new();
            for phone in agents {
                let result = match &text {
                    Some(text) => state.deliver(&phone, test_message(&phone, text)).await,
                    None => state.send_test_message(&phone).await.map(|_| ()),
                };
                match result {
                    Ok(()) => lines.push(format!("Sent test message to {phone}")),
                    Err(e) => lines.push(format!("Could not reach {phone}: {}", e.message())),
                }
            }
            lines.join("\n")
        }
        Command::List => {
            let agents = state.registered_agents().await;
            if agents.is_empty() {
                "No registered agents".to_string()
            } else {
                format!("Registered agents: {}", agents.join(", "))
            }
        }
        Command::Verify(code) => match state.verify_code(&code).await {
            Some(phone) => format!("Verified login for {phone}"),
            None => format!("No pending login with code {code}"),
        },
        Command::Help => HELP.to_string(),
        Command::Unknown(line) => format!("Unknown command: {line} (try `help`)"),
    }
}

/// Run the console until `input` hits EOF.
pub async fn run<R>(state: Arc<RelayState>, input: R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(command) = parse(&line) {
            println!("{}", execute(&state, command).await);
        }
    }
    Ok(())
}
