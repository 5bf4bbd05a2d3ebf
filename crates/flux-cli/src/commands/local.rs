// ABOUTME: `flux run --local`: chat with the agent in the terminal, no relay involved.
// ABOUTME: Logs go to a file so they don't interleave with the prompt.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use flux_agent::{Agent, AgentError, AgentInput};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::prepare_agent;
use crate::config::FluxConfig;

/// Sender number handed to the agent in local mode.
pub const LOCAL_PHONE: &str = "+1234567890";

pub async fn run_local(config: &FluxConfig, agent_dir: &Path) -> Result<()> {
    let agent = prepare_agent(config, agent_dir).await?;

    println!();
    println!("Welcome to Flux! Your agent is loaded. Type a message to test it.");
    println!("Press Ctrl+D to exit.");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    chat(agent.as_ref(), stdin, &mut std::io::stdout()).await
}

/// Prompt loop: each non-empty line is one invocation. EOF ends the session.
pub async fn chat<A, R, W>(agent: &A, input: R, out: &mut W) -> Result<()>
where
    A: Agent + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            writeln!(out, "Goodbye!")?;
            return Ok(());
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let input = AgentInput {
            message: message.to_string(),
            user_phone_number: LOCAL_PHONE.to_string(),
            image_base64: None,
        };
        match agent.invoke(input).await {
            Ok(reply) => writeln!(out, "Agent: {reply}")?,
            Err(AgentError::Invoke(reason)) => writeln!(out, "Error: {reason}")?,
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }
}
