// ABOUTME: Implementations behind each flux subcommand.
// ABOUTME: Shared helpers dial the relay and prepare the agent for both run modes.

pub mod local;
pub mod login;
pub mod logout;
pub mod run;
pub mod validate;
pub mod whoami;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use flux_agent::{find_agent_file, load_agent, validate_agent_file, ProcessAgent};
use flux_grpc::{create_channel, AuthInterceptor, RelayClient};

use crate::config::FluxConfig;

pub const NO_AGENT_MESSAGE: &str = "No agent.ts or agent.js found in current directory.";
pub const NO_AGENT_HINT: &str = "Create an agent.ts file with `export default agent`";

pub(crate) fn server_hint(config: &FluxConfig) -> String {
    format!(
        "Failed to connect to server. Make sure the Flux server is running at {}",
        config.server_address
    )
}

/// Unauthenticated relay handle for the login calls.
pub(crate) async fn connect_relay(config: &FluxConfig) -> Result<RelayClient> {
    let channel = create_channel(&config.channel().without_keep_alive())
        .await
        .with_context(|| server_hint(config))?;
    Ok(RelayClient::new(channel, AuthInterceptor::anonymous()))
}

/// Find, validate, and load the agent in `dir`. Failures are fatal for `run`.
pub async fn prepare_agent(config: &FluxConfig, dir: &Path) -> Result<Arc<ProcessAgent>> {
    let Some(path) = find_agent_file(dir) else {
        eprintln!("{} {}", "✗".red(), NO_AGENT_MESSAGE);
        eprintln!("  {NO_AGENT_HINT}");
        bail!("{NO_AGENT_MESSAGE}");
    };

    let validation = validate_agent_file(&path, &config.runtime).await;
    if !validation.valid {
        bail!(
            "Agent validation failed: {}",
            validation.error.unwrap_or_default()
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Loading agent from {}...", name.cyan());
    let agent = load_agent(&path, &config.runtime)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    println!("{}", "Agent loaded successfully!".green());
    Ok(Arc::new(agent))
}
