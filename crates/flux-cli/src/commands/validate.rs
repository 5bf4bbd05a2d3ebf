// ABOUTME: `flux validate`: pre-flight check of the agent in the working directory.
// ABOUTME: Reports the verdict but never fails the process.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use flux_agent::{find_agent_file, validate_agent_file, AgentError, Validation};

use crate::commands::{NO_AGENT_HINT, NO_AGENT_MESSAGE};
use crate::config::FluxConfig;

pub async fn run(config: &FluxConfig, dir: &Path) -> Result<Validation> {
    let Some(path) = find_agent_file(dir) else {
        eprintln!("{} {}", "✗".red(), NO_AGENT_MESSAGE);
        eprintln!("  {NO_AGENT_HINT}");
        return Ok(Validation::failed(
            AgentError::NotFound(dir.to_path_buf()).to_string(),
        ));
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Validating {name}...");

    let result = validate_agent_file(&path, &config.runtime).await;
    if result.valid {
        println!("{} {}", "✓".green(), "Agent is valid!".green().bold());
    } else {
        eprintln!(
            "{} Validation failed: {}",
            "✗".red(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(result)
}
