// ABOUTME: Error types for the flux-agent crate.
// ABOUTME: Load errors carry a user-facing message; invoke errors come from the agent itself.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("no agent file found in {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but cannot be used as an agent.
    #[error("invalid agent: {0}")]
    Invalid(String),

    /// The agent could not be started. The message is shown to the user as-is.
    #[error("{0}")]
    Load(String),

    /// The agent's `invoke` threw.
    #[error("agent error: {0}")]
    Invoke(String),

    /// The bridge process misbehaved or went away.
    #[error("agent bridge: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_is_shown_verbatim() {
        let err = AgentError::Load("Agent must have an `invoke` method".to_string());
        assert_eq!(err.to_string(), "Agent must have an `invoke` method");
    }

    #[test]
    fn not_found_names_directory() {
        let err = AgentError::NotFound(PathBuf::from("/work"));
        assert_eq!(err.to_string(), "no agent file found in /work");
    }
}
