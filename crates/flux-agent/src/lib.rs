// ABOUTME: Agent plugin support: find agent.ts / agent.js, validate it, and invoke it.
// ABOUTME: Agents run in a Node subprocess behind a line-delimited JSON bridge.

pub mod bridge;
pub mod contract;
pub mod error;
pub mod handler;
pub mod loader;
pub mod process;
pub mod runtime;

pub use contract::{Agent, AgentInput};
pub use error::AgentError;
pub use handler::{AgentHandler, FALLBACK_REPLY};
pub use loader::{
    find_agent_file, load_agent, validate_agent_file, Validation, AGENT_FILE_NAME,
    FALLBACK_AGENT_FILE_NAME,
};
pub use process::ProcessAgent;
pub use runtime::{AgentKind, Launcher, RuntimeConfig};
