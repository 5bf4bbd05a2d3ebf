// ABOUTME: Library side of the flux CLI: configuration, prompts, and command implementations.
// ABOUTME: main.rs parses arguments and dispatches into the commands module.

//! # flux-cli
//!
//! Connects a local `agent.ts` / `agent.js` to iMessage through the Flux relay.
//!
//! ```text
//! flux
//! ├── login                # Verify a phone number and store a token
//! ├── logout               # Revoke the token and delete local credentials
//! ├── run [--local|--prod] # Serve messages with the agent (prod is the default)
//! ├── validate             # Check that the agent loads and exports `invoke`
//! └── whoami               # Show the stored phone number
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Log in once
//! flux login
//!
//! # Try the agent in the terminal
//! flux run --local
//!
//! # Serve real messages against a custom relay
//! flux run --server https://relay.example.com
//! ```

pub mod commands;
pub mod config;
pub mod prompt;
pub mod usage;

pub use config::{FluxConfig, GlobalArgs};
