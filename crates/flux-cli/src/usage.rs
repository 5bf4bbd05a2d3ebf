// ABOUTME: Usage text printed when flux is run without a known subcommand.

pub const USAGE: &str = "\
Flux CLI - Connect your agent to iMessage

Commands:
  flux login          - Log in with your phone number
  flux logout         - Log out
  flux validate       - Check if agent.ts exports correctly
  flux run --local    - Test agent locally (no server connection)
  flux run --prod     - Run agent connected to the relay (default)
  flux whoami         - Show current logged in user

Options:
  --server <addr>     - Relay address (FLUX_SERVER_ADDRESS)
  --home <dir>        - Directory holding .flux/ (FLUX_HOME)
";
