// ABOUTME: Entry point for the flux binary.
// ABOUTME: Parses arguments, sets up logging, and dispatches to the command implementations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flux_cli::commands::{local, login, logout, run, validate, whoami};
use flux_cli::usage::USAGE;
use flux_cli::{FluxConfig, GlobalArgs};

#[derive(Parser)]
#[command(name = "flux")]
#[command(about = "Connect your agent to iMessage through the Flux relay")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with your phone number
    Login {
        /// Phone number to verify (prompted when omitted)
        #[arg(long)]
        phone: Option<String>,
    },

    /// Log out and delete local credentials
    Logout,

    /// Run the agent in the current directory
    Run {
        /// Chat with the agent in the terminal instead of connecting to the relay
        #[arg(long, conflicts_with = "prod")]
        local: bool,

        /// Connect to the relay and serve messages (default)
        #[arg(long)]
        prod: bool,
    },

    /// Check that agent.ts / agent.js exports a usable agent
    Validate,

    /// Show the logged in phone number
    Whoami,

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Agent API keys usually live in .env next to agent.ts
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = FluxConfig::from_args(&cli.global)?;

    let Some(command) = cli.command else {
        print!("{USAGE}");
        return Ok(());
    };

    if matches!(command, Commands::Run { local: true, .. }) {
        flux_log::init_file(&config.log_dir(), "flux-local");
    } else {
        flux_log::init();
    }

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;

    match command {
        Commands::Login { phone } => login::run(&config, phone).await.map(|_| ()),
        Commands::Logout => logout::run(&config).await,
        Commands::Run { local: true, .. } => local::run_local(&config, &cwd).await,
        Commands::Run { .. } => run::run_prod(&config, &cwd).await,
        Commands::Validate => validate::run(&config, &cwd).await.map(|_| ()),
        Commands::Whoami => whoami::run(&config),
        Commands::Unknown(args) => {
            if let Some(name) = args.first() {
                eprintln!("Unknown command: {name}");
                eprintln!();
            }
            print!("{USAGE}");
            Ok(())
        }
    }
}
