// ABOUTME: flux-mock-relay binary: serves the mock FluxService on a TCP port.
// ABOUTME: Stdin takes operator commands; Ctrl+C or SIGTERM stops the server.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use flux_mock::{console, MockOptions, MockRelay};
use tokio::io::BufReader;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "flux-mock-relay", version, about = "Mock flux relay for local testing")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:50051", env = "FLUX_MOCK_ADDR")]
    addr: SocketAddr,

    /// Seconds after an agent connects before the test message is pushed (0 disables)
    #[arg(long, default_value_t = 2)]
    greeting_delay: u64,

    /// Only accept registrations carrying a token this relay issued
    #[arg(long)]
    require_token: bool,

    /// Verify login codes without waiting for `verify <code>`
    #[arg(long)]
    auto_verify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    flux_log::init_for("flux-mock");
    let args = Args::parse();

    let relay = MockRelay::new(MockOptions {
        require_token: args.require_token,
        auto_verify: args.auto_verify,
        greeting_delay: (args.greeting_delay > 0).then(|| Duration::from_secs(args.greeting_delay)),
        reject_registration: None,
    });

    println!("Mock flux relay running on {}", args.addr);
    println!("Waiting for agent connections...");
    println!();
    println!("To test, run in another terminal:");
    println!("  FLUX_SERVER_ADDRESS=http://{} flux run", args.addr);
    println!();
    println!("Type `help` for commands. Press Ctrl+C to stop.");

    let state = relay.state();
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = console::run(state, stdin).await {
            warn!(error = %e, "Console stopped");
        }
    });

    relay
        .serve(args.addr, shutdown_signal())
        .await
        .context("mock relay failed")?;

    info!("Mock relay stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
