// ABOUTME: `flux run --prod`: serve relay messages with the local agent until interrupted.
// ABOUTME: Re-runs login once if the relay rejects the stored token at registration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use flux_agent::{Agent, AgentHandler};
use flux_auth::Identity;
use flux_grpc::{GrpcClientError, SessionClient, SessionIdentity};
use tokio::signal;
use tracing::{info, warn};

use crate::commands::{login, prepare_agent, server_hint};
use crate::config::FluxConfig;
use crate::prompt;

enum RunOutcome {
    Interrupted,
    StreamEnded(Result<(), GrpcClientError>),
}

/// Connect, register `agent` under `identity`, and start streaming.
pub async fn start_session(
    config: &FluxConfig,
    identity: &Identity,
    agent: Arc<dyn Agent>,
) -> Result<SessionClient, GrpcClientError> {
    let mut session = SessionClient::new(
        config.channel(),
        SessionIdentity {
            phone: identity.phone.clone(),
            token: Some(identity.token.clone()),
        },
    );
    session.connect().await?;
    if let Err(e) = session.register(AgentHandler::new(agent)).await {
        session.disconnect().await;
        return Err(e);
    }
    Ok(session)
}

fn session_error(config: &FluxConfig, err: GrpcClientError) -> anyhow::Error {
    match err {
        GrpcClientError::ConnectionFailed(_) | GrpcClientError::InvalidAddress(_) => {
            anyhow::Error::from(err).context(server_hint(config))
        }
        other => anyhow::Error::from(other).context("Failed to register agent"),
    }
}

pub async fn run_prod(config: &FluxConfig, agent_dir: &Path) -> Result<()> {
    let auth = login::authenticator(config).await?;
    let identity = auth
        .ensure_identity(prompt::ask_phone)
        .await
        .context("Login failed")?;
    let agent = prepare_agent(config, agent_dir).await?;

    let (mut session, phone) = match start_session(config, &identity, agent.clone()).await {
        Ok(session) => (session, identity.phone),
        Err(e) if e.is_auth() => {
            warn!(error = %e, "Relay rejected stored token");
            println!("{} Session expired. Please log in again.", "!".yellow().bold());
            auth.store().clear()?;
            let input = prompt::ask_phone().context("Failed to read phone number")?;
            let identity = auth.login(&input).await.context("Login failed")?;
            let session = start_session(config, &identity, agent)
                .await
                .map_err(|e| session_error(config, e))?;
            (session, identity.phone)
        }
        Err(e) => return Err(session_error(config, e)),
    };

    println!();
    println!(
        "{}",
        "Agent running in production mode. Press Ctrl+C to stop.".green().bold()
    );
    println!(
        "Messages to {} will be processed by your agent.",
        phone.cyan()
    );
    println!();

    let outcome = tokio::select! {
        _ = shutdown_signal() => RunOutcome::Interrupted,
        result = session.closed() => RunOutcome::StreamEnded(result),
    };

    match outcome {
        RunOutcome::Interrupted => {
            println!();
            println!("Shutting down...");
            session.disconnect().await;
            Ok(())
        }
        RunOutcome::StreamEnded(Ok(())) => {
            info!("Message stream finished");
            Ok(())
        }
        RunOutcome::StreamEnded(Err(e)) => {
            Err(anyhow::Error::from(e).context("Lost connection to the relay"))
        }
    }
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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
