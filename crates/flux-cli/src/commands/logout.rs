// ABOUTME: `flux logout`: best-effort token revocation, then delete local credentials.

use anyhow::Result;
use colored::Colorize;
use flux_auth::Authenticator;
use tracing::debug;

use crate::commands::connect_relay;
use crate::config::FluxConfig;

pub async fn run(config: &FluxConfig) -> Result<()> {
    let store = config.credential_store();

    if store.load().token.is_some() {
        match connect_relay(config).await {
            Ok(relay) => {
                Authenticator::new(relay, store.clone(), config.auth_settings())
                    .logout()
                    .await?;
            }
            Err(e) => {
                debug!(error = %e, "Relay unreachable, skipping revocation");
                store.clear()?;
            }
        }
    } else {
        store.clear()?;
    }

    println!("{} Logged out.", "✓".green());
    Ok(())
}
