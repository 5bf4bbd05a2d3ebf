// ABOUTME: `flux login`: verify a phone number with the relay and store the token.

use anyhow::{Context, Result};
use colored::Colorize;
use flux_auth::{parse_phone, Authenticator, Identity};
use flux_grpc::RelayClient;

use crate::commands::connect_relay;
use crate::config::FluxConfig;
use crate::prompt;

pub(crate) async fn authenticator(config: &FluxConfig) -> Result<Authenticator<RelayClient>> {
    let relay = connect_relay(config).await?;
    Ok(Authenticator::new(
        relay,
        config.credential_store(),
        config.auth_settings(),
    ))
}

/// Log in with `phone`, or ask for it when not given.
///
/// A stored token the relay still accepts is reused as-is; a rejected one is
/// discarded before the verification handshake starts.
pub async fn run(config: &FluxConfig, phone: Option<String>) -> Result<Identity> {
    let mut checked = None;
    if config.credential_store().load().token.is_some() {
        let auth = authenticator(config).await?;
        if let Some(identity) = auth
            .current_identity()
            .await
            .context("Failed to check stored login")?
        {
            println!(
                "{} Already logged in as {}",
                "✓".green(),
                identity.phone.bold()
            );
            return Ok(identity);
        }
        checked = Some(auth);
    }

    let input = match phone {
        Some(phone) => phone,
        None => prompt::ask_phone().context("Failed to read phone number")?,
    };
    // Reject bad input before touching the network
    let phone = parse_phone(&input)?;

    println!("{}", "Flux Login".bold());
    println!();

    let auth = match checked {
        Some(auth) => auth,
        None => authenticator(config).await?,
    };
    let identity = auth.login(&phone).await.context("Login failed")?;
    Ok(identity)
}
