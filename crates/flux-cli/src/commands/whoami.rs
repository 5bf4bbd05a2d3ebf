// ABOUTME: `flux whoami`: report the stored phone number without contacting the relay.

use anyhow::Result;
use flux_auth::CredentialStore;

use crate::config::FluxConfig;

pub fn describe(store: &CredentialStore) -> String {
    match store.load().phone_number {
        Some(phone) if !phone.is_empty() => format!("Logged in as {phone}"),
        _ => "Not logged in.".to_string(),
    }
}

pub fn run(config: &FluxConfig) -> Result<()> {
    println!("{}", describe(&config.credential_store()));
    Ok(())
}
