// ABOUTME: Runtime configuration for the flux CLI, built once from flags and environment.
// ABOUTME: Everything downstream receives a FluxConfig instead of reading globals.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use flux_agent::RuntimeConfig;
use flux_auth::{AuthSettings, CredentialStore, DEFAULT_VERIFICATION_ADDRESS};
use flux_grpc::{ChannelConfig, DEFAULT_RELAY_ADDRESS};

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Relay address (host:port or URL; https enables TLS)
    #[arg(long = "server", global = true, env = "FLUX_SERVER_ADDRESS", default_value = DEFAULT_RELAY_ADDRESS)]
    pub server: String,

    /// Directory that holds .flux/ (defaults to your home directory)
    #[arg(long, global = true, env = "FLUX_HOME")]
    pub home: Option<PathBuf>,

    /// Number that receives login verification codes
    #[arg(long, global = true, env = "FLUX_VERIFICATION_NUMBER", default_value = DEFAULT_VERIFICATION_ADDRESS)]
    pub verification_number: String,

    /// Seconds to wait for the verification code to arrive
    #[arg(long, global = true, env = "FLUX_VERIFY_TIMEOUT", default_value_t = 300, value_name = "SECS")]
    pub verify_timeout: u64,

    /// Seconds to wait when dialing the relay
    #[arg(long, global = true, env = "FLUX_CONNECT_TIMEOUT", default_value_t = 10, value_name = "SECS")]
    pub connect_timeout: u64,

    /// Command used to run agent.ts (default: "npx --yes tsx")
    #[arg(long, global = true, env = "FLUX_TS_RUNTIME")]
    pub ts_runtime: Option<String>,

    /// Command used to run agent.js (default: "node")
    #[arg(long, global = true, env = "FLUX_JS_RUNTIME")]
    pub js_runtime: Option<String>,

    /// Don't open the Messages app during login
    #[arg(long, global = true)]
    pub no_open: bool,
}

#[derive(Debug, Clone)]
pub struct FluxConfig {
    pub server_address: String,
    pub connect_timeout: Duration,
    pub home_dir: PathBuf,
    pub verification_address: String,
    pub verify_timeout: Duration,
    pub open_messages: bool,
    pub runtime: RuntimeConfig,
}

impl FluxConfig {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let home_dir = match &args.home {
            Some(home) => home.clone(),
            None => dirs::home_dir().context("Could not determine home directory")?,
        };

        Ok(Self {
            server_address: args.server.clone(),
            connect_timeout: Duration::from_secs(args.connect_timeout),
            home_dir,
            verification_address: args.verification_number.clone(),
            verify_timeout: Duration::from_secs(args.verify_timeout),
            open_messages: !args.no_open,
            runtime: RuntimeConfig::default()
                .with_overrides(args.ts_runtime.as_deref(), args.js_runtime.as_deref()),
        })
    }

    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig::new(&self.server_address).with_connect_timeout(self.connect_timeout)
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(&self.home_dir)
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            verification_address: self.verification_address.clone(),
            verify_timeout: self.verify_timeout,
            open_messages: self.open_messages,
        }
    }

    /// Where `run --local` writes its log file.
    pub fn log_dir(&self) -> PathBuf {
        self.home_dir.join(".flux").join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    fn parse(args: &[&str]) -> FluxConfig {
        let cli = TestCli::try_parse_from(std::iter::once("flux").chain(args.iter().copied()))
            .unwrap();
        FluxConfig::from_args(&cli.global).unwrap()
    }

    #[test]
    fn explicit_flags_win() {
        let config = parse(&[
            "--server",
            "relay.example.com:443",
            "--home",
            "/tmp/flux-home",
            "--verify-timeout",
            "30",
            "--ts-runtime",
            "bun",
            "--no-open",
            "--connect-timeout",
            "3",
        ]);
        assert_eq!(config.server_address, "relay.example.com:443");
        assert_eq!(config.home_dir, PathBuf::from("/tmp/flux-home"));
        assert_eq!(config.verify_timeout, Duration::from_secs(30));
        assert_eq!(config.runtime.typescript, vec!["bun"]);
        assert!(!config.open_messages);
        assert_eq!(config.channel().connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn derived_paths_live_under_home() {
        let config = parse(&["--home", "/tmp/flux-home"]);
        assert_eq!(
            config.credential_store().path(),
            PathBuf::from("/tmp/flux-home/.flux/credentials.json")
        );
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/flux-home/.flux/logs"));
    }

    #[test]
    fn https_port_enables_tls() {
        let config = parse(&["--server", "relay.example.com:443", "--home", "/tmp"]);
        assert!(config.channel().address.starts_with("https://"));
    }
}
