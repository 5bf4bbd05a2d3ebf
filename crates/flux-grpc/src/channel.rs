// ABOUTME: Relay channel creation with keep-alive, TLS, and address normalization.
// ABOUTME: Bare host:port addresses get a scheme inferred from the port before dialing.

use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::error::GrpcClientError;

/// Relay address used when neither `--server` nor `FLUX_SERVER_ADDRESS` is set.
pub const DEFAULT_RELAY_ADDRESS: &str = "http://127.0.0.1:50051";

/// Keep-alive settings for the long-lived message stream.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between pings while the connection is idle.
    pub interval: Duration,
    /// How long to wait for a ping ack before the connection is considered dead.
    pub timeout: Duration,
    /// Ping even when no streams are open.
    pub while_idle: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(20),
            while_idle: true,
        }
    }
}

/// Where and how to reach the relay.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Normalized relay URI, always carrying an http:// or https:// scheme.
    pub address: String,
    /// Keep-alive configuration. None disables HTTP/2 pings.
    pub keep_alive: Option<KeepAliveConfig>,
    pub connect_timeout: Option<Duration>,
    pub use_tls: bool,
}

impl ChannelConfig {
    /// Build a config for `address`. TLS follows the (possibly inferred) scheme.
    pub fn new(address: impl AsRef<str>) -> Self {
        let address = normalize_address(address.as_ref());
        let use_tls = address.to_ascii_lowercase().starts_with("https://");
        Self {
            address,
            keep_alive: Some(KeepAliveConfig::default()),
            connect_timeout: Some(Duration::from_secs(10)),
            use_tls,
        }
    }

    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive = None;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_ADDRESS)
    }
}

/// Turn user input into a dialable URI.
///
/// `host:443` becomes `https://host:443`, any other bare `host:port` becomes
/// `http://host:port`. Explicit schemes are kept and trailing slashes dropped.
pub fn normalize_address(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || trimmed.is_empty() {
        return trimmed.to_string();
    }
    if trimmed.ends_with(":443") {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    }
}

/// Dial the relay described by `config`.
pub async fn create_channel(config: &ChannelConfig) -> Result<Channel, GrpcClientError> {
    let mut endpoint = Endpoint::from_shared(config.address.clone())
        .map_err(|e| GrpcClientError::InvalidAddress(format!("{}: {e}", config.address)))?;

    if config.use_tls {
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new())
            .map_err(|e| GrpcClientError::ConnectionFailed(format!("TLS config error: {e}")))?;
    }

    if let Some(ka) = &config.keep_alive {
        endpoint = endpoint
            .http2_keep_alive_interval(ka.interval)
            .keep_alive_timeout(ka.timeout)
            .keep_alive_while_idle(ka.while_idle);
    }

    if let Some(timeout) = config.connect_timeout {
        endpoint = endpoint.connect_timeout(timeout);
    }

    let channel = endpoint
        .connect()
        .await
        .map_err(|e| GrpcClientError::ConnectionFailed(format!("{}: {e}", config.address)))?;

    tracing::debug!(
        address = %config.address,
        use_tls = config.use_tls,
        "Relay channel connected"
    );

    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_on_443_uses_tls() {
        let config = ChannelConfig::new("fluxy.photon.codes:443");
        assert_eq!(config.address, "https://fluxy.photon.codes:443");
        assert!(config.use_tls);
    }

    #[test]
    fn bare_address_on_other_port_is_plaintext() {
        let config = ChannelConfig::new("localhost:50051");
        assert_eq!(config.address, "http://localhost:50051");
        assert!(!config.use_tls);
    }

    #[test]
    fn explicit_scheme_is_preserved() {
        assert_eq!(normalize_address("  https://relay.test/ "), "https://relay.test");
        assert_eq!(normalize_address("HTTP://relay.test:80"), "HTTP://relay.test:80");
        assert!(ChannelConfig::new("HTTPS://relay.test").use_tls);
    }

    #[test]
    fn default_points_at_local_relay() {
        let config = ChannelConfig::default();
        assert_eq!(config.address, DEFAULT_RELAY_ADDRESS);
        assert!(!config.use_tls);
        assert!(config.keep_alive.is_some());
    }

    #[test]
    fn builder_overrides() {
        let config = ChannelConfig::new("localhost:1")
            .with_connect_timeout(Duration::from_millis(250))
            .without_keep_alive();
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(250)));
        assert!(config.keep_alive.is_none());
    }

    #[tokio::test]
    async fn empty_address_is_rejected() {
        let err = create_channel(&ChannelConfig::new("")).await.unwrap_err();
        assert!(
            matches!(
                err,
                GrpcClientError::InvalidAddress(_) | GrpcClientError::ConnectionFailed(_)
            ),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn refused_connection_is_connection_failed() {
        let config =
            ChannelConfig::new("http://127.0.0.1:1").with_connect_timeout(Duration::from_millis(200));
        let err = create_channel(&config).await.unwrap_err();
        assert!(matches!(err, GrpcClientError::ConnectionFailed(_)), "got {err:?}");
    }
}
