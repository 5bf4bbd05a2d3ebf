// ABOUTME: Error types for the flux-auth crate.
// ABOUTME: Distinguishes bad input, relay refusals, timeouts, and local storage failures.

use std::time::Duration;

use flux_grpc::GrpcClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid phone number format: {0}")]
    InvalidPhone(String),

    /// The relay answered with an error.
    #[error("relay error: {0}")]
    Relay(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("verification timed out after {}s", .0.as_secs())]
    VerificationTimeout(Duration),

    /// The relay could not be reached.
    #[error("cannot reach relay: {0}")]
    Connection(String),

    #[error("credential store: {0}")]
    Store(String),

    #[error("failed to read input: {0}")]
    Prompt(#[source] std::io::Error),
}

impl From<GrpcClientError> for AuthError {
    fn from(err: GrpcClientError) -> Self {
        match err {
            GrpcClientError::ConnectionFailed(msg) | GrpcClientError::InvalidAddress(msg) => {
                AuthError::Connection(msg)
            }
            GrpcClientError::NotConnected => AuthError::Connection(err.to_string()),
            other => AuthError::Relay(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_seconds() {
        let err = AuthError::VerificationTimeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "verification timed out after 300s");
    }

    #[test]
    fn transport_failures_become_connection_errors() {
        let err: AuthError = GrpcClientError::ConnectionFailed("refused".to_string()).into();
        assert!(matches!(err, AuthError::Connection(msg) if msg == "refused"));

        let err: AuthError = GrpcClientError::StreamClosed.into();
        assert!(matches!(err, AuthError::Relay(_)));
    }
}
