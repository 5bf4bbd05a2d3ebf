// ABOUTME: Error types for the flux-grpc crate.
// ABOUTME: Separates transport, registration, stream, and auth failures so callers can react.

use thiserror::Error;
use tonic::Code;

/// Errors raised by the relay session.
#[derive(Error, Debug)]
pub enum GrpcClientError {
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// Transport could not be established or the relay is unreachable.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation needed a connected session.
    #[error("not connected to relay")]
    NotConnected,

    #[error("agent already registered on this session")]
    AlreadyRegistered,

    /// The relay answered registration with `success = false`.
    #[error("registration rejected: {reason}")]
    RegistrationRejected { reason: String },

    #[error("stream closed by relay")]
    StreamClosed,

    #[error("stream error: {0}")]
    StreamError(String),

    /// The message handler failed. Logged by the stream loop, never fatal.
    #[error("message handling failed: {0}")]
    HandlerError(String),

    /// Token missing, malformed, or refused by the relay.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Any other non-OK status from a unary call.
    #[error("relay call {operation} failed: {message}")]
    Relay {
        operation: &'static str,
        message: String,
    },
}

impl GrpcClientError {
    /// Map a unary call status, keeping auth and availability distinguishable.
    pub fn from_status(operation: &'static str, status: tonic::Status) -> Self {
        match status.code() {
            Code::Unauthenticated | Code::PermissionDenied => {
                GrpcClientError::AuthenticationFailed(status.message().to_string())
            }
            Code::Unavailable => GrpcClientError::ConnectionFailed(status.message().to_string()),
            _ => GrpcClientError::Relay {
                operation,
                message: format!("{:?}: {}", status.code(), status.message()),
            },
        }
    }

    /// True when re-authenticating could fix the failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, GrpcClientError::AuthenticationFailed(_))
    }
}

impl From<tonic::Status> for GrpcClientError {
    fn from(status: tonic::Status) -> Self {
        GrpcClientError::StreamError(status.to_string())
    }
}

impl From<tonic::transport::Error> for GrpcClientError {
    fn from(err: tonic::transport::Error) -> Self {
        GrpcClientError::ConnectionFailed(err.to_string())
    }
}
