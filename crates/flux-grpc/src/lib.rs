// ABOUTME: gRPC client for the flux relay: channel creation, auth metadata, and the agent session.
// ABOUTME: The session registers a phone number, acks inbound frames, and relays handler replies.

pub mod auth;
pub mod channel;
pub mod error;
pub mod handler;
pub mod relay;
pub mod session;
pub mod stream;

// Channel creation
pub use channel::{
    create_channel, normalize_address, ChannelConfig, KeepAliveConfig,
    DEFAULT_RELAY_ADDRESS,
};

// Auth metadata
pub use auth::AuthInterceptor;

// Error types
pub use error::GrpcClientError;

// Relay calls
pub use relay::{FluxClient, MessageSink, RelayClient};

// Session lifecycle
pub use session::{normalize_phone, reply_to, SessionClient, SessionIdentity, SessionState};

// Stream management
pub use stream::{OutboundStream, StreamReceiver, StreamSender, DEFAULT_CHANNEL_BUFFER};

// Message handling
pub use handler::{CallbackHandler, HandleOutcome, MessageHandler};

// Re-export proto types for convenience
pub use flux_proto;
