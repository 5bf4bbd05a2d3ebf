// ABOUTME: Re-exports the flux relay protocol: prost messages plus generated gRPC stubs.
// ABOUTME: Single source of truth for FluxService types shared by client, auth and mock relay.

#![allow(clippy::derive_partial_eq_without_eq)]

mod messages;

pub use messages::*;

/// Generated FluxService client and server stubs.
pub mod flux {
    include!(concat!(env!("OUT_DIR"), "/flux.FluxService.rs"));
}

// Re-export client types under a client module
pub mod client {
    pub use super::flux::flux_service_client::FluxServiceClient;
}

// Re-export server types under a server module
pub mod server {
    pub use super::flux::flux_service_server::{FluxService, FluxServiceServer};
}

/// Metadata key carrying the agent's normalized phone number on every call.
pub const PHONE_METADATA_KEY: &str = "x-flux-phone";
