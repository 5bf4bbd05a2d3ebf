// ABOUTME: Authentication for the flux CLI: phone verification login and credential storage.
// ABOUTME: The relay issues a token after the user texts a one-time code; the token lives on disk.

pub mod error;
pub mod flow;
pub mod messaging;
pub mod phone;
pub mod relay;
pub mod store;

pub use error::AuthError;
pub use flow::{
    AuthSettings, Authenticator, DEFAULT_VERIFICATION_ADDRESS, DEFAULT_VERIFY_TIMEOUT,
};
pub use phone::parse_phone;
pub use relay::AuthRelay;
pub use store::{CredentialStore, Credentials, Identity};
