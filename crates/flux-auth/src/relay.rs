// ABOUTME: The slice of the relay API the login flow needs, behind a trait.
// ABOUTME: RelayClient implements it over gRPC; tests substitute in-memory fakes.

use async_trait::async_trait;
use flux_grpc::RelayClient;

use crate::error::AuthError;

#[async_trait]
pub trait AuthRelay: Send + Sync {
    /// Ask for a one-time code tied to `client_id`.
    async fn request_code(&self, client_id: &str, phone: &str) -> Result<String, AuthError>;

    /// Wait until the code was received and return the issued token.
    async fn wait_verified(&self, client_id: &str) -> Result<String, AuthError>;

    /// `Some(phone)` when the relay still accepts `token`.
    async fn validate(&self, token: &str) -> Result<Option<String>, AuthError>;

    async fn revoke(&self, token: &str) -> Result<bool, AuthError>;
}

#[async_trait]
impl AuthRelay for RelayClient {
    async fn request_code(&self, client_id: &str, phone: &str) -> Result<String, AuthError> {
        let response = self.get_dynamic_code(client_id, phone).await?;
        match response.error {
            Some(error) => Err(AuthError::Relay(format!(
                "failed to get verification code: {error}"
            ))),
            None if response.code.is_empty() => Err(AuthError::Relay(
                "relay returned an empty verification code".to_string(),
            )),
            None => Ok(response.code),
        }
    }

    async fn wait_verified(&self, client_id: &str) -> Result<String, AuthError> {
        let response = self.waiting_verified(client_id).await?;
        if let Some(error) = response.error {
            return Err(AuthError::VerificationFailed(error));
        }
        Ok(response.token)
    }

    async fn validate(&self, token: &str) -> Result<Option<String>, AuthError> {
        let response = self.validate_token(token).await?;
        Ok(response.valid.then_some(response.phone))
    }

    async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.revoke_token(token).await?)
    }
}
