// ABOUTME: Interactive login, token validation, and logout against the relay.
// ABOUTME: A login asks for a code, has the user text it in, then waits for the relay's token.

use std::io;
use std::time::Duration;

use chrono::Utc;
use colored::Colorize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::messaging;
use crate::phone::parse_phone;
use crate::relay::AuthRelay;
use crate::store::{CredentialStore, Credentials, Identity};

/// Number that receives verification codes.
pub const DEFAULT_VERIFICATION_ADDRESS: &str = "+16286298650";

/// Upper bound on waiting for the user to send the code.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub verification_address: String,
    pub verify_timeout: Duration,
    /// Try to open the messaging app with the code pre-filled.
    pub open_messages: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            verification_address: DEFAULT_VERIFICATION_ADDRESS.to_string(),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            open_messages: true,
        }
    }
}

pub struct Authenticator<R> {
    relay: R,
    store: CredentialStore,
    settings: AuthSettings,
}

impl<R: AuthRelay> Authenticator<R> {
    pub fn new(relay: R, store: CredentialStore, settings: AuthSettings) -> Self {
        Self {
            relay,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// The stored identity if the relay still accepts its token.
    ///
    /// A rejected token deletes the credential file. Transport failures are
    /// returned so the caller can tell "offline" from "logged out".
    pub async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        let stored = self.store.load();
        let Some(token) = stored.token.clone() else {
            return Ok(None);
        };

        match self.relay.validate(&token).await? {
            Some(phone) => {
                let phone = if phone.is_empty() {
                    stored.phone_number.unwrap_or_default()
                } else {
                    phone
                };
                debug!(phone = %phone, "Stored token accepted");
                Ok(Some(Identity {
                    token,
                    phone,
                    issued_at: stored.issued_at.unwrap_or_else(Utc::now),
                }))
            }
            None => {
                info!("Stored token rejected by relay, discarding");
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    /// Run the verification handshake for `phone_input` and persist the result.
    ///
    /// Nothing is written unless the relay hands back a non-empty token.
    pub async fn login(&self, phone_input: &str) -> Result<Identity, AuthError> {
        let phone = parse_phone(phone_input)?;
        let address = &self.settings.verification_address;

        println!("{} Requesting verification code...", "[1/3]".dimmed());
        let client_id = Uuid::new_v4().to_string();
        let code = self.relay.request_code(&client_id, &phone).await?;

        println!();
        println!("  Verification code:");
        println!();
        println!("  {}", format!("  {code}  ").on_white().black().bold());
        println!();

        if self.settings.open_messages {
            match messaging::open_compose(address, &code).await {
                Ok(()) => println!(
                    "  Send the code {} to {} from the Messages window that just opened.",
                    code.bold(),
                    address.cyan()
                ),
                Err(e) => {
                    debug!(error = %e, "Could not open messaging app");
                    println!("  Could not open Messages automatically.");
                    println!(
                        "  Please send {} to {} manually.",
                        code.bold(),
                        address.cyan()
                    );
                }
            }
        } else {
            println!("  Please send {} to {}.", code.bold(), address.cyan());
        }
        println!();

        println!("{} Waiting for verification...", "[2/3]".dimmed());
        let timeout = self.settings.verify_timeout;
        let token = tokio::time::timeout(timeout, self.relay.wait_verified(&client_id))
            .await
            .map_err(|_| AuthError::VerificationTimeout(timeout))??;
        if token.is_empty() {
            return Err(AuthError::VerificationFailed(
                "no token received".to_string(),
            ));
        }

        println!("{} Saving credentials...", "[3/3]".dimmed());
        let identity = Identity {
            token,
            phone,
            issued_at: Utc::now(),
        };
        self.store.save(&Credentials::from(&identity))?;
        info!(phone = %identity.phone, "Logged in");

        println!();
        println!(
            "{} {}",
            "Successfully logged in as".green().bold(),
            identity.phone.bold()
        );
        Ok(identity)
    }

    /// Reuse a valid stored login, otherwise prompt and log in.
    pub async fn ensure_identity<P>(&self, prompt: P) -> Result<Identity, AuthError>
    where
        P: FnOnce() -> io::Result<String>,
    {
        let had_token = self.store.load().token.is_some();
        if let Some(identity) = self.current_identity().await? {
            return Ok(identity);
        }

        if had_token {
            println!("{} Session expired. Please log in again.", "!".yellow().bold());
        } else {
            println!("{} Not logged in.", "!".yellow().bold());
        }
        let input = prompt().map_err(AuthError::Prompt)?;
        self.login(&input).await
    }

    /// Revoke the token if possible, then delete local credentials regardless.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(token) = self.store.load().token {
            match self.relay.revoke(&token).await {
                Ok(revoked) => debug!(revoked, "Token revocation answered"),
                Err(e) => debug!(error = %e, "Token revocation failed, clearing locally"),
            }
        }
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone)]
    enum Verify {
        Token(String),
        Error(String),
        Hang,
    }

    struct FakeRelay {
        verify: Verify,
        valid_token: Option<(String, String)>,
        offline: bool,
        revoke_fails: bool,
        revoked: Mutex<Vec<String>>,
        codes_requested: Mutex<Vec<String>>,
    }

    impl FakeRelay {
        fn new(verify: Verify) -> Self {
            Self {
                verify,
                valid_token: None,
                offline: false,
                revoke_fails: false,
                revoked: Mutex::new(Vec::new()),
                codes_requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuthRelay for FakeRelay {
        async fn request_code(&self, _client_id: &str, phone: &str) -> Result<String, AuthError> {
            self.codes_requested.lock().unwrap().push(phone.to_string());
            Ok("424242".to_string())
        }

        async fn wait_verified(&self, _client_id: &str) -> Result<String, AuthError> {
            match self.verify.clone() {
                Verify::Token(token) => Ok(token),
                Verify::Error(error) => Err(AuthError::VerificationFailed(error)),
                Verify::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn validate(&self, token: &str) -> Result<Option<String>, AuthError> {
            if self.offline {
                return Err(AuthError::Connection("refused".to_string()));
            }
            Ok(self
                .valid_token
                .as_ref()
                .filter(|(valid, _)| valid == token)
                .map(|(_, phone)| phone.clone()))
        }

        async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
            self.revoked.lock().unwrap().push(token.to_string());
            if self.revoke_fails {
                return Err(AuthError::Connection("refused".to_string()));
            }
            Ok(true)
        }
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            open_messages: false,
            verify_timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    fn seed(store: &CredentialStore, token: &str) {
        store
            .save(&Credentials {
                token: Some(token.to_string()),
                phone_number: Some("+15550001111".to_string()),
                issued_at: None,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn login_persists_normalized_phone() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Token("tok-1".to_string())),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let identity = auth.login("15551234567").await.unwrap();
        assert_eq!(identity.phone, "+15551234567");
        assert_eq!(identity.token, "tok-1");

        let raw = std::fs::read_to_string(auth.store().path()).unwrap();
        assert!(raw.contains("\"phoneNumber\": \"+15551234567\""), "{raw}");
        assert_eq!(
            auth.relay.codes_requested.lock().unwrap().as_slice(),
            ["+15551234567"]
        );
    }

    #[tokio::test]
    async fn invalid_phone_stops_before_relay() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Token("tok-1".to_string())),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let err = auth.login("555-1234").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPhone(_)));
        assert!(auth.relay.codes_requested.lock().unwrap().is_empty());
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn verification_timeout_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Hang),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let err = auth.login("+15551234567").await.unwrap_err();
        assert!(matches!(err, AuthError::VerificationTimeout(_)));
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn relay_verification_error_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Error("code expired".to_string())),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let err = auth.login("+15551234567").await.unwrap_err();
        assert!(matches!(err, AuthError::VerificationFailed(msg) if msg == "code expired"));
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn empty_token_is_a_failed_verification() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Token(String::new())),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let err = auth.login("+15551234567").await.unwrap_err();
        assert!(matches!(err, AuthError::VerificationFailed(_)));
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn valid_stored_token_uses_relay_phone() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-ok");
        let mut relay = FakeRelay::new(Verify::Hang);
        relay.valid_token = Some(("tok-ok".to_string(), "+15559998888".to_string()));
        let auth = Authenticator::new(relay, store, settings());

        let identity = auth.current_identity().await.unwrap().unwrap();
        assert_eq!(identity.phone, "+15559998888");
        assert_eq!(identity.token, "tok-ok");
    }

    #[tokio::test]
    async fn rejected_token_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-stale");
        let auth = Authenticator::new(FakeRelay::new(Verify::Hang), store, settings());

        assert!(auth.current_identity().await.unwrap().is_none());
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn offline_validation_keeps_credentials() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-any");
        let mut relay = FakeRelay::new(Verify::Hang);
        relay.offline = true;
        let auth = Authenticator::new(relay, store, settings());

        let err = auth.current_identity().await.unwrap_err();
        assert!(matches!(err, AuthError::Connection(_)));
        assert!(auth.store().exists());
    }

    #[tokio::test]
    async fn ensure_identity_prompts_after_expiry() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-stale");
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Token("tok-new".to_string())),
            store,
            settings(),
        );

        let identity = auth
            .ensure_identity(|| Ok("+15551234567".to_string()))
            .await
            .unwrap();
        assert_eq!(identity.token, "tok-new");
        assert_eq!(auth.store().load().token.as_deref(), Some("tok-new"));
    }

    #[tokio::test]
    async fn ensure_identity_reports_prompt_failure() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Hang),
            CredentialStore::new(dir.path()),
            settings(),
        );

        let err = auth
            .ensure_identity(|| Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Prompt(_)));
    }

    #[tokio::test]
    async fn logout_revokes_then_deletes() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-1");
        let auth = Authenticator::new(FakeRelay::new(Verify::Hang), store, settings());

        auth.logout().await.unwrap();
        assert_eq!(auth.relay.revoked.lock().unwrap().as_slice(), ["tok-1"]);
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn logout_deletes_even_when_revoke_fails() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        seed(&store, "tok-1");
        let mut relay = FakeRelay::new(Verify::Hang);
        relay.revoke_fails = true;
        let auth = Authenticator::new(relay, store, settings());

        auth.logout().await.unwrap();
        assert!(!auth.store().exists());
    }

    #[tokio::test]
    async fn logout_without_credentials_is_ok() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(
            FakeRelay::new(Verify::Hang),
            CredentialStore::new(dir.path()),
            settings(),
        );
        auth.logout().await.unwrap();
        assert!(auth.relay.revoked.lock().unwrap().is_empty());
    }
}
