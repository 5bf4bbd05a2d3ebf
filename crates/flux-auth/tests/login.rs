// ABOUTME: Login, validation, and logout against the mock relay over gRPC.
// ABOUTME: Uses auto-verification so the code exchange completes without an operator.

use std::time::Duration;

use flux_auth::{AuthSettings, Authenticator, CredentialStore};
use flux_grpc::{AuthInterceptor, ChannelConfig, RelayClient};
use flux_mock::{MockOptions, MockRelay, RelayEvent};
use tempfile::TempDir;

async fn relay_client(options: MockOptions) -> (MockRelay, RelayClient) {
    let relay = MockRelay::new(options);
    let (address, _handle) = relay.clone().spawn_local().await.unwrap();
    let client = RelayClient::connect(&ChannelConfig::new(address), AuthInterceptor::anonymous())
        .await
        .unwrap();
    (relay, client)
}

fn settings() -> AuthSettings {
    AuthSettings {
        open_messages: false,
        verify_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_login_validate_logout_cycle() {
    let (relay, client) = relay_client(MockOptions {
        auto_verify: true,
        ..Default::default()
    })
    .await;
    let home = TempDir::new().unwrap();
    let auth = Authenticator::new(client, CredentialStore::new(home.path()), settings());

    let identity = auth.login("+15551234567").await.unwrap();
    let raw = std::fs::read_to_string(auth.store().path()).unwrap();
    assert!(raw.contains("\"phoneNumber\": \"+15551234567\""));
    assert_eq!(
        relay.state().token_phone(&identity.token).await.as_deref(),
        Some("+15551234567")
    );

    let current = auth.current_identity().await.unwrap().unwrap();
    assert_eq!(current.phone, "+15551234567");

    auth.logout().await.unwrap();
    assert!(!auth.store().exists());
    let revoked = relay
        .state()
        .wait_for(|e| matches!(e, RelayEvent::Revoked { .. }), Duration::from_secs(1))
        .await;
    assert!(revoked.is_some());
}

#[tokio::test]
async fn manual_verification_unblocks_waiting_login() {
    let (relay, client) = relay_client(MockOptions::default()).await;
    let home = TempDir::new().unwrap();
    let auth = Authenticator::new(client, CredentialStore::new(home.path()), settings());

    let state = relay.state();
    let operator = tokio::spawn(async move {
        let issued = state
            .wait_for(|e| matches!(e, RelayEvent::CodeIssued { .. }), Duration::from_secs(5))
            .await;
        if let Some(RelayEvent::CodeIssued { code, .. }) = issued {
            state.verify_code(&code).await;
        }
    });

    let identity = auth.login("15557654321").await.unwrap();
    assert_eq!(identity.phone, "+15557654321");
    operator.await.unwrap();
}

#[tokio::test]
async fn revoked_token_no_longer_validates() {
    let (relay, client) = relay_client(MockOptions::default()).await;
    let home = TempDir::new().unwrap();
    let store = CredentialStore::new(home.path());
    let token = relay.state().issue_token("+15551234567").await;
    store
        .save(&flux_auth::Credentials {
            token: Some(token.clone()),
            phone_number: Some("+15551234567".to_string()),
            issued_at: None,
        })
        .unwrap();
    let auth = Authenticator::new(client, store, settings());

    assert!(auth.current_identity().await.unwrap().is_some());
    assert!(relay.state().token_phone(&token).await.is_some());
    auth.logout().await.unwrap();
    assert!(relay.state().token_phone(&token).await.is_none());
}
