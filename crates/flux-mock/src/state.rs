// ABOUTME: Shared state behind the mock relay: agents, open streams, login codes, tokens.
// ABOUTME: Every observable action is appended to an event log that tests can await.

use std::collections::HashMap;
use std::time::Duration;

use flux_proto::{IncomingMessage, OutgoingMessage, StreamFrame};
use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tonic::Status;
use tracing::{debug, info};
use uuid::Uuid;

/// Chat id attached to synthetic test messages.
pub const TEST_CHAT_GUID: &str = "test-chat-guid-12345";

const TEST_MESSAGE_TEXT: &str = "Hello from mock server! This is a test message.";

/// Behaviour switches for the mock relay.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Require a token issued by this relay for the registering phone.
    pub require_token: bool,
    /// Verify login codes as soon as the client starts waiting.
    pub auto_verify: bool,
    /// Push a test message this long after an agent opens its stream.
    pub greeting_delay: Option<Duration>,
    /// Refuse every registration with this reason.
    pub reject_registration: Option<String>,
}

/// Something the relay observed or did.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Registered { phone: String },
    Unregistered { phone: String },
    StreamOpened { phone: String },
    StreamClosed { phone: String },
    Delivered { phone: String, message_guid: String },
    Ack { phone: String, message_guid: String },
    Sent(OutgoingMessage),
    CodeIssued { phone: String, code: String },
    Verified { phone: String },
    Revoked { phone: String },
}

type FrameSender = mpsc::Sender<Result<StreamFrame, Status>>;

struct PendingLogin {
    phone: String,
    code: String,
    token: watch::Sender<Option<String>>,
}

pub struct RelayState {
    pub options: MockOptions,
    agents: RwLock<HashMap<String, Option<FrameSender>>>,
    pending: Mutex<HashMap<String, PendingLogin>>,
    tokens: RwLock<HashMap<String, String>>,
    events: Mutex<Vec<RelayEvent>>,
    events_tx: broadcast::Sender<RelayEvent>,
}

impl RelayState {
    pub fn new(options: MockOptions) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            options,
            agents: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            events_tx,
        }
    }

    pub(crate) async fn record(&self, event: RelayEvent) {
        debug!(?event, "Relay event");
        self.events.lock().await.push(event.clone());
        let _ = self.events_tx.send(event);
    }

    /// Everything recorded so far, oldest first.
    pub async fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().await.clone()
    }

    /// Wait until an event matching `pred` has been recorded.
    pub async fn wait_for<F>(&self, pred: F, timeout: Duration) -> Option<RelayEvent>
    where
        F: Fn(&RelayEvent) -> bool,
    {
        let mut rx = self.events_tx.subscribe();
        if let Some(found) = self.events().await.into_iter().find(|e| pred(e)) {
            return Some(found);
        }
        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return Some(event),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    pub async fn registered_agents(&self) -> Vec<String> {
        let mut phones: Vec<_> = self.agents.read().await.keys().cloned().collect();
        phones.sort();
        phones
    }

    pub(crate) async fn register(&self, phone: &str) {
        self.agents.write().await.insert(phone.to_string(), None);
        info!(phone = %phone, "Agent registered");
        self.record(RelayEvent::Registered {
            phone: phone.to_string(),
        })
        .await;
    }

    /// Drop the agent and its stream. Returns whether it was registered.
    pub(crate) async fn unregister(&self, phone: &str) -> bool {
        let removed = self.agents.write().await.remove(phone).is_some();
        if removed {
            info!(phone = %phone, "Agent unregistered");
            self.record(RelayEvent::Unregistered {
                phone: phone.to_string(),
            })
            .await;
        }
        removed
    }

    /// Attach the outbound half of an agent's stream. Fails for unknown agents.
    pub(crate) async fn attach_stream(&self, phone: &str, tx: FrameSender) -> Result<(), Status> {
        let mut agents = self.agents.write().await;
        let slot = agents
            .get_mut(phone)
            .ok_or_else(|| Status::failed_precondition(format!("agent not registered: {phone}")))?;
        *slot = Some(tx);
        drop(agents);
        self.record(RelayEvent::StreamOpened {
            phone: phone.to_string(),
        })
        .await;
        Ok(())
    }

    pub(crate) async fn detach_stream(&self, phone: &str) {
        if let Some(slot) = self.agents.write().await.get_mut(phone) {
            *slot = None;
        }
        self.record(RelayEvent::StreamClosed {
            phone: phone.to_string(),
        })
        .await;
    }

    /// End the relay side of an agent's stream without unregistering it.
    pub async fn close_stream(&self, phone: &str) -> bool {
        match self.agents.write().await.get_mut(phone) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Push `message` down the agent's stream.
    pub async fn deliver(&self, phone: &str, message: IncomingMessage) -> Result<(), Status> {
        let tx = self
            .agents
            .read()
            .await
            .get(phone)
            .cloned()
            .flatten()
            .ok_or_else(|| Status::not_found(format!("no open stream for {phone}")))?;
        let message_guid = message.message_guid.clone();
        tx.send(Ok(StreamFrame::message(message)))
            .await
            .map_err(|_| Status::unavailable("agent stream closed"))?;
        self.record(RelayEvent::Delivered {
            phone: phone.to_string(),
            message_guid,
        })
        .await;
        Ok(())
    }

    /// Deliver the canned test message to `phone`.
    pub async fn send_test_message(&self, phone: &str) -> Result<String, Status> {
        let message = test_message(phone, TEST_MESSAGE_TEXT);
        let guid = message.message_guid.clone();
        self.deliver(phone, message).await?;
        Ok(guid)
    }

    pub(crate) async fn issue_code(&self, client_id: &str, phone: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let (token, _) = watch::channel(None);
        self.pending.lock().await.insert(
            client_id.to_string(),
            PendingLogin {
                phone: phone.to_string(),
                code: code.clone(),
                token,
            },
        );
        self.record(RelayEvent::CodeIssued {
            phone: phone.to_string(),
            code: code.clone(),
        })
        .await;
        code
    }

    /// Mark the login owning `code` as verified. Returns the phone it belonged to.
    pub async fn verify_code(&self, code: &str) -> Option<String> {
        let phone = {
            let pending = self.pending.lock().await;
            let login = pending.values().find(|p| p.code == code)?;
            if login.token.borrow().is_some() {
                return Some(login.phone.clone());
            }
            let token = Uuid::new_v4().simple().to_string();
            self.tokens
                .write()
                .await
                .insert(token.clone(), login.phone.clone());
            login.token.send_replace(Some(token));
            login.phone.clone()
        };
        info!(phone = %phone, "Login verified");
        self.record(RelayEvent::Verified {
            phone: phone.clone(),
        })
        .await;
        Some(phone)
    }

    /// Block until the login for `client_id` is verified and return its token.
    pub(crate) async fn await_verification(&self, client_id: &str) -> Result<String, Status> {
        let (mut rx, code) = {
            let pending = self.pending.lock().await;
            let login = pending
                .get(client_id)
                .ok_or_else(|| Status::not_found("unknown client id"))?;
            (login.token.subscribe(), login.code.clone())
        };
        if self.options.auto_verify {
            self.verify_code(&code).await;
        }
        let token = rx
            .wait_for(|t| t.is_some())
            .await
            .map_err(|_| Status::aborted("login abandoned"))?
            .clone()
            .unwrap_or_default();
        self.pending.lock().await.remove(client_id);
        Ok(token)
    }

    /// Mint a token for `phone` directly, skipping the code exchange.
    pub async fn issue_token(&self, phone: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), phone.to_string());
        token
    }

    pub async fn token_phone(&self, token: &str) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }

    pub(crate) async fn revoke(&self, token: &str) -> bool {
        let phone = self.tokens.write().await.remove(token);
        match phone {
            Some(phone) => {
                self.record(RelayEvent::Revoked { phone }).await;
                true
            }
            None => false,
        }
    }
}

/// A synthetic inbound message as if `phone` texted its own agent.
pub fn test_message(phone: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        user_phone_number: phone.to_string(),
        text: text.to_string(),
        image_base64: None,
        chat_guid: TEST_CHAT_GUID.to_string(),
        message_guid: format!("msg-{}", Uuid::new_v4().simple()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_unregister_are_logged() {
        let state = RelayState::new(MockOptions::default());
        state.register("+15551234567").await;
        assert_eq!(state.registered_agents().await, vec!["+15551234567"]);
        assert!(state.unregister("+15551234567").await);
        assert!(!state.unregister("+15551234567").await);

        assert_eq!(
            state.events().await,
            vec![
                RelayEvent::Registered {
                    phone: "+15551234567".to_string()
                },
                RelayEvent::Unregistered {
                    phone: "+15551234567".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn deliver_without_stream_fails() {
        let state = RelayState::new(MockOptions::default());
        state.register("+15551234567").await;
        let err = state
            .deliver("+15551234567", test_message("+15551234567", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn attach_requires_registration() {
        let state = RelayState::new(MockOptions::default());
        let (tx, _rx) = mpsc::channel(1);
        let err = state.attach_stream("+15551234567", tx).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn verified_code_releases_waiter_with_token() {
        let state = std::sync::Arc::new(RelayState::new(MockOptions::default()));
        let code = state.issue_code("client-1", "+15551234567").await;
        assert_eq!(code.len(), 6);

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.await_verification("client-1").await })
        };
        assert_eq!(state.verify_code(&code).await.as_deref(), Some("+15551234567"));

        let token = waiter.await.unwrap().unwrap();
        assert_eq!(state.token_phone(&token).await.as_deref(), Some("+15551234567"));
        assert!(state.verify_code("nope").await.is_none());
    }

    #[tokio::test]
    async fn auto_verify_completes_immediately() {
        let state = RelayState::new(MockOptions {
            auto_verify: true,
            ..Default::default()
        });
        state.issue_code("client-1", "+15551234567").await;
        let token = state.await_verification("client-1").await.unwrap();
        assert!(state.revoke(&token).await);
        assert!(state.token_phone(&token).await.is_none());
    }

    #[tokio::test]
    async fn wait_for_sees_past_and_future_events() {
        let state = std::sync::Arc::new(RelayState::new(MockOptions::default()));
        state.register("+1").await;
        let past = state
            .wait_for(|e| matches!(e, RelayEvent::Registered { .. }), Duration::from_millis(10))
            .await;
        assert!(past.is_some());

        let later = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .wait_for(
                        |e| matches!(e, RelayEvent::Unregistered { .. }),
                        Duration::from_secs(2),
                    )
                    .await
            })
        };
        tokio::task::yield_now().await;
        state.unregister("+1").await;
        assert!(later.await.unwrap().is_some());
    }
}
