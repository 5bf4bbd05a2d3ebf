// ABOUTME: Adapts an Agent into the session's MessageHandler.
// ABOUTME: Agent failures turn into a reply so the sender is never left hanging.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use flux_grpc::{GrpcClientError, HandleOutcome, MessageHandler};
use flux_proto::IncomingMessage;
use tracing::{error, info};

use crate::contract::{Agent, AgentInput};
use crate::error::AgentError;

pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your message.";

pub struct AgentHandler {
    agent: Arc<dyn Agent>,
}

impl AgentHandler {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

impl MessageHandler for AgentHandler {
    fn on_message<'a>(
        &'a mut self,
        msg: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'a>> {
        Box::pin(async move {
            info!(from = %msg.user_phone_number, "Invoking agent");
            let reply = match self.agent.invoke(AgentInput::from(msg)).await {
                Ok(text) => text,
                // The user sees why the agent never started
                Err(AgentError::Load(reason)) => {
                    error!(error = %reason, "Agent failed to load");
                    reason
                }
                Err(e) => {
                    error!(error = %e, "Agent invocation failed");
                    FALLBACK_REPLY.to_string()
                }
            };
            Ok(HandleOutcome::Reply(reply))
        })
    }

    fn on_registered<'a>(&'a mut self, phone: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            info!(phone = %phone, "Agent is live");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Behaviour {
        Reply(&'static str),
        Throw,
        FailToLoad(&'static str),
    }

    struct FakeAgent {
        behaviour: Behaviour,
        seen: Mutex<Vec<AgentInput>>,
    }

    #[async_trait]
    impl Agent for FakeAgent {
        async fn invoke(&self, input: AgentInput) -> Result<String, AgentError> {
            self.seen.lock().unwrap().push(input);
            match self.behaviour {
                Behaviour::Reply(text) => Ok(text.to_string()),
                Behaviour::Throw => Err(AgentError::Invoke("boom".to_string())),
                Behaviour::FailToLoad(reason) => Err(AgentError::Load(reason.to_string())),
            }
        }
    }

    fn handler(behaviour: Behaviour) -> (AgentHandler, Arc<FakeAgent>) {
        let agent = Arc::new(FakeAgent {
            behaviour,
            seen: Mutex::new(Vec::new()),
        });
        (AgentHandler::new(agent.clone()), agent)
    }

    fn incoming() -> IncomingMessage {
        IncomingMessage {
            user_phone_number: "+15551234567".to_string(),
            text: "hi".to_string(),
            image_base64: Some("aW1n".to_string()),
            chat_guid: "c1".to_string(),
            message_guid: "m1".to_string(),
        }
    }

    #[tokio::test]
    async fn agent_reply_is_relayed() {
        let (mut handler, agent) = handler(Behaviour::Reply("hello"));
        let outcome = handler.on_message(&incoming()).await.unwrap();
        assert_eq!(outcome, HandleOutcome::reply("hello"));

        let seen = agent.seen.lock().unwrap();
        assert_eq!(seen[0].message, "hi");
        assert_eq!(seen[0].user_phone_number, "+15551234567");
        assert_eq!(seen[0].image_base64.as_deref(), Some("aW1n"));
    }

    #[tokio::test]
    async fn invoke_failure_uses_fallback() {
        let (mut handler, _) = handler(Behaviour::Throw);
        let outcome = handler.on_message(&incoming()).await.unwrap();
        assert_eq!(outcome, HandleOutcome::reply(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn load_failure_is_shown_to_sender() {
        let (mut handler, _) = handler(Behaviour::FailToLoad("Agent must have an `invoke` method"));
        let outcome = handler.on_message(&incoming()).await.unwrap();
        assert_eq!(outcome, HandleOutcome::reply("Agent must have an `invoke` method"));
    }

    #[tokio::test]
    async fn empty_agent_reply_is_not_sent() {
        let (mut handler, _) = handler(Behaviour::Reply(""));
        let outcome = handler.on_message(&incoming()).await.unwrap();
        assert_eq!(outcome.into_reply(), None);
    }
}
