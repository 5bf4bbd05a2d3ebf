// ABOUTME: The contract every agent satisfies: one async invoke per inbound message.
// ABOUTME: AgentInput mirrors the object handed to the JavaScript agent's invoke().

use async_trait::async_trait;
use flux_proto::IncomingMessage;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub message: String,
    pub user_phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl From<&IncomingMessage> for AgentInput {
    fn from(msg: &IncomingMessage) -> Self {
        Self {
            message: msg.text.clone(),
            user_phone_number: msg.user_phone_number.clone(),
            image_base64: msg.image_base64.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// A conversational agent.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, input: AgentInput) -> Result<String, AgentError>;
}
