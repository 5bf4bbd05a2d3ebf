// ABOUTME: FluxService gRPC implementation for the mock relay.
// ABOUTME: Registration, message stream, outbound sends, and the login token exchange.

use std::sync::Arc;

use flux_proto::server::FluxService;
use flux_proto::stream_frame::Frame;
use flux_proto::{
    GetDynamicCodeRequest, GetDynamicCodeResponse, OutgoingMessage, RegisterAgentRequest,
    RegisterAgentResponse, RevokeTokenRequest, RevokeTokenResponse, SendMessageResponse,
    StreamFrame, UnregisterAgentRequest, UnregisterAgentResponse, ValidateTokenRequest,
    ValidateTokenResponse, WaitingVerifiedRequest, WaitingVerifiedResponse, PHONE_METADATA_KEY,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use crate::state::{MockOptions, RelayEvent, RelayState};

/// Mock relay service. Clones share state.
#[derive(Clone)]
pub struct MockRelay {
    state: Arc<RelayState>,
}

impl MockRelay {
    pub fn new(options: MockOptions) -> Self {
        Self {
            state: Arc::new(RelayState::new(options)),
        }
    }

    pub fn state(&self) -> Arc<RelayState> {
        self.state.clone()
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new(MockOptions::default())
    }
}

#[tonic::async_trait]
impl FluxService for MockRelay {
    type MessageStreamStream = ReceiverStream<Result<StreamFrame, Status>>;

    async fn register_agent(
        &self,
        request: Request<RegisterAgentRequest>,
    ) -> Result<Response<RegisterAgentResponse>, Status> {
        let req = request.into_inner();
        if req.phone_number.is_empty() {
            return Err(Status::invalid_argument("phone number required"));
        }

        if let Some(reason) = &self.state.options.reject_registration {
            warn!(phone = %req.phone_number, reason = %reason, "Rejecting registration");
            return Ok(Response::new(RegisterAgentResponse {
                success: false,
                error: Some(reason.clone()),
            }));
        }

        if self.state.options.require_token {
            let owner = self.state.token_phone(&req.token).await;
            if owner.as_deref() != Some(req.phone_number.as_str()) {
                return Err(Status::unauthenticated("invalid token for phone number"));
            }
        }

        self.state.register(&req.phone_number).await;
        Ok(Response::new(RegisterAgentResponse {
            success: true,
            error: None,
        }))
    }

    async fn unregister_agent(
        &self,
        request: Request<UnregisterAgentRequest>,
    ) -> Result<Response<UnregisterAgentResponse>, Status> {
        let req = request.into_inner();
        let success = self.state.unregister(&req.phone_number).await;
        Ok(Response::new(UnregisterAgentResponse { success }))
    }

    async fn send_message(
        &self,
        request: Request<OutgoingMessage>,
    ) -> Result<Response<SendMessageResponse>, Status> {
        let message = request.into_inner();
        if message.user_phone_number.is_empty() {
            return Ok(Response::new(SendMessageResponse {
                success: false,
                error: Some("missing recipient".to_string()),
            }));
        }

        info!(
            to = %message.user_phone_number,
            chat_guid = message.chat_guid.as_deref().unwrap_or("new chat"),
            text = %message.text,
            "Outgoing message"
        );
        self.state.record(RelayEvent::Sent(message)).await;
        Ok(Response::new(SendMessageResponse {
            success: true,
            error: None,
        }))
    }

    async fn message_stream(
        &self,
        request: Request<Streaming<StreamFrame>>,
    ) -> Result<Response<Self::MessageStreamStream>, Status> {
        let phone = request
            .metadata()
            .get(PHONE_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Status::invalid_argument("missing phone metadata"))?;
        let mut inbound = request.into_inner();

        let (tx, rx) = mpsc::channel(32);
        self.state.attach_stream(&phone, tx).await?;
        info!(phone = %phone, "Agent stream opened");

        let state = self.state.clone();
        let stream_phone = phone.clone();
        tokio::spawn(async move {
            while let Some(result) = inbound.next().await {
                match result {
                    Ok(StreamFrame {
                        frame: Some(Frame::Ack(message_guid)),
                    }) => {
                        debug!(phone = %stream_phone, message_guid = %message_guid, "Ack received");
                        state
                            .record(RelayEvent::Ack {
                                phone: stream_phone.clone(),
                                message_guid,
                            })
                            .await;
                    }
                    Ok(_) => debug!(phone = %stream_phone, "Ignoring non-ack frame from agent"),
                    Err(e) => {
                        warn!(phone = %stream_phone, error = %e, "Agent stream error");
                        break;
                    }
                }
            }
            info!(phone = %stream_phone, "Agent stream closed");
            state.detach_stream(&stream_phone).await;
        });

        if let Some(delay) = self.state.options.greeting_delay {
            let state = self.state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                info!(phone = %phone, "Sending test message");
                if let Err(e) = state.send_test_message(&phone).await {
                    warn!(phone = %phone, error = %e, "Test message not delivered");
                }
            });
        }

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn get_dynamic_code(
        &self,
        request: Request<GetDynamicCodeRequest>,
    ) -> Result<Response<GetDynamicCodeResponse>, Status> {
        let req = request.into_inner();
        if req.client_id.is_empty() || req.phone_number.is_empty() {
            return Ok(Response::new(GetDynamicCodeResponse {
                code: String::new(),
                error: Some("client id and phone number are required".to_string()),
            }));
        }
        let code = self.state.issue_code(&req.client_id, &req.phone_number).await;
        info!(phone = %req.phone_number, code = %code, "Issued verification code");
        Ok(Response::new(GetDynamicCodeResponse { code, error: None }))
    }

    async fn waiting_verified(
        &self,
        request: Request<WaitingVerifiedRequest>,
    ) -> Result<Response<WaitingVerifiedResponse>, Status> {
        let req = request.into_inner();
        let token = self.state.await_verification(&req.client_id).await?;
        Ok(Response::new(WaitingVerifiedResponse { token, error: None }))
    }

    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let req = request.into_inner();
        let phone = self.state.token_phone(&req.token).await;
        Ok(Response::new(ValidateTokenResponse {
            valid: phone.is_some(),
            phone: phone.unwrap_or_default(),
        }))
    }

    async fn revoke_token(
        &self,
        request: Request<RevokeTokenRequest>,
    ) -> Result<Response<RevokeTokenResponse>, Status> {
        let req = request.into_inner();
        let success = self.state.revoke(&req.token).await;
        Ok(Response::new(RevokeTokenResponse { success }))
    }
}
