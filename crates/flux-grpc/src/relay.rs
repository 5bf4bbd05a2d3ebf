// ABOUTME: Typed wrapper over the generated FluxService client.
// ABOUTME: Every call maps tonic statuses into GrpcClientError and logs at debug level.

use std::future::Future;
use std::pin::Pin;

use flux_proto::client::FluxServiceClient;
use flux_proto::{
    GetDynamicCodeRequest, GetDynamicCodeResponse, OutgoingMessage, RegisterAgentRequest,
    RegisterAgentResponse, RevokeTokenRequest, SendMessageResponse, StreamFrame,
    UnregisterAgentRequest, ValidateTokenRequest, ValidateTokenResponse, WaitingVerifiedRequest,
    WaitingVerifiedResponse, PHONE_METADATA_KEY,
};
use tokio_stream::wrappers::ReceiverStream;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::debug;

use crate::auth::AuthInterceptor;
use crate::channel::{create_channel, ChannelConfig};
use crate::error::GrpcClientError;
use crate::stream::StreamReceiver;

/// Generated client with bearer auth applied.
pub type FluxClient = FluxServiceClient<InterceptedService<Channel, AuthInterceptor>>;

/// Handle to the relay. Cheap to clone; clones share the HTTP/2 connection.
#[derive(Clone)]
pub struct RelayClient {
    inner: FluxClient,
}

impl RelayClient {
    /// Dial the relay and wrap the channel.
    pub async fn connect(
        config: &ChannelConfig,
        auth: AuthInterceptor,
    ) -> Result<Self, GrpcClientError> {
        let channel = create_channel(config).await?;
        Ok(Self::new(channel, auth))
    }

    pub fn new(channel: Channel, auth: AuthInterceptor) -> Self {
        Self {
            inner: FluxServiceClient::with_interceptor(channel, auth),
        }
    }

    pub async fn register_agent(
        &self,
        phone_number: &str,
        token: Option<&str>,
    ) -> Result<RegisterAgentResponse, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .register_agent(RegisterAgentRequest {
                phone_number: phone_number.to_string(),
                token: token.unwrap_or_default().to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("RegisterAgent", s))?;
        debug!(phone = %phone_number, "RegisterAgent answered");
        Ok(response.into_inner())
    }

    /// Returns the relay's success flag.
    pub async fn unregister_agent(&self, phone_number: &str) -> Result<bool, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .unregister_agent(UnregisterAgentRequest {
                phone_number: phone_number.to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("UnregisterAgent", s))?;
        Ok(response.into_inner().success)
    }

    pub async fn send_message(
        &self,
        message: OutgoingMessage,
    ) -> Result<SendMessageResponse, GrpcClientError> {
        let mut client = self.inner.clone();
        let to = message.user_phone_number.clone();
        let response = client
            .send_message(message)
            .await
            .map_err(|s| GrpcClientError::from_status("SendMessage", s))?;
        debug!(to = %to, "SendMessage answered");
        Ok(response.into_inner())
    }

    /// Open the duplex stream for `phone_number`, feeding it from `outbound`.
    pub async fn open_stream(
        &self,
        phone_number: &str,
        outbound: ReceiverStream<StreamFrame>,
    ) -> Result<StreamReceiver<StreamFrame>, GrpcClientError> {
        let phone: MetadataValue<Ascii> = phone_number.parse().map_err(|_| {
            GrpcClientError::InvalidAddress(format!("phone number not usable as metadata: {phone_number}"))
        })?;
        let mut request = tonic::Request::new(outbound);
        request.metadata_mut().insert(PHONE_METADATA_KEY, phone);

        let mut client = self.inner.clone();
        let response = client
            .message_stream(request)
            .await
            .map_err(|s| GrpcClientError::from_status("MessageStream", s))?;
        Ok(StreamReceiver::new(response.into_inner()))
    }

    pub async fn get_dynamic_code(
        &self,
        client_id: &str,
        phone_number: &str,
    ) -> Result<GetDynamicCodeResponse, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .get_dynamic_code(GetDynamicCodeRequest {
                client_id: client_id.to_string(),
                phone_number: phone_number.to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("GetDynamicCode", s))?;
        Ok(response.into_inner())
    }

    /// Long-polls until the relay has seen the verification code.
    pub async fn waiting_verified(
        &self,
        client_id: &str,
    ) -> Result<WaitingVerifiedResponse, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .waiting_verified(WaitingVerifiedRequest {
                client_id: client_id.to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("WaitingVerified", s))?;
        Ok(response.into_inner())
    }

    pub async fn validate_token(
        &self,
        token: &str,
    ) -> Result<ValidateTokenResponse, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .validate_token(ValidateTokenRequest {
                token: token.to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("ValidateToken", s))?;
        Ok(response.into_inner())
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool, GrpcClientError> {
        let mut client = self.inner.clone();
        let response = client
            .revoke_token(RevokeTokenRequest {
                token: token.to_string(),
            })
            .await
            .map_err(|s| GrpcClientError::from_status("RevokeToken", s))?;
        Ok(response.into_inner().success)
    }
}

/// Destination for replies produced by the stream loop.
pub trait MessageSink: Send + Sync + 'static {
    /// Deliver one outbound message. `Ok(false)` means the relay refused it.
    fn deliver<'a>(
        &'a self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<bool, GrpcClientError>> + Send + 'a>>;
}

impl MessageSink for RelayClient {
    fn deliver<'a>(
        &'a self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<bool, GrpcClientError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.send_message(message).await?;
            if let Some(error) = response.error.filter(|_| !response.success) {
                tracing::warn!(error = %error, "Relay refused outbound message");
            }
            Ok(response.success)
        })
    }
}
