// ABOUTME: Prost message types for the FluxService wire protocol.
// ABOUTME: Field tags must stay in sync with proto/flux.proto.

/// A message delivered by the relay to a registered agent.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IncomingMessage {
    #[prost(string, tag = "1")]
    pub user_phone_number: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub text: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "3")]
    pub image_base64: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "4")]
    pub chat_guid: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub message_guid: ::prost::alloc::string::String,
}

/// A message the agent asks the relay to deliver.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutgoingMessage {
    #[prost(string, tag = "1")]
    pub user_phone_number: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub text: ::prost::alloc::string::String,
    /// Empty or absent opens a new conversation.
    #[prost(string, optional, tag = "3")]
    pub chat_guid: ::core::option::Option<::prost::alloc::string::String>,
}

/// One frame on the duplex message stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamFrame {
    #[prost(oneof = "stream_frame::Frame", tags = "1, 2")]
    pub frame: ::core::option::Option<stream_frame::Frame>,
}

/// Nested types for [`StreamFrame`].
pub mod stream_frame {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Frame {
        #[prost(message, tag = "1")]
        Message(super::IncomingMessage),
        /// Delivery confirmation carrying a `message_guid`.
        #[prost(string, tag = "2")]
        Ack(::prost::alloc::string::String),
    }
}

impl StreamFrame {
    /// Build an ack frame for the given message id.
    pub fn ack(message_guid: impl Into<String>) -> Self {
        Self {
            frame: Some(stream_frame::Frame::Ack(message_guid.into())),
        }
    }

    /// Build a frame carrying an inbound message.
    pub fn message(message: IncomingMessage) -> Self {
        Self {
            frame: Some(stream_frame::Frame::Message(message)),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterAgentRequest {
    #[prost(string, tag = "1")]
    pub phone_number: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterAgentResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, optional, tag = "2")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnregisterAgentRequest {
    #[prost(string, tag = "1")]
    pub phone_number: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnregisterAgentResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMessageResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, optional, tag = "2")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDynamicCodeRequest {
    #[prost(string, tag = "1")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub phone_number: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDynamicCodeResponse {
    #[prost(string, tag = "1")]
    pub code: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WaitingVerifiedRequest {
    #[prost(string, tag = "1")]
    pub client_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WaitingVerifiedResponse {
    #[prost(string, tag = "1")]
    pub token: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateTokenRequest {
    #[prost(string, tag = "1")]
    pub token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateTokenResponse {
    #[prost(bool, tag = "1")]
    pub valid: bool,
    #[prost(string, tag = "2")]
    pub phone: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RevokeTokenRequest {
    #[prost(string, tag = "1")]
    pub token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RevokeTokenResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}
