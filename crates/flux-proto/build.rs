// ABOUTME: Build script generating the FluxService client and server stubs.
// ABOUTME: Uses tonic-build's manual service builder over hand-written prost messages.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::{input}"))
        .output_type(format!("crate::{output}"))
        .codec_path(CODEC)
        .build()
}

fn main() {
    // Messages live in src/messages.rs and mirror proto/flux.proto
    let service = Service::builder()
        .name("FluxService")
        .package("flux")
        .method(unary(
            "register_agent",
            "RegisterAgent",
            "RegisterAgentRequest",
            "RegisterAgentResponse",
        ))
        .method(unary(
            "unregister_agent",
            "UnregisterAgent",
            "UnregisterAgentRequest",
            "UnregisterAgentResponse",
        ))
        .method(unary(
            "send_message",
            "SendMessage",
            "OutgoingMessage",
            "SendMessageResponse",
        ))
        .method(
            Method::builder()
                .name("message_stream")
                .route_name("MessageStream")
                .input_type("crate::StreamFrame")
                .output_type("crate::StreamFrame")
                .codec_path(CODEC)
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .method(unary(
            "get_dynamic_code",
            "GetDynamicCode",
            "GetDynamicCodeRequest",
            "GetDynamicCodeResponse",
        ))
        .method(unary(
            "waiting_verified",
            "WaitingVerified",
            "WaitingVerifiedRequest",
            "WaitingVerifiedResponse",
        ))
        .method(unary(
            "validate_token",
            "ValidateToken",
            "ValidateTokenRequest",
            "ValidateTokenResponse",
        ))
        .method(unary(
            "revoke_token",
            "RevokeToken",
            "RevokeTokenRequest",
            "RevokeTokenResponse",
        ))
        .build();

    Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
