// ABOUTME: Interceptor attaching the agent bearer token and phone to every relay call.
// ABOUTME: Values are parsed once at construction so bad input fails before dialing.

use flux_proto::PHONE_METADATA_KEY;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;

use crate::error::GrpcClientError;

/// Adds `authorization: Bearer <token>` and `x-flux-phone` when known.
#[derive(Clone, Default)]
pub struct AuthInterceptor {
    bearer: Option<MetadataValue<Ascii>>,
    phone: Option<MetadataValue<Ascii>>,
}

impl AuthInterceptor {
    pub fn new(token: Option<&str>) -> Result<Self, GrpcClientError> {
        let bearer = token
            .filter(|t| !t.is_empty())
            .map(|t| {
                format!("Bearer {t}")
                    .parse::<MetadataValue<Ascii>>()
                    .map_err(|_| {
                        GrpcClientError::AuthenticationFailed(
                            "token contains characters not allowed in metadata".to_string(),
                        )
                    })
            })
            .transpose()?;
        Ok(Self {
            bearer,
            phone: None,
        })
    }

    /// Also tag every call with the agent's normalized phone number.
    pub fn with_phone(mut self, phone: &str) -> Result<Self, GrpcClientError> {
        let value = phone.parse::<MetadataValue<Ascii>>().map_err(|_| {
            GrpcClientError::InvalidAddress(format!("phone number not usable as metadata: {phone}"))
        })?;
        self.phone = Some(value);
        Ok(self)
    }

    /// Interceptor for unauthenticated calls such as the login handshake.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut req: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        if let Some(value) = &self.bearer {
            req.metadata_mut().insert("authorization", value.clone());
        }
        if let Some(value) = &self.phone {
            req.metadata_mut().insert(PHONE_METADATA_KEY, value.clone());
        }
        Ok(req)
    }
}
