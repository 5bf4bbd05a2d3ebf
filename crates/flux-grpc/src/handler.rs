// ABOUTME: Handler trait invoked by the session for every inbound message.
// ABOUTME: A handler returns the reply text, or nothing, and the session relays it.

use std::future::Future;
use std::pin::Pin;

use flux_proto::IncomingMessage;

use crate::error::GrpcClientError;

/// What the session should do after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Send this text back to the sender. Empty text is treated as no reply.
    Reply(String),
    NoReply,
}

impl HandleOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    /// The text to relay, if any.
    pub fn into_reply(self) -> Option<String> {
        match self {
            Self::Reply(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Processes inbound messages for a registered agent.
///
/// Handlers run one message at a time, in arrival order. An `Err` is logged
/// and the stream keeps going; it never tears down the session.
///
/// ```ignore
/// struct Echo;
///
/// impl MessageHandler for Echo {
///     fn on_message<'a>(
///         &'a mut self,
///         msg: &'a IncomingMessage,
///     ) -> Pin<Box<dyn Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'a>> {
///         Box::pin(async move { Ok(HandleOutcome::reply(msg.text.clone())) })
///     }
/// }
/// ```
pub trait MessageHandler: Send + 'static {
    fn on_message<'a>(
        &'a mut self,
        msg: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'a>>;

    /// Called once the relay accepted the registration for `phone`.
    fn on_registered<'a>(&'a mut self, _phone: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }

    /// Called when the stream loop is about to exit.
    fn on_closing<'a>(
        &'a mut self,
        _reason: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }
}

/// Handler built from a closure that receives an owned copy of each message.
pub struct CallbackHandler<F> {
    callback: F,
}

impl<F, Fut> CallbackHandler<F>
where
    F: FnMut(IncomingMessage) -> Fut + Send + 'static,
    Fut: Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F, Fut> MessageHandler for CallbackHandler<F>
where
    F: FnMut(IncomingMessage) -> Fut + Send + 'static,
    Fut: Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'static,
{
    fn on_message<'a>(
        &'a mut self,
        msg: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandleOutcome, GrpcClientError>> + Send + 'a>> {
        Box::pin((self.callback)(msg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(text: &str) -> IncomingMessage {
        IncomingMessage {
            user_phone_number: "+15551230000".to_string(),
            text: text.to_string(),
            message_guid: "m1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_reply_is_not_relayed() {
        assert_eq!(HandleOutcome::reply("").into_reply(), None);
        assert_eq!(HandleOutcome::NoReply.into_reply(), None);
        assert_eq!(HandleOutcome::reply(" ").into_reply(), Some(" ".to_string()));
    }

    #[tokio::test]
    async fn callback_handler_sees_message_text() {
        let mut handler = CallbackHandler::new(|msg: IncomingMessage| async move {
            Ok(HandleOutcome::reply(format!("echo: {}", msg.text)))
        });
        let outcome = handler.on_message(&incoming("hi")).await.unwrap();
        assert_eq!(outcome, HandleOutcome::reply("echo: hi"));
    }

    #[tokio::test]
    async fn callback_handler_propagates_errors() {
        let mut handler = CallbackHandler::new(|_msg: IncomingMessage| async move {
            Err(GrpcClientError::HandlerError("agent crashed".to_string()))
        });
        let err = handler.on_message(&incoming("hi")).await.unwrap_err();
        assert!(matches!(err, GrpcClientError::HandlerError(_)));
    }

    #[tokio::test]
    async fn default_hooks_complete() {
        let mut handler =
            CallbackHandler::new(|_msg: IncomingMessage| async move { Ok(HandleOutcome::NoReply) });
        handler.on_registered("+15551230000").await;
        handler.on_closing(Some("stream closed")).await;
        handler.on_closing(None).await;
    }
}
