// ABOUTME: Agent session against the relay: connect, register, stream, reply, disconnect.
// ABOUTME: Inbound frames are acked before the handler runs; handler failures never end the stream.

use std::time::Duration;

use flux_proto::stream_frame::Frame;
use flux_proto::{IncomingMessage, OutgoingMessage, StreamFrame};
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthInterceptor;
use crate::channel::ChannelConfig;
use crate::error::GrpcClientError;
use crate::handler::MessageHandler;
use crate::relay::{MessageSink, RelayClient};
use crate::stream::{OutboundStream, StreamSender};

/// Time the stream loop gets to finish the in-flight message on disconnect.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of a session.
///
/// `Disconnected -> Connecting -> Registered -> Streaming -> Disconnecting -> Disconnected`.
/// Any failure drops back to `Disconnected`; a refused registration drops back to `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Registered,
    Streaming,
    Disconnecting,
}

/// Who the session registers as.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Phone number as entered or stored. Normalized at registration.
    pub phone: String,
    pub token: Option<String>,
}

struct StreamTask {
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), GrpcClientError>>,
}

/// A single agent registration on the relay.
pub struct SessionClient {
    channel: ChannelConfig,
    identity: SessionIdentity,
    state: SessionState,
    relay: Option<RelayClient>,
    registered_phone: Option<String>,
    stream: Option<StreamTask>,
}

/// Strip whitespace and the `(`, `)`, `-` separators people type into phone numbers.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect()
}

/// Build the reply for `msg`, threading the chat id only when the relay sent one.
pub fn reply_to(msg: &IncomingMessage, text: String) -> OutgoingMessage {
    OutgoingMessage {
        user_phone_number: msg.user_phone_number.clone(),
        text,
        chat_guid: (!msg.chat_guid.is_empty()).then(|| msg.chat_guid.clone()),
    }
}

impl SessionClient {
    pub fn new(channel: ChannelConfig, identity: SessionIdentity) -> Self {
        Self {
            channel,
            identity,
            state: SessionState::Disconnected,
            relay: None,
            registered_phone: None,
            stream: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Normalized phone the relay knows this session by, once registered.
    pub fn registered_phone(&self) -> Option<&str> {
        self.registered_phone.as_deref()
    }

    /// Open the transport. Calling it again on a live session does nothing.
    pub async fn connect(&mut self) -> Result<(), GrpcClientError> {
        if self.relay.is_some() {
            return Ok(());
        }
        self.state = SessionState::Connecting;

        let auth = match AuthInterceptor::new(self.identity.token.as_deref())
            .and_then(|auth| auth.with_phone(&normalize_phone(&self.identity.phone)))
        {
            Ok(auth) => auth,
            Err(e) => {
                self.state = SessionState::Disconnected;
                return Err(e);
            }
        };

        match RelayClient::connect(&self.channel, auth).await {
            Ok(relay) => {
                info!(address = %self.channel.address, "Connected to relay");
                self.relay = Some(relay);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Register the agent and start the inbound stream, handing every message to `handler`.
    pub async fn register<H: MessageHandler>(
        &mut self,
        mut handler: H,
    ) -> Result<(), GrpcClientError> {
        let relay = self.relay.clone().ok_or(GrpcClientError::NotConnected)?;
        if self.stream.is_some() {
            return Err(GrpcClientError::AlreadyRegistered);
        }

        let phone = normalize_phone(&self.identity.phone);
        let response = relay
            .register_agent(&phone, self.identity.token.as_deref())
            .await?;
        if !response.success {
            self.state = SessionState::Connecting;
            return Err(GrpcClientError::RegistrationRejected {
                reason: response
                    .error
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }
        self.state = SessionState::Registered;
        self.registered_phone = Some(phone.clone());
        info!(phone = %phone, "Agent registered");

        let OutboundStream { sender, stream } = OutboundStream::default();
        let inbound = match relay.open_stream(&phone, stream).await {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, "Failed to open message stream");
                self.release_registration(&relay).await;
                self.state = SessionState::Connecting;
                return Err(e);
            }
        };

        handler.on_registered(&phone).await;

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_stream(
            inbound,
            sender,
            relay,
            handler,
            shutdown.clone(),
        ));
        self.stream = Some(StreamTask { shutdown, handle });
        self.state = SessionState::Streaming;
        info!("Listening for messages");
        Ok(())
    }

    /// Send a message outside the reply path. Returns the relay's success flag.
    pub async fn send_message(
        &self,
        to: &str,
        text: &str,
        chat_guid: Option<&str>,
    ) -> Result<bool, GrpcClientError> {
        let relay = self.relay.as_ref().ok_or(GrpcClientError::NotConnected)?;
        let message = OutgoingMessage {
            user_phone_number: to.to_string(),
            text: text.to_string(),
            chat_guid: chat_guid.map(str::to_string),
        };
        relay.deliver(message).await
    }

    /// Wait for the stream loop to end on its own and release the session.
    ///
    /// Resolves immediately when no stream is running.
    pub async fn closed(&mut self) -> Result<(), GrpcClientError> {
        let Some(task) = self.stream.as_mut() else {
            return Ok(());
        };
        let result = match (&mut task.handle).await {
            Ok(result) => result,
            Err(e) => Err(GrpcClientError::StreamError(format!("stream task failed: {e}"))),
        };
        self.stream = None;
        if let Err(e) = &result {
            warn!(error = %e, "Message stream ended");
        }
        self.disconnect().await;
        result
    }

    /// Unregister and drop the transport. Safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) {
        let Some(relay) = self.relay.take() else {
            return;
        };
        self.state = SessionState::Disconnecting;

        if let Some(task) = &self.stream {
            task.shutdown.cancel();
        }

        self.release_registration(&relay).await;

        if let Some(mut task) = self.stream.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task.handle)
                .await
                .is_err()
            {
                debug!("Stream loop did not stop in time, aborting");
                task.handle.abort();
            }
        }

        drop(relay);
        self.state = SessionState::Disconnected;
        info!("Disconnected from relay");
    }

    async fn release_registration(&mut self, relay: &RelayClient) {
        let Some(phone) = self.registered_phone.take() else {
            return;
        };
        match relay.unregister_agent(&phone).await {
            Ok(true) => info!(phone = %phone, "Agent unregistered"),
            Ok(false) => warn!(phone = %phone, "Relay did not confirm unregistration"),
            Err(e) => warn!(phone = %phone, error = %e, "Unregister failed"),
        }
    }
}

/// Drive the inbound stream until it ends or `shutdown` fires.
///
/// Returns `Ok(())` only for a requested shutdown. The relay closing the
/// stream yields `StreamClosed`; a transport error is returned as-is.
pub(crate) async fn run_stream<S, K, H>(
    mut inbound: S,
    acks: StreamSender<StreamFrame>,
    sink: K,
    mut handler: H,
    shutdown: CancellationToken,
) -> Result<(), GrpcClientError>
where
    S: Stream<Item = Result<StreamFrame, GrpcClientError>> + Unpin + Send,
    K: MessageSink,
    H: MessageHandler,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                handler.on_closing(Some("disconnect requested")).await;
                return Ok(());
            }
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                if let Err(e) = dispatch_frame(frame, &acks, &sink, &mut handler).await {
                    handler.on_closing(Some(&e.to_string())).await;
                    return Err(e);
                }
            }
            Some(Err(e)) => {
                handler.on_closing(Some(&e.to_string())).await;
                return Err(e);
            }
            None => {
                handler.on_closing(Some("stream closed by relay")).await;
                return Err(GrpcClientError::StreamClosed);
            }
        }
    }
}

async fn dispatch_frame<K, H>(
    frame: StreamFrame,
    acks: &StreamSender<StreamFrame>,
    sink: &K,
    handler: &mut H,
) -> Result<(), GrpcClientError>
where
    K: MessageSink,
    H: MessageHandler,
{
    let msg = match frame.frame {
        Some(Frame::Message(msg)) => msg,
        Some(Frame::Ack(message_guid)) => {
            debug!(message_guid = %message_guid, "Relay acked");
            return Ok(());
        }
        None => {
            warn!("Ignoring empty stream frame");
            return Ok(());
        }
    };

    info!(
        from = %msg.user_phone_number,
        message_guid = %msg.message_guid,
        has_image = msg.image_base64.is_some(),
        "Incoming message"
    );

    // A failed ack means the outbound half is gone.
    acks.send(StreamFrame::ack(msg.message_guid.clone())).await?;

    let outcome = match handler.on_message(&msg).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(message_guid = %msg.message_guid, error = %e, "Handler failed");
            return Ok(());
        }
    };

    let Some(text) = outcome.into_reply() else {
        debug!(message_guid = %msg.message_guid, "Handler produced no reply");
        return Ok(());
    };

    match sink.deliver(reply_to(&msg, text)).await {
        Ok(true) => debug!(to = %msg.user_phone_number, "Reply sent"),
        Ok(false) => warn!(to = %msg.user_phone_number, "Relay rejected reply"),
        Err(e) => warn!(to = %msg.user_phone_number, error = %e, "Reply failed"),
    }
    Ok(())
}
