// ABOUTME: Typed wrappers around the duplex message stream.
// ABOUTME: Outbound frames go through an mpsc channel; inbound frames come from tonic Streaming.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Streaming;

use crate::error::GrpcClientError;

/// Buffer size for outbound frame channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sending half of the stream. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct StreamSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> StreamSender<T> {
    pub fn new(sender: mpsc::Sender<T>) -> Self {
        Self { inner: sender }
    }

    /// Queue a frame. Fails with `StreamClosed` once the relay side is gone.
    pub async fn send(&self, msg: T) -> Result<(), GrpcClientError> {
        self.inner
            .send(msg)
            .await
            .map_err(|_| GrpcClientError::StreamClosed)
    }
}

/// Receiving half of the stream.
pub struct StreamReceiver<T> {
    inner: Streaming<T>,
}

impl<T> StreamReceiver<T> {
    pub fn new(streaming: Streaming<T>) -> Self {
        Self { inner: streaming }
    }
}

impl<T> Stream for StreamReceiver<T> {
    type Item = Result<T, GrpcClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|opt| opt.map(|res| res.map_err(|e| GrpcClientError::StreamError(e.to_string()))))
    }
}

/// Sender plus the request stream handed to the streaming RPC.
pub struct OutboundStream<T> {
    pub sender: StreamSender<T>,
    pub stream: ReceiverStream<T>,
}

impl<T> OutboundStream<T> {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            sender: StreamSender::new(tx),
            stream: ReceiverStream::new(rx),
        }
    }
}

impl<T> Default for OutboundStream<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_BUFFER)
    }
}
