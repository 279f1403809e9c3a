//! Utility wrapper around [tokio::sync::mpsc] channels, enabling multiple
//! producers to send requests to a single serial consumer, with each request
//! able to be responded to by the consumer.
//!
//! Used to funnel concurrent callers through a single-writer task, e.g. the
//! wildcard detector's classification state and the resolver pool's monitor.

use core::fmt;
use tokio::sync::{mpsc, mpsc::error::SendError, oneshot, oneshot::error::RecvError};

/// Error type wrapping the potential channel failures, distinguishing
/// send-side failures from a dropped responder.
#[derive(Debug)]
pub enum ChannelError {
    /// The receiving task has been dropped.
    SendError,
    /// The responder was dropped before a response was sent.
    RecvError,
}

impl std::error::Error for ChannelError {}

impl fmt::Display for ChannelError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::SendError => write!(fmt, "channel send error"),
            ChannelError::RecvError => write!(fmt, "channel receiver error"),
        }
    }
}

impl<Q, S> From<SendError<Message<Q, S>>> for ChannelError {
    fn from(_: SendError<Message<Q, S>>) -> Self {
        ChannelError::SendError
    }
}

impl From<RecvError> for ChannelError {
    fn from(_: RecvError) -> Self {
        ChannelError::RecvError
    }
}

/// A request sent to a [RequestProcessor], paired with a one-shot responder.
pub struct Message<Q, S> {
    /// The request payload.
    pub request: Q,
    sender: oneshot::Sender<S>,
}

impl<Q, S> Message<Q, S> {
    /// Respond to the originator of this request. Returns `false` if the
    /// originator already gave up waiting.
    pub fn respond(self, response: S) -> bool {
        self.sender.send(response).is_ok()
    }
}

/// Sends requests to an associated [RequestProcessor] and awaits its reply.
#[derive(Debug)]
pub struct RequestClient<Q, S> {
    tx: mpsc::UnboundedSender<Message<Q, S>>,
}

impl<Q, S> RequestClient<Q, S> {
    /// Sends `request` and awaits the single response.
    pub async fn send(&self, request: Q) -> Result<S, ChannelError> {
        let (tx, rx) = oneshot::channel();
        let message = Message {
            request,
            sender: tx,
        };
        self.tx.send(message).map_err(ChannelError::from)?;
        rx.await.map_err(ChannelError::from)
    }
}

impl<Q, S> Clone for RequestClient<Q, S> {
    fn clone(&self) -> Self {
        RequestClient {
            tx: self.tx.clone(),
        }
    }
}

/// Receives requests from the associated [RequestClient]. Intended to be
/// pulled from a single consumer task so that the processed state can stay
/// unsynchronized (the serial access pattern).
pub struct RequestProcessor<Q, S> {
    rx: mpsc::UnboundedReceiver<Message<Q, S>>,
}

impl<Q, S> RequestProcessor<Q, S> {
    /// Waits for the next request, or `None` once every [RequestClient] has
    /// been dropped.
    pub async fn recv(&mut self) -> Option<Message<Q, S>> {
        self.rx.recv().await
    }
}

/// Creates a bound pair of [RequestClient] and [RequestProcessor].
pub fn request_channel<Q, S>() -> (RequestClient<Q, S>, RequestProcessor<Q, S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RequestClient { tx }, RequestProcessor { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_response_round_trips() -> Result<(), Box<dyn std::error::Error>> {
        let (client, mut processor) = request_channel::<u32, u32>();

        tokio::spawn(async move {
            while let Some(message) = processor.recv().await {
                let doubled = message.request * 2;
                message.respond(doubled);
            }
        });

        assert_eq!(client.send(21).await?, 42);
        assert_eq!(client.send(2).await?, 4);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_processor_surfaces_send_error() {
        let (client, processor) = request_channel::<u32, u32>();
        drop(processor);
        assert!(matches!(client.send(1).await, Err(ChannelError::SendError)));
    }
}
