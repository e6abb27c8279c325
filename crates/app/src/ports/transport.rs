//! Transport port: the pub/sub client.
//!
//! Outbound traffic goes through [`Transport`]. Inbound traffic arrives as
//! [`TransportEvent`]s on a channel handed out by the adapter when it
//! connects; the channel closing means the transport is gone for good.

use std::future::Future;

use comfortzone_domain::error::TransportError;

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(InboundMessage),
    /// Connection lost; the adapter is retrying.
    Interrupted { reason: String },
    /// Connection re-established and subscriptions restored.
    Resumed,
}

/// Publishes payloads and tears down the connection.
pub trait Transport: Send + Sync {
    /// Publish with at-least-once delivery. Resolves once the adapter has
    /// accepted the message; callers bound the wait with a timeout.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Orderly disconnect.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).publish(topic, payload)
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).disconnect()
    }
}
