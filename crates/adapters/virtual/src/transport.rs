//! In-memory transport: publishes land in the [`Journal`], inbound events are
//! injected through a [`TransportHandle`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comfortzone_app::ports::{InboundMessage, Transport, TransportEvent};
use comfortzone_domain::error::TransportError;
use tokio::sync::mpsc;

use crate::journal::{Journal, JournalEntry};

#[derive(Debug, Default)]
struct LinkState {
    failing: bool,
    disconnected: bool,
    events: Option<mpsc::Sender<TransportEvent>>,
}

#[derive(Debug, Clone, Default)]
struct Link(Arc<Mutex<LinkState>>);

impl Link {
    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct InMemoryTransport {
    link: Link,
    journal: Journal,
}

impl InMemoryTransport {
    /// Create the transport, its handle, and the inbound event channel.
    ///
    /// The channel stays open while the handle has not called
    /// [`TransportHandle::close`].
    #[must_use]
    pub fn new(
        journal: Journal,
        capacity: usize,
    ) -> (Self, TransportHandle, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let link = Link::default();
        link.lock().events = Some(tx);
        (
            Self {
                link: link.clone(),
                journal,
            },
            TransportHandle { link },
            rx,
        )
    }
}

impl Transport for InMemoryTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        {
            let link = self.link.lock();
            if link.disconnected {
                return Err(TransportError::Closed);
            }
            if link.failing {
                return Err(TransportError::NotConnected);
            }
        }
        self.journal.record(JournalEntry::Published {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut link = self.link.lock();
        link.disconnected = true;
        link.events = None;
        self.journal.record(JournalEntry::Disconnected);
        Ok(())
    }
}

/// Drives an [`InMemoryTransport`] from the outside.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    link: Link,
}

impl TransportHandle {
    /// Make publishes fail (as if the broker were unreachable) until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.link.lock().failing = failing;
    }

    /// Deliver a message on `topic`. Returns `false` once the channel is gone.
    pub async fn deliver(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        self.send(TransportEvent::Message(InboundMessage {
            topic: topic.to_string(),
            payload: payload.into(),
        }))
        .await
    }

    pub async fn interrupt(&self, reason: &str) -> bool {
        self.send(TransportEvent::Interrupted {
            reason: reason.to_string(),
        })
        .await
    }

    pub async fn resume(&self) -> bool {
        self.send(TransportEvent::Resumed).await
    }

    /// Close the event channel for good.
    pub fn close(&self) {
        self.link.lock().events = None;
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.link.lock().disconnected
    }

    async fn send(&self, event: TransportEvent) -> bool {
        let sender = self.link.lock().events.clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }
}
