//! Desired-state push over the pub/sub transport.

use std::time::Duration;

use comfortzone_domain::error::TransportError;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::shadow::ShadowDocument;

use crate::ports::{DesiredStatePublisher, Transport};

/// Publishes `{"state":{"desired":{..}}}` on a device's shadow update topic.
pub struct ShadowDesiredState<T> {
    transport: T,
    topic: String,
    timeout: Duration,
}

impl<T: Transport> ShadowDesiredState<T> {
    pub fn new(transport: T, topic: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            topic: topic.into(),
            timeout,
        }
    }
}

impl<T: Transport> DesiredStatePublisher for ShadowDesiredState<T> {
    async fn push(&self, settings: &ComfortSettings) -> Result<(), TransportError> {
        let payload = ShadowDocument::desired(settings)
            .to_bytes()
            .map_err(|err| TransportError::Backend(Box::new(err)))?;
        tokio::time::timeout(self.timeout, self.transport.publish(&self.topic, payload))
            .await
            .map_err(|_| TransportError::Timeout { operation: "publish" })?
    }
}
