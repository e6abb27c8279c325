//! Desired-state port: pushes adopted preferences towards the device.

use std::future::Future;

use comfortzone_domain::error::TransportError;
use comfortzone_domain::settings::ComfortSettings;

/// Publishes a desired-settings document for a device to pick up as a delta.
pub trait DesiredStatePublisher: Send + Sync {
    fn push(
        &self,
        settings: &ComfortSettings,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
