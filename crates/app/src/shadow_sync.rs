//! Shadow synchronization.
//!
//! [`ShadowSync`] owns the device's [`ComfortSettings`]. The only way to
//! change them is [`ShadowSync::apply_delta`], which validates the whole delta
//! before touching anything and answers with the full merged settings as the
//! acknowledgment to publish.

use comfortzone_domain::reading::SensorReading;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::shadow::{DeltaError, ReportedState, parse_delta};
use comfortzone_domain::telemetry::TelemetryRecord;
use comfortzone_domain::topics::{ShadowTopics, TopicNaming};

/// What an inbound topic means to this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Delta,
    Accepted,
    Other,
}

#[derive(Debug, Clone)]
pub struct ShadowSync {
    settings: ComfortSettings,
    topics: ShadowTopics,
    telemetry_topic: String,
    workspace_id: String,
}

impl ShadowSync {
    pub fn new(
        settings: ComfortSettings,
        naming: &TopicNaming,
        thing_name: &str,
        workspace_id: impl Into<String>,
    ) -> Self {
        let workspace_id = workspace_id.into();
        Self {
            settings,
            topics: naming.shadow_topics(thing_name),
            telemetry_topic: naming.telemetry_topic(&workspace_id),
            workspace_id,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ComfortSettings {
        &self.settings
    }

    #[must_use]
    pub fn topics(&self) -> &ShadowTopics {
        &self.topics
    }

    #[must_use]
    pub fn telemetry_topic(&self) -> &str {
        &self.telemetry_topic
    }

    /// Topics the transport must subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.topics.delta.clone(), self.topics.accepted.clone()]
    }

    /// First snapshot after connecting: settings plus whatever is known.
    ///
    /// Temperature and humidity are left out when the reading is only the
    /// safe default.
    #[must_use]
    pub fn initial_report(
        &self,
        reading: &SensorReading,
        occupied: bool,
        fan_on: bool,
    ) -> ReportedState {
        let mut report = ReportedState::settings(self.settings);
        report.occupied = Some(occupied);
        report.fan_state = Some(fan_on);
        if reading.is_measured() {
            report.temperature = Some(reading.temperature);
            report.humidity = Some(reading.humidity);
            report.sensor_source = Some(reading.source);
        }
        report
    }

    /// Full current settings, used as the delta acknowledgment.
    #[must_use]
    pub fn settings_report(&self) -> ReportedState {
        ReportedState::settings(self.settings)
    }

    /// Merge an inbound delta payload.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError`] for unparsable or invalid payloads; the
    /// settings are left untouched in that case.
    pub fn apply_delta(&mut self, payload: &[u8]) -> Result<ReportedState, DeltaError> {
        let delta = parse_delta(payload)?;
        let changed = self.settings.apply(&delta);
        if changed.is_empty() {
            tracing::debug!("delta carried no new settings");
        } else {
            tracing::info!(
                fields = ?changed,
                preferred_temp = self.settings.preferred_temp,
                temp_threshold = self.settings.temp_threshold,
                "settings updated from delta"
            );
        }
        Ok(self.settings_report())
    }

    /// The reported update and the telemetry record for one cycle.
    #[must_use]
    pub fn telemetry(
        &self,
        reading: &SensorReading,
        occupied: bool,
        fan_on: bool,
    ) -> (ReportedState, TelemetryRecord) {
        (
            ReportedState::observed(reading, occupied, fan_on),
            TelemetryRecord::from_cycle(self.workspace_id.as_str(), reading, occupied, fan_on),
        )
    }

    #[must_use]
    pub fn classify_topic(&self, topic: &str) -> TopicKind {
        if topic == self.topics.delta {
            TopicKind::Delta
        } else if topic == self.topics.accepted {
            TopicKind::Accepted
        } else {
            TopicKind::Other
        }
    }
}
