//! Outbound buffer with retry backoff.
//!
//! Holds at most one pending reported update, into which newer updates are
//! merged, and a bounded FIFO of telemetry records that drops its oldest
//! entry when full. Flushing sends the reported update first, then telemetry
//! oldest-first, and stops at the first failure.

use std::collections::VecDeque;
use std::time::Duration;

use comfortzone_domain::error::TransportError;
use comfortzone_domain::shadow::{ReportedState, ShadowDocument};
use comfortzone_domain::telemetry::TelemetryRecord;
use tokio::time::Instant;

use crate::ports::Transport;

/// Exponential retry delay: `base * 2^(failures - 1)`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    next_attempt: Option<Instant>,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
            next_attempt: None,
        }
    }

    /// Whether an attempt is allowed at `now`.
    #[must_use]
    pub fn ready(&self, now: Instant) -> bool {
        self.next_attempt.is_none_or(|at| now >= at)
    }

    /// Register a failure and return the delay before the next attempt.
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = 2_u32.saturating_pow(self.failures - 1);
        let delay = self.base.saturating_mul(factor).min(self.max);
        self.next_attempt = Some(now + delay);
        delay
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.next_attempt = None;
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Result of one [`Outbox::flush`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued.
    Empty,
    /// Still backing off from an earlier failure; nothing attempted.
    Deferred,
    /// Everything queued was sent.
    Flushed { sent: usize },
    /// A publish failed; the rest stays queued.
    Failed { sent: usize, retry_in: Duration },
}

#[derive(Debug)]
pub struct Outbox {
    reported_topic: String,
    telemetry_topic: String,
    pending_reported: Option<ReportedState>,
    telemetry: VecDeque<TelemetryRecord>,
    capacity: usize,
    backoff: Backoff,
}

impl Outbox {
    /// `capacity` bounds the telemetry backlog; it is at least one.
    pub fn new(
        reported_topic: impl Into<String>,
        telemetry_topic: impl Into<String>,
        capacity: usize,
        backoff: Backoff,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            reported_topic: reported_topic.into(),
            telemetry_topic: telemetry_topic.into(),
            pending_reported: None,
            telemetry: VecDeque::with_capacity(capacity),
            capacity,
            backoff,
        }
    }

    /// Queue a reported update, merged over any update still pending.
    pub fn push_reported(&mut self, update: ReportedState) {
        match self.pending_reported.as_mut() {
            Some(pending) => pending.merge(update),
            None => self.pending_reported = Some(update),
        }
    }

    /// Queue a telemetry record. Returns the record dropped to make room, if
    /// the backlog was full.
    pub fn push_telemetry(&mut self, record: TelemetryRecord) -> Option<TelemetryRecord> {
        let dropped = if self.telemetry.len() >= self.capacity {
            self.telemetry.pop_front()
        } else {
            None
        };
        if let Some(old) = &dropped {
            tracing::warn!(
                timestamp = %old.timestamp,
                backlog = self.capacity,
                "telemetry backlog full, dropping oldest sample"
            );
        }
        self.telemetry.push_back(record);
        dropped
    }

    #[must_use]
    pub fn pending_telemetry(&self) -> usize {
        self.telemetry.len()
    }

    #[must_use]
    pub fn pending_reported(&self) -> Option<&ReportedState> {
        self.pending_reported.as_ref()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_reported.is_some() || !self.telemetry.is_empty()
    }

    /// Send what is queued, each publish bounded by `timeout`.
    pub async fn flush<T: Transport>(
        &mut self,
        transport: &T,
        timeout: Duration,
        now: Instant,
    ) -> FlushOutcome {
        if !self.has_pending() {
            return FlushOutcome::Empty;
        }
        if !self.backoff.ready(now) {
            return FlushOutcome::Deferred;
        }

        let mut sent = 0;

        let encoded = self
            .pending_reported
            .as_ref()
            .map(|pending| ShadowDocument::reported(pending).to_bytes());
        if let Some(encoded) = encoded {
            match encoded {
                Ok(payload) => {
                    if let Err(err) =
                        publish_bounded(transport, &self.reported_topic, payload, timeout).await
                    {
                        return self.fail(sent, &err, now);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "dropping unserializable reported update");
                }
            }
            self.pending_reported = None;
            sent += 1;
        }

        while let Some(encoded) = self.telemetry.front().map(serde_json::to_vec) {
            match encoded {
                Ok(payload) => {
                    if let Err(err) =
                        publish_bounded(transport, &self.telemetry_topic, payload, timeout).await
                    {
                        return self.fail(sent, &err, now);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "dropping unserializable telemetry record");
                }
            }
            self.telemetry.pop_front();
            sent += 1;
        }

        if self.backoff.failures() > 0 {
            tracing::info!(sent, "outbound backlog delivered after retry");
        }
        self.backoff.reset();
        FlushOutcome::Flushed { sent }
    }

    fn fail(&mut self, sent: usize, err: &TransportError, now: Instant) -> FlushOutcome {
        let retry_in = self.backoff.record_failure(now);
        tracing::warn!(
            error = %err,
            attempt = self.backoff.failures(),
            retry_in_ms = u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
            pending_telemetry = self.telemetry.len(),
            "publish failed, will retry"
        );
        FlushOutcome::Failed { sent, retry_in }
    }
}

async fn publish_bounded<T: Transport>(
    transport: &T,
    topic: &str,
    payload: Vec<u8>,
    timeout: Duration,
) -> Result<(), TransportError> {
    match tokio::time::timeout(timeout, transport.publish(topic, payload)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(TransportError::Timeout {
            operation: "publish",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use comfortzone_domain::settings::ComfortSettings;
    use comfortzone_domain::time::parse_iso8601;
    use serde_json::Value;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        published: Mutex<Vec<(String, Value)>>,
        failing: AtomicBool,
        hang: AtomicBool,
    }

    impl RecordingTransport {
        fn published(&self) -> Vec<(String, Value)> {
            self.published.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::NotConnected);
            }
            let value: Value = serde_json::from_slice(&payload).unwrap();
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), value));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn outbox(capacity: usize) -> Outbox {
        Outbox::new(
            "shadow/update",
            "pczs/w/telemetry",
            capacity,
            Backoff::new(Duration::from_secs(2), Duration::from_secs(30)),
        )
    }

    fn record(second: u32) -> TelemetryRecord {
        TelemetryRecord {
            workspace_id: "w".to_string(),
            timestamp: parse_iso8601(&format!("2025-03-01T08:00:{second:02}Z")).unwrap(),
            temperature: 22.0,
            humidity: 40.0,
            occupied: true,
            fan_state: false,
        }
    }

    #[test]
    fn should_grow_delay_exponentially_up_to_cap() {
        let now = Instant::now();
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30));
        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.record_failure(now).as_secs())
            .collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 30, 30]);
        assert!(!backoff.ready(now));
        assert!(backoff.ready(now + Duration::from_secs(30)));
        backoff.reset();
        assert!(backoff.ready(now));
    }

    #[test]
    fn should_drop_oldest_telemetry_when_backlog_full() {
        let mut outbox = outbox(2);
        assert!(outbox.push_telemetry(record(1)).is_none());
        assert!(outbox.push_telemetry(record(2)).is_none());

        let dropped = outbox.push_telemetry(record(3));

        assert_eq!(dropped, Some(record(1)));
        assert_eq!(outbox.pending_telemetry(), 2);
    }

    #[test]
    fn should_merge_reported_updates_instead_of_dropping_them() {
        let mut outbox = outbox(2);
        outbox.push_reported(ReportedState::settings(ComfortSettings::default()));
        outbox.push_reported(ReportedState {
            fan_state: Some(true),
            ..ReportedState::default()
        });

        let pending = outbox.pending_reported().unwrap();
        assert_eq!(pending.settings, Some(ComfortSettings::default()));
        assert_eq!(pending.fan_state, Some(true));
    }

    #[tokio::test]
    async fn should_send_reported_before_telemetry_in_order() {
        let transport = RecordingTransport::default();
        let mut outbox = outbox(4);
        outbox.push_telemetry(record(1));
        outbox.push_telemetry(record(2));
        outbox.push_reported(ReportedState {
            occupied: Some(true),
            ..ReportedState::default()
        });

        let outcome = outbox.flush(&transport, TIMEOUT, Instant::now()).await;

        assert_eq!(outcome, FlushOutcome::Flushed { sent: 3 });
        let published = transport.published();
        assert_eq!(published[0].0, "shadow/update");
        assert_eq!(published[0].1["state"]["reported"]["occupied"], true);
        assert_eq!(published[1].0, "pczs/w/telemetry");
        assert!(
            published[1].1["timestamp"]
                .as_str()
                .unwrap()
                .starts_with("2025-03-01T08:00:01")
        );
        assert!(!outbox.has_pending());
    }

    #[tokio::test]
    async fn should_keep_everything_and_back_off_when_publish_fails() {
        let transport = RecordingTransport::default();
        transport.failing.store(true, Ordering::SeqCst);
        let mut outbox = outbox(4);
        outbox.push_reported(ReportedState::settings(ComfortSettings::default()));
        outbox.push_telemetry(record(1));
        let now = Instant::now();

        let outcome = outbox.flush(&transport, TIMEOUT, now).await;

        assert_eq!(
            outcome,
            FlushOutcome::Failed {
                sent: 0,
                retry_in: Duration::from_secs(2)
            }
        );
        assert!(outbox.pending_reported().is_some());
        assert_eq!(outbox.pending_telemetry(), 1);

        assert_eq!(
            outbox.flush(&transport, TIMEOUT, now + Duration::from_secs(1)).await,
            FlushOutcome::Deferred
        );

        transport.failing.store(false, Ordering::SeqCst);
        let outcome = outbox
            .flush(&transport, TIMEOUT, now + Duration::from_secs(2))
            .await;
        assert_eq!(outcome, FlushOutcome::Flushed { sent: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn should_treat_unacknowledged_publish_as_failure() {
        let transport = RecordingTransport::default();
        transport.hang.store(true, Ordering::SeqCst);
        let mut outbox = outbox(4);
        outbox.push_telemetry(record(1));

        let outcome = outbox.flush(&transport, TIMEOUT, Instant::now()).await;

        assert!(matches!(outcome, FlushOutcome::Failed { sent: 0, .. }));
        assert_eq!(outbox.pending_telemetry(), 1);
    }

    #[tokio::test]
    async fn should_report_empty_when_nothing_queued() {
        let transport = RecordingTransport::default();
        let mut outbox = outbox(1);
        assert_eq!(
            outbox.flush(&transport, TIMEOUT, Instant::now()).await,
            FlushOutcome::Empty
        );
    }
}
