//! The control loop.
//!
//! A single task owns every piece of mutable state (settings, occupancy,
//! fan state, outbound buffer) and multiplexes three event sources with
//! `tokio::select!`: the stop signal, inbound transport events and a fast
//! ticker. Every `publish_every`-th tick runs a full cycle
//! (sense, decide, actuate, reconcile, publish); the ticks in between only
//! poll occupancy, and run a full cycle straight away when it changes.
//!
//! Whatever ends the loop, [`ControlLoop::run`] drives the fan off, idles the
//! indicator and disconnects the transport before returning.

use std::time::Duration;

use comfortzone_domain::comfort::{ComfortController, Decision, FanChange};
use comfortzone_domain::error::ComfortError;
use comfortzone_domain::occupancy::{OccupancyTracker, OccupancyTransition};
use comfortzone_domain::shadow::ReportedState;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::outbox::{Backoff, Outbox};
use crate::ports::{
    EnvironmentSensor, FanActuator, IndicatorState, InboundMessage, MotionSensor, Notice,
    StatusIndicator, Transport, TransportEvent,
};
use crate::sensor_fusion::SensorFusion;
use crate::shadow_sync::{ShadowSync, TopicKind};

/// What to do after a cycle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Shut down and report the failure.
    #[default]
    Exit,
    /// Make the fan safe, wait, and start over.
    Restart,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Occupancy polling period.
    pub fast_tick: Duration,
    /// Full cycle every this many fast ticks.
    pub publish_every: u32,
    /// Upper bound on one publish (and on the final disconnect).
    pub publish_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Telemetry records kept while the transport is failing.
    pub telemetry_backlog: usize,
    pub failure_policy: FailurePolicy,
    /// Consecutive failed cycles tolerated under [`FailurePolicy::Restart`].
    pub max_restarts: u32,
    pub restart_delay: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fast_tick: Duration::from_secs(2),
            publish_every: 5,
            publish_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(60),
            telemetry_backlog: 32,
            failure_policy: FailurePolicy::Exit,
            max_restarts: 3,
            restart_delay: Duration::from_secs(5),
        }
    }
}

/// Why [`ControlLoop::run`] returned.
#[derive(Debug)]
pub enum LoopExit {
    /// The stop signal fired.
    Stopped,
    /// The transport event channel closed.
    TransportClosed,
    /// A cycle failed and the failure policy gave up.
    Failed(ComfortError),
}

/// Hardware owned by the loop.
pub struct Devices<P, O, M, F, I> {
    pub sensors: SensorFusion<P, O>,
    pub motion: M,
    pub fan: F,
    pub indicator: I,
}

pub struct ControlLoop<P, O, M, F, I, T> {
    devices: Devices<P, O, M, F, I>,
    transport: T,
    shadow: ShadowSync,
    occupancy: OccupancyTracker,
    controller: ComfortController,
    outbox: Outbox,
    config: LoopConfig,
    failures_in_a_row: u32,
}

impl<P, O, M, F, I, T> ControlLoop<P, O, M, F, I, T>
where
    P: EnvironmentSensor,
    O: EnvironmentSensor,
    M: MotionSensor,
    F: FanActuator,
    I: StatusIndicator,
    T: Transport,
{
    pub fn new(
        devices: Devices<P, O, M, F, I>,
        transport: T,
        shadow: ShadowSync,
        occupancy: OccupancyTracker,
        config: LoopConfig,
    ) -> Self {
        let outbox = Outbox::new(
            shadow.topics().update.clone(),
            shadow.telemetry_topic(),
            config.telemetry_backlog,
            Backoff::new(config.backoff_base, config.backoff_max),
        );
        Self {
            devices,
            transport,
            shadow,
            occupancy,
            controller: ComfortController::new(),
            outbox,
            config,
            failures_in_a_row: 0,
        }
    }

    /// Run until stopped, until the transport goes away, or until a failure
    /// the policy does not absorb. The shutdown sequence always runs before
    /// this returns.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> LoopExit {
        let exit = self.supervise(&mut events, &mut stop).await;
        match &exit {
            LoopExit::Stopped => tracing::info!("stop requested, shutting down"),
            LoopExit::TransportClosed => tracing::warn!("transport closed, shutting down"),
            LoopExit::Failed(err) => tracing::error!(error = %err, "control loop failed, shutting down"),
        }
        if !self.shutdown().await {
            tracing::error!("shutdown completed with errors");
        }
        exit
    }

    async fn supervise(
        &mut self,
        events: &mut mpsc::Receiver<TransportEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> LoopExit {
        if let Err(err) = self.start().await {
            return LoopExit::Failed(err);
        }

        loop {
            let err = match self.drive(events, stop).await {
                Ok(exit) => return exit,
                Err(err) => err,
            };
            tracing::error!(error = %err, "control cycle failed");
            if !self.make_safe().await {
                tracing::error!("fan state unknown, not restarting");
                return LoopExit::Failed(err);
            }
            self.failures_in_a_row += 1;

            if self.config.failure_policy == FailurePolicy::Exit
                || self.failures_in_a_row > self.config.max_restarts
            {
                return LoopExit::Failed(err);
            }
            tracing::warn!(
                attempt = self.failures_in_a_row,
                max_restarts = self.config.max_restarts,
                delay_ms = duration_ms(self.config.restart_delay),
                "restarting control loop"
            );
            tokio::select! {
                biased;
                () = stop_requested(stop) => return LoopExit::Stopped,
                () = tokio::time::sleep(self.config.restart_delay) => {}
            }
        }
    }

    /// Put the fan in a known state and publish the initial snapshot.
    async fn start(&mut self) -> Result<(), ComfortError> {
        self.devices.fan.set(false).await?;
        self.controller.confirm();
        self.show(IndicatorState::Idle).await;

        let reading = self.devices.sensors.read().await;
        let report = self.shadow.initial_report(
            &reading,
            self.occupancy.is_occupied(),
            self.controller.fan_on(),
        );
        tracing::info!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            source = %reading.source,
            "publishing initial reported state"
        );
        self.outbox.push_reported(report);
        self.flush().await;
        Ok(())
    }

    async fn drive(
        &mut self,
        events: &mut mpsc::Receiver<TransportEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<LoopExit, ComfortError> {
        let mut ticker = tokio::time::interval(self.config.fast_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let publish_every = u64::from(self.config.publish_every.max(1));
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                biased;
                () = stop_requested(stop) => return Ok(LoopExit::Stopped),
                _ = ticker.tick() => {
                    let full = tick % publish_every == 0;
                    tick = tick.wrapping_add(1);
                    if full {
                        self.full_cycle().await?;
                    } else {
                        self.fast_cycle().await?;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => return Ok(LoopExit::TransportClosed),
                },
            }
        }
    }

    async fn fast_cycle(&mut self) -> Result<(), ComfortError> {
        if self.poll_occupancy().await.is_some() {
            return self.full_cycle().await;
        }
        if self.outbox.has_pending() {
            self.flush().await;
        }
        Ok(())
    }

    async fn full_cycle(&mut self) -> Result<(), ComfortError> {
        self.poll_occupancy().await;
        let reading = self.devices.sensors.read().await;
        let occupied = self.occupancy.is_occupied();

        let decision = self
            .controller
            .step(reading.temperature, self.shadow.settings(), occupied);
        self.actuate(&decision).await?;
        self.show(IndicatorState::for_cycle(decision.status, occupied))
            .await;

        tracing::debug!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            source = %reading.source,
            occupied,
            status = ?decision.status,
            fan_on = decision.fan_on,
            "cycle complete"
        );

        let (reported, record) = self.shadow.telemetry(&reading, occupied, decision.fan_on);
        self.outbox.push_reported(reported);
        self.outbox.push_telemetry(record);
        self.flush().await;

        self.failures_in_a_row = 0;
        Ok(())
    }

    async fn poll_occupancy(&mut self) -> Option<OccupancyTransition> {
        let motion = match self.devices.motion.motion_detected().await {
            Ok(motion) => motion,
            Err(err) => {
                tracing::warn!(error = %err, "motion sensor unavailable, assuming no motion");
                false
            }
        };
        let transition = self
            .occupancy
            .observe(motion, Instant::now().into_std());
        match transition {
            Some(OccupancyTransition::Arrived) => tracing::info!("workspace occupied"),
            Some(OccupancyTransition::Departed) => tracing::info!(
                timeout_secs = self.occupancy.timeout().as_secs(),
                "workspace vacant"
            ),
            None => {}
        }
        transition
    }

    async fn actuate(&mut self, decision: &Decision) -> Result<(), ComfortError> {
        if !self.controller.needs_write() {
            return Ok(());
        }
        if let Err(err) = self.devices.fan.set(decision.fan_on).await {
            self.controller.invalidate();
            return Err(err.into());
        }
        self.controller.confirm();
        let Some(change) = decision.change else {
            tracing::info!(fan_on = decision.fan_on, "fan state re-asserted");
            return Ok(());
        };
        let notice = match change {
            FanChange::TurnedOn => {
                tracing::info!(status = ?decision.status, "fan on");
                Notice::FanOn
            }
            FanChange::TurnedOff => {
                tracing::info!(status = ?decision.status, "fan off");
                Notice::FanOff
            }
        };
        self.notify(notice).await;
        Ok(())
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(message) => self.handle_message(message).await,
            TransportEvent::Interrupted { reason } => {
                tracing::warn!(reason = %reason, "transport interrupted");
            }
            TransportEvent::Resumed => {
                tracing::info!("transport resumed, re-reporting settings");
                self.outbox.push_reported(self.shadow.settings_report());
                self.flush().await;
            }
        }
    }

    async fn handle_message(&mut self, message: InboundMessage) {
        match self.shadow.classify_topic(&message.topic) {
            TopicKind::Delta => match self.shadow.apply_delta(&message.payload) {
                Ok(ack) => {
                    self.outbox.push_reported(ack);
                    self.notify(Notice::SettingsUpdated).await;
                    self.flush().await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding delta");
                    self.notify(Notice::DeltaRejected).await;
                }
            },
            TopicKind::Accepted => {
                tracing::debug!(bytes = message.payload.len(), "shadow update accepted");
            }
            TopicKind::Other => {
                tracing::debug!(topic = %message.topic, "ignoring message on unexpected topic");
            }
        }
    }

    async fn flush(&mut self) {
        self.outbox
            .flush(&self.transport, self.config.publish_timeout, Instant::now())
            .await;
    }

    /// Fan off and indicator idle, keeping the transport up. Returns `false`
    /// when the fan did not acknowledge the off command.
    async fn make_safe(&mut self) -> bool {
        let was_on = self.controller.force_off();
        let confirmed = match self.devices.fan.set(false).await {
            Ok(()) => {
                self.controller.confirm();
                self.outbox.push_reported(ReportedState {
                    fan_state: Some(false),
                    ..ReportedState::default()
                });
                true
            }
            Err(err) => {
                tracing::error!(error = %err, was_on, "failed to switch fan off");
                false
            }
        };
        self.show(IndicatorState::Idle).await;
        confirmed
    }

    /// Fan off, indicator idle, transport disconnected. Each step is
    /// attempted even if an earlier one failed. Returns `true` when all
    /// three succeeded.
    pub async fn shutdown(&mut self) -> bool {
        let mut clean = true;

        self.controller.force_off();
        match self.devices.fan.set(false).await {
            Ok(()) => self.controller.confirm(),
            Err(err) => {
                tracing::error!(error = %err, "shutdown: failed to switch fan off");
                clean = false;
            }
        }

        if let Err(err) = self.devices.indicator.show(IndicatorState::Idle).await {
            tracing::error!(error = %err, "shutdown: failed to clear indicator");
            clean = false;
        }

        match tokio::time::timeout(self.config.publish_timeout, self.transport.disconnect()).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(error = %err, "shutdown: transport disconnect failed");
                clean = false;
            }
            Err(_elapsed) => {
                tracing::error!("shutdown: transport disconnect timed out");
                clean = false;
            }
        }

        clean
    }

    async fn show(&mut self, state: IndicatorState) {
        if let Err(err) = self.devices.indicator.show(state).await {
            tracing::warn!(error = %err, ?state, "indicator update failed");
        }
    }

    async fn notify(&mut self, notice: Notice) {
        if let Err(err) = self.devices.indicator.notify(notice).await {
            tracing::warn!(error = %err, ?notice, "indicator notice failed");
        }
    }
}

/// Resolves once the stop flag is set or its sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
