//! End-to-end tests for the edge agent.
//!
//! Each test wires the real control loop to the virtual hardware rig and the
//! in-memory transport, then drives it on tokio's paused clock. No broker is
//! involved.

use std::time::Duration;

use comfortzone_adapter_virtual::{
    InMemoryTransport, Journal, JournalEntry, RigHandles, Room, TransportHandle, VirtualRig,
};
use comfortzone_app::control_loop::{ControlLoop, FailurePolicy, LoopConfig, LoopExit};
use comfortzone_app::ports::IndicatorState;
use comfortzone_app::sensor_fusion::FusionConfig;
use comfortzone_app::shadow_sync::ShadowSync;
use comfortzone_domain::occupancy::OccupancyTracker;
use comfortzone_domain::reading::Climate;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::time::parse_iso8601;
use comfortzone_domain::topics::TopicNaming;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const UPDATE_TOPIC: &str = "$aws/things/desk-42/shadow/update";
const DELTA_TOPIC: &str = "$aws/things/desk-42/shadow/update/delta";
const TELEMETRY_TOPIC: &str = "pczs/ws-7/telemetry";

struct Agent {
    hardware: RigHandles,
    broker: TransportHandle,
    stop: watch::Sender<bool>,
    task: JoinHandle<LoopExit>,
}

impl Agent {
    fn start(room: Room, config: LoopConfig) -> Self {
        let journal = Journal::new();
        let (rig, hardware) = VirtualRig::new(room, &journal);
        let devices = rig.into_devices(FusionConfig::default(), true, true);
        let (transport, broker, events) = InMemoryTransport::new(journal, 16);
        let shadow = ShadowSync::new(
            ComfortSettings::default(),
            &TopicNaming::default(),
            "desk-42",
            "ws-7",
        );
        let control = ControlLoop::new(
            devices,
            transport,
            shadow,
            OccupancyTracker::new(Duration::from_secs(300)),
            config,
        );
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(control.run(events, stop_rx));
        Self {
            hardware,
            broker,
            stop,
            task,
        }
    }

    fn journal(&self) -> &Journal {
        &self.hardware.journal
    }

    fn published(&self, topic: &str) -> Vec<Value> {
        self.journal()
            .published_on(topic)
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    async fn stop(self) -> LoopExit {
        self.stop.send_replace(true);
        self.task.await.unwrap()
    }
}

fn hot_occupied_room() -> Room {
    Room {
        climate: Climate {
            temperature: 26.0,
            humidity: 40.0,
        },
        occupied: true,
        ..Room::default()
    }
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[tokio::test(start_paused = true)]
async fn should_publish_initial_snapshot_with_settings_and_reading() {
    let agent = Agent::start(Room::default(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;

    let updates = agent.published(UPDATE_TOPIC);
    assert_eq!(
        updates[0],
        json!({"state": {"reported": {
            "preferred_temp": 23.0,
            "temp_threshold": 1.0,
            "preferred_humidity": 50.0,
            "humidity_threshold": 10.0,
            "temperature": 22.0,
            "humidity": 45.0,
            "sensor_source": "precision",
            "occupied": false,
            "fan_state": false,
        }}})
    );

    assert!(matches!(agent.stop().await, LoopExit::Stopped));
}

#[tokio::test(start_paused = true)]
async fn should_cool_occupied_hot_room_and_report_it() {
    let agent = Agent::start(hot_occupied_room(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;

    assert!(agent.hardware.fan.is_on());
    let telemetry = agent.published(TELEMETRY_TOPIC);
    assert_eq!(telemetry.len(), 1);
    assert_eq!(telemetry[0]["workspace_id"], json!("ws-7"));
    assert_eq!(telemetry[0]["temperature"], json!(26.0));
    assert_eq!(telemetry[0]["occupied"], json!(true));
    assert_eq!(telemetry[0]["fan_state"], json!(true));
    assert!(
        agent
            .journal()
            .entries()
            .contains(&JournalEntry::Indicator(IndicatorState::TooHot))
    );

    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_adopt_delta_and_switch_fan_off_on_next_cycle() {
    let agent = Agent::start(hot_occupied_room(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;
    assert!(agent.hardware.fan.is_on());

    assert!(
        agent
            .broker
            .deliver(DELTA_TOPIC, r#"{"state": {"preferred_temp": 27.0}}"#)
            .await
    );
    advance(Duration::from_millis(100)).await;

    let updates = agent.published(UPDATE_TOPIC);
    let ack = &updates.last().unwrap()["state"]["reported"];
    assert_eq!(ack["preferred_temp"], json!(27.0));
    assert_eq!(ack["temp_threshold"], json!(1.0));
    assert!(agent.hardware.fan.is_on());

    // Next full cycle: 26.0 is within 27.0 + 1.0.
    advance(Duration::from_secs(10)).await;
    assert!(!agent.hardware.fan.is_on());

    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_keep_settings_when_delta_is_malformed() {
    let agent = Agent::start(hot_occupied_room(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;
    let before = agent.published(UPDATE_TOPIC).len();

    agent.broker.deliver(DELTA_TOPIC, "{not json").await;
    agent
        .broker
        .deliver(DELTA_TOPIC, r#"{"state": {"temp_threshold": -1}}"#)
        .await;
    advance(Duration::from_millis(100)).await;

    assert_eq!(agent.published(UPDATE_TOPIC).len(), before);
    advance(Duration::from_secs(10)).await;
    assert!(agent.hardware.fan.is_on());

    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_switch_fan_off_and_disconnect_when_stopped() {
    let agent = Agent::start(hot_occupied_room(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;
    let journal = agent.journal().clone();
    let broker = agent.broker.clone();
    let fan = agent.hardware.fan.clone();

    let exit = agent.stop().await;

    assert!(matches!(exit, LoopExit::Stopped));
    assert!(!fan.is_on());
    assert!(broker.is_disconnected());
    let entries = journal.entries();
    let tail = &entries[entries.len() - 3..];
    assert_eq!(
        tail,
        &[
            JournalEntry::Fan(false),
            JournalEntry::Indicator(IndicatorState::Idle),
            JournalEntry::Disconnected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn should_shut_down_when_transport_closes() {
    let agent = Agent::start(hot_occupied_room(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;

    agent.broker.close();
    let exit = agent.task.await.unwrap();

    assert!(matches!(exit, LoopExit::TransportClosed));
    assert!(!agent.hardware.fan.is_on());
}

#[tokio::test(start_paused = true)]
async fn should_fail_when_fan_cannot_be_driven_under_exit_policy() {
    let agent = Agent::start(Room::default(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;

    agent.hardware.fan.fail_writes(true);
    agent.hardware.set_climate(27.0, 40.0);
    agent.hardware.motion.set_present(true);
    let exit = agent.task.await.unwrap();

    assert!(matches!(exit, LoopExit::Failed(_)));
    assert!(!agent.hardware.fan.is_on());
}

#[tokio::test(start_paused = true)]
async fn should_recover_after_fan_fault_under_restart_policy() {
    let config = LoopConfig {
        failure_policy: FailurePolicy::Restart,
        ..LoopConfig::default()
    };
    let agent = Agent::start(Room::default(), config);
    advance(Duration::from_millis(100)).await;

    agent.hardware.fan.fail_writes(true);
    agent.hardware.set_climate(27.0, 40.0);
    agent.hardware.motion.set_present(true);
    // Arrival on the next fast tick fails to switch the fan on.
    advance(Duration::from_secs(3)).await;
    assert!(!agent.hardware.fan.is_on());

    agent.hardware.fan.fail_writes(false);
    advance(Duration::from_secs(10)).await;
    assert!(agent.hardware.fan.is_on());

    assert!(matches!(agent.stop().await, LoopExit::Stopped));
}

#[tokio::test(start_paused = true)]
async fn should_deliver_buffered_telemetry_once_broker_is_back() {
    let agent = Agent::start(Room::default(), LoopConfig::default());
    advance(Duration::from_millis(100)).await;
    assert_eq!(agent.published(TELEMETRY_TOPIC).len(), 1);

    agent.broker.set_failing(true);
    advance(Duration::from_secs(40)).await;
    assert_eq!(agent.published(TELEMETRY_TOPIC).len(), 1);

    agent.broker.set_failing(false);
    advance(Duration::from_secs(120)).await;
    let timestamps: Vec<_> = agent
        .published(TELEMETRY_TOPIC)
        .iter()
        .map(|record| parse_iso8601(record["timestamp"].as_str().unwrap()).unwrap())
        .collect();
    assert!(timestamps.len() >= 10);
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));

    agent.stop().await;
}
