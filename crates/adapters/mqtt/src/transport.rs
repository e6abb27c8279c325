//! [`Transport`] implementation over rumqttc.
//!
//! [`MqttTransport::connect`] performs the connect and initial subscribe
//! inline, so a broker that is unreachable or refuses us fails startup. After
//! that a background task pumps the rumqttc event loop: inbound publishes are
//! forwarded as [`TransportEvent::Message`], connection errors become
//! [`TransportEvent::Interrupted`] followed by a reconnect attempt, and a
//! successful reconnect resubscribes and emits [`TransportEvent::Resumed`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use comfortzone_app::ports::{InboundMessage, Transport, TransportEvent};
use comfortzone_domain::error::TransportError;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode, TlsConfiguration,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// A connected MQTT client.
pub struct MqttTransport {
    client: AsyncClient,
    pump: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl MqttTransport {
    /// Connect, subscribe to `subscriptions` and start the event pump.
    ///
    /// Returns the transport and the receiving end of its event channel.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError`] if the TLS files cannot be read, the broker
    /// cannot be reached or refuses the session, a subscription is rejected,
    /// or the whole handshake exceeds the configured connect timeout.
    pub async fn connect(
        config: &MqttConfig,
        subscriptions: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), MqttError> {
        let options = build_options(config).await?;
        let capacity = config.channel_capacity.max(1);
        let (client, mut eventloop) = AsyncClient::new(options, capacity);

        tracing::info!(
            broker = %config.broker_host,
            port = config.broker_port,
            client_id = %config.client_id,
            tls = config.tls_enabled(),
            "connecting to MQTT broker"
        );
        let early = tokio::time::timeout(
            config.connect_timeout(),
            handshake(&client, &mut eventloop, &subscriptions),
        )
        .await
        .map_err(|_| MqttError::Timeout("connect"))??;
        tracing::info!(subscriptions = subscriptions.len(), "connected to MQTT broker");

        let (events_tx, events_rx) = mpsc::channel(capacity);
        let pump = Pump {
            eventloop,
            client: client.clone(),
            subscriptions,
            events: events_tx,
            reconnect_delay: config.reconnect_delay(),
            max_reconnect_attempts: config.max_reconnect_attempts,
        };
        let handle = tokio::spawn(pump.run(early));

        Ok((
            Self {
                client,
                pump: Mutex::new(Some(handle)),
                shutdown_timeout: config.connect_timeout(),
            },
            events_rx,
        ))
    }
}

impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|err| MqttError::Client(err).into())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let result = self.client.disconnect().await.map_err(MqttError::Client);

        let pump = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut pump) = pump
            && tokio::time::timeout(self.shutdown_timeout, &mut pump)
                .await
                .is_err()
        {
            tracing::warn!("MQTT event pump did not stop in time, aborting it");
            pump.abort();
        }

        tracing::info!("disconnected from MQTT broker");
        result.map_err(Into::into)
    }
}

async fn build_options(config: &MqttConfig) -> Result<MqttOptions, MqttError> {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.broker_host.clone(),
        config.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(true);

    if let Some(ca_path) = &config.ca_path {
        let ca = read_pem(ca_path).await?;
        let client_auth = match (&config.cert_path, &config.key_path) {
            (Some(cert), Some(key)) => Some((read_pem(cert).await?, read_pem(key).await?)),
            (None, None) => None,
            _ => return Err(MqttError::TlsIncomplete),
        };
        options.set_transport(rumqttc::Transport::tls_with_config(
            TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth,
            },
        ));
    }
    Ok(options)
}

async fn read_pem(path: &std::path::Path) -> Result<Vec<u8>, MqttError> {
    tokio::fs::read(path).await.map_err(|source| MqttError::TlsFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Drive the event loop until the session is up and every subscription is
/// acknowledged. Publishes that arrive meanwhile are returned so they can be
/// forwarded once the pump runs.
async fn handshake(
    client: &AsyncClient,
    eventloop: &mut EventLoop,
    subscriptions: &[String],
) -> Result<Vec<InboundMessage>, MqttError> {
    let mut early = Vec::new();
    let mut connected = false;
    let mut acked = 0;

    while !connected || acked < subscriptions.len() {
        match eventloop.poll().await.map_err(MqttError::Connection)? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code != ConnectReturnCode::Success {
                    return Err(MqttError::Refused(format!("{:?}", ack.code)));
                }
                connected = true;
                subscribe_all(client, subscriptions).await?;
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    return Err(MqttError::SubscribeRejected(format!("packet {}", ack.pkid)));
                }
                acked += 1;
            }
            Event::Incoming(Packet::Publish(publish)) => early.push(InboundMessage {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            _ => {}
        }
    }
    Ok(early)
}

async fn subscribe_all(client: &AsyncClient, subscriptions: &[String]) -> Result<(), MqttError> {
    for topic in subscriptions {
        client
            .subscribe(topic.as_str(), QoS::AtLeastOnce)
            .await
            .map_err(MqttError::Client)?;
        tracing::debug!(topic = %topic, "subscribed");
    }
    Ok(())
}

struct Pump {
    eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<String>,
    events: mpsc::Sender<TransportEvent>,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
}

impl Pump {
    /// Runs until the client disconnects, the receiver goes away, or
    /// reconnection is given up. Dropping `events` on return closes the
    /// channel.
    async fn run(mut self, early: Vec<InboundMessage>) {
        for message in early {
            if self.events.send(TransportEvent::Message(message)).await.is_err() {
                return;
            }
        }

        let mut failures: u32 = 0;
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if self.events.send(TransportEvent::Message(message)).await.is_err() {
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) if failures > 0 => {
                    if ack.code != ConnectReturnCode::Success {
                        tracing::warn!(code = ?ack.code, "broker refused reconnection");
                        continue;
                    }
                    if let Err(err) = subscribe_all(&self.client, &self.subscriptions).await {
                        tracing::error!(error = %err, "failed to resubscribe after reconnect");
                        return;
                    }
                    tracing::info!(attempts = failures, "reconnected to MQTT broker");
                    failures = 0;
                    if self.events.send(TransportEvent::Resumed).await.is_err() {
                        return;
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::debug!("MQTT disconnect sent, stopping event pump");
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    failures = failures.saturating_add(1);
                    if self.max_reconnect_attempts != 0 && failures > self.max_reconnect_attempts {
                        tracing::error!(
                            error = %err,
                            attempts = failures - 1,
                            "giving up on MQTT broker"
                        );
                        return;
                    }
                    tracing::warn!(
                        error = %err,
                        attempt = failures,
                        "MQTT connection lost, reconnecting"
                    );
                    if failures == 1 {
                        let interrupted = TransportEvent::Interrupted {
                            reason: err.to_string(),
                        };
                        if self.events.send(interrupted).await.is_err() {
                            return;
                        }
                    }
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}
