//! Remote reporting of soil readings over MQTT.
//!
//! Publishing never awaits the broker: readings are queued with
//! `try_publish` and a separate task drives the rumqttc event loop. A full
//! queue or a dropped connection surfaces as a publish error, which the
//! controller reports and otherwise ignores.

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use std::time::Duration;
use tokio::time::sleep;

use crate::sensor::Reading;
use crate::state::SharedState;

pub trait Telemetry {
    fn publish(&mut self, reading: &Reading) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Topic / payload helpers
// ---------------------------------------------------------------------------

/// "garden/<node_id>/humidity"
pub(crate) fn humidity_topic(node_id: &str) -> String {
    format!("garden/{node_id}/humidity")
}

/// "garden/<node_id>/temperature"
pub(crate) fn temperature_topic(node_id: &str) -> String {
    format!("garden/{node_id}/temperature")
}

/// Whole units, truncated toward zero.
pub(crate) fn format_value(value: f32) -> String {
    (value as i32).to_string()
}

// ---------------------------------------------------------------------------
// MQTT publisher
// ---------------------------------------------------------------------------

pub struct MqttTelemetry {
    client: AsyncClient,
    humidity_topic: String,
    temperature_topic: String,
}

impl MqttTelemetry {
    pub fn new(client: AsyncClient, node_id: &str) -> Self {
        Self {
            client,
            humidity_topic: humidity_topic(node_id),
            temperature_topic: temperature_topic(node_id),
        }
    }
}

impl Telemetry for MqttTelemetry {
    fn publish(&mut self, reading: &Reading) -> Result<()> {
        self.client
            .try_publish(
                &self.humidity_topic,
                QoS::AtLeastOnce,
                false,
                format_value(reading.humidity),
            )
            .with_context(|| format!("failed to queue {}", self.humidity_topic))?;
        self.client
            .try_publish(
                &self.temperature_topic,
                QoS::AtLeastOnce,
                false,
                format_value(reading.temperature),
            )
            .with_context(|| format!("failed to queue {}", self.temperature_topic))?;
        Ok(())
    }
}

/// Drive the MQTT connection forever, mirroring connectivity into the shared
/// status. Intended to be `tokio::spawn`-ed from main.
pub async fn run_event_loop(mut eventloop: EventLoop, shared: SharedState) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("mqtt connected");
                let mut st = shared.write().await;
                st.mqtt_connected = true;
                st.record_system("mqtt connected".to_string());
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("mqtt disconnected");
                let mut st = shared.write().await;
                st.mqtt_connected = false;
                st.record_system("mqtt disconnected".to_string());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("mqtt error: {e}. reconnecting...");
                let mut st = shared.write().await;
                st.mqtt_connected = false;
                st.record_error(format!("mqtt error: {e}"));
                drop(st);
                sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
