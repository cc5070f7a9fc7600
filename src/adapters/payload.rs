//! Transport payload adapter.
//!
//! Decodes the JSON messages the appliance publishes and validates them
//! before anything reaches a device engine.
//!
//! | Topic                        | Payload                                           |
//! |------------------------------|---------------------------------------------------|
//! | `fridge/<id>/sensor_data`    | `{device_id, temperature, pressure?, altitude?, rssi?, status?, timestamp?}` |
//! | `fridge/<id>/heartbeat`      | `{device_id, status?, timestamp?}`                |
//!
//! `timestamp` is the device's own uptime counter and is ignored: every
//! reading is stamped by the host clock when it is analyzed.

use log::{debug, warn};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::app::commands::SensorReading;
use crate::error::ValidationError;

const TOPIC_ROOT: &str = "fridge";
const SENSOR_SUFFIX: &str = "sensor_data";
const HEARTBEAT_SUFFIX: &str = "heartbeat";

/// A decoded, validated message ready for the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Reading {
        device_id: String,
        reading: SensorReading,
    },
    Heartbeat {
        device_id: String,
    },
}

impl InboundMessage {
    pub fn device_id(&self) -> &str {
        match self {
            Self::Reading { device_id, .. } | Self::Heartbeat { device_id } => device_id,
        }
    }
}

/// Numeric fields arrive as JSON numbers or numeric strings depending on
/// the firmware build; both are accepted.
#[derive(Debug, Deserialize)]
struct SensorPayload {
    device_id: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    temperature: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pressure: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    altitude: Option<f64>,
    #[serde(default, deserialize_with = "whole_number")]
    rssi: Option<i32>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeartbeatPayload {
    device_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub fn sensor_topic(device_id: &str) -> String {
    format!("{TOPIC_ROOT}/{device_id}/{SENSOR_SUFFIX}")
}

pub fn heartbeat_topic(device_id: &str) -> String {
    format!("{TOPIC_ROOT}/{device_id}/{HEARTBEAT_SUFFIX}")
}

/// Decode a sensor payload.
pub fn parse_sensor_data(payload: &[u8]) -> Result<(String, SensorReading), ValidationError> {
    let raw: SensorPayload =
        serde_json::from_slice(payload).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let device_id = non_empty(raw.device_id)?;
    let temperature = raw
        .temperature
        .ok_or(ValidationError::MissingField("temperature"))?;

    let reading = SensorReading {
        temperature,
        pressure: raw.pressure,
        altitude: raw.altitude,
        rssi: raw.rssi,
    };
    if let Err(e) = reading.validate() {
        warn!("Sensor payload from {} rejected: {}", device_id, e);
        return Err(e);
    }

    debug!(
        "Sensor payload: {} {:.2}\u{00b0}C status={}",
        device_id,
        temperature,
        raw.status.as_deref().unwrap_or("unknown")
    );
    Ok((device_id, reading))
}

/// Decode a heartbeat payload.  Returns the device id.
pub fn parse_heartbeat(payload: &[u8]) -> Result<String, ValidationError> {
    let raw: HeartbeatPayload =
        serde_json::from_slice(payload).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    let device_id = non_empty(raw.device_id)?;
    debug!(
        "Heartbeat from {} status={}",
        device_id,
        raw.status.as_deref().unwrap_or("alive")
    );
    Ok(device_id)
}

/// Route a message by topic and decode its payload.
///
/// The device id in the topic must match the one in the payload.
pub fn decode(topic: &str, payload: &[u8]) -> Result<InboundMessage, ValidationError> {
    let unknown = || ValidationError::UnknownTopic(topic.to_string());

    let mut parts = topic.split('/');
    let (Some(TOPIC_ROOT), Some(topic_id), Some(kind), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(unknown());
    };
    if topic_id.is_empty() {
        return Err(unknown());
    }

    let msg = match kind {
        SENSOR_SUFFIX => {
            let (device_id, reading) = parse_sensor_data(payload)?;
            InboundMessage::Reading { device_id, reading }
        }
        HEARTBEAT_SUFFIX => InboundMessage::Heartbeat {
            device_id: parse_heartbeat(payload)?,
        },
        _ => return Err(unknown()),
    };

    if msg.device_id() != topic_id {
        return Err(ValidationError::Malformed(format!(
            "payload device_id {} does not match topic {}",
            msg.device_id(),
            topic
        )));
    }
    Ok(msg)
}

// ── Lenient numeric fields ───────────────────────────────────

fn number_or_string<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom("number out of range")),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("not a number: {raw:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Signal strength as an integer.  Floats are truncated toward zero.
fn whole_number<'de, D>(de: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(v) = number_or_string(de)? else {
        return Ok(None);
    };
    let v = v.trunc();
    if !v.is_finite() || v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
        return Err(D::Error::custom(format!("rssi {v} out of range")));
    }
    Ok(Some(v as i32))
}

fn non_empty(device_id: Option<String>) -> Result<String, ValidationError> {
    match device_id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ValidationError::MissingField("device_id")),
    }
}
