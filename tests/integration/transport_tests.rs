//! Integration tests for the transport boundary: raw topic + JSON payload
//! through `payload::decode` into the supervisor and on to the store.
//!
//! Anything the boundary rejects must never reach a device engine.

use std::sync::{Arc, Mutex};

use fridge_monitor::Error;
use fridge_monitor::adapters::log_sink::LogEventSink;
use fridge_monitor::adapters::memory_store::MemoryStore;
use fridge_monitor::adapters::payload::{self, InboundMessage};
use fridge_monitor::error::ValidationError;
use fridge_monitor::runtime::Supervisor;

use super::mock_ports::{clock_at, utc_config};

const DEVICE: &str = "esp32-fridge-001";

fn route(sup: &Supervisor, topic: &str, body: &str) -> fridge_monitor::Result<()> {
    let msg = payload::decode(topic, body.as_bytes())?;
    sup.dispatch(msg)
}

#[test]
fn payloads_reach_the_store() {
    let mut sup = Supervisor::new(utc_config()).unwrap();
    let store = Arc::new(Mutex::new(MemoryStore::new()));
    sup.register(DEVICE, clock_at(9, 30, 0), store.clone(), LogEventSink::new())
        .unwrap();

    let sensor = payload::sensor_topic(DEVICE);
    let heartbeat = payload::heartbeat_topic(DEVICE);

    route(&sup, &heartbeat, r#"{"device_id":"esp32-fridge-001","timestamp":118910,"status":"alive"}"#)
        .unwrap();
    route(
        &sup,
        &sensor,
        r#"{"device_id":"esp32-fridge-001","timestamp":78741,"temperature":4.7,"pressure":63408,"altitude":3783.08,"rssi":-71,"status":"normal"}"#,
    )
    .unwrap();

    // Rejected at the boundary.
    let bad = [
        (sensor.as_str(), r#"{"device_id":"esp32-fridge-001","temperature":150}"#),
        (sensor.as_str(), r#"{"device_id":"esp32-fridge-001"}"#),
        (sensor.as_str(), "{not json"),
        ("fridge/esp32-fridge-001/telemetry", r#"{"device_id":"esp32-fridge-001"}"#),
    ];
    for (topic, body) in bad {
        assert!(
            matches!(route(&sup, topic, body), Err(Error::Validation(_))),
            "{topic} {body}"
        );
    }

    let stats = sup.stop(DEVICE).unwrap();
    assert_eq!(stats.total_received, 1);
    assert!(stats.liveness.is_online);

    let store = store.lock().unwrap();
    let status = store.device_status(DEVICE).unwrap();
    assert!(status.is_online);
    assert_eq!(status.total_readings, 1);
    let last = status.last_reading.unwrap();
    assert_eq!(last.temperature, 4.7);
    assert_eq!(last.pressure, Some(63408.0));
    assert_eq!(last.rssi, Some(-71));
}

#[test]
fn unregistered_device_is_unknown() {
    let sup = Supervisor::new(utc_config()).unwrap();
    let res = route(
        &sup,
        &payload::heartbeat_topic("fridge-9"),
        r#"{"device_id":"fridge-9"}"#,
    );
    assert_eq!(res, Err(Error::UnknownDevice("fridge-9".into())));
}

#[test]
fn decode_reports_the_specific_problem() {
    let err = payload::decode(
        &payload::sensor_topic(DEVICE),
        br#"{"device_id":"esp32-fridge-001","temperature":-50.5}"#,
    )
    .unwrap_err();
    assert_eq!(err, ValidationError::TemperatureOutOfRange(-50.5));

    let msg = payload::decode(
        &payload::heartbeat_topic(DEVICE),
        br#"{"device_id":"esp32-fridge-001"}"#,
    )
    .unwrap();
    assert_eq!(msg, InboundMessage::Heartbeat { device_id: DEVICE.into() });
}
