//! Inbound inputs to the device engine.
//!
//! These represent everything the outside world can ask of one monitored
//! device: a decoded sensor reading, a heartbeat, or a timer tick.  The
//! [`DeviceEngine`](super::service::DeviceEngine) interprets and acts upon
//! them one at a time, in arrival order.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Physical range of the probe (°C).  Anything outside is a sensor fault.
pub const SENSOR_MIN_C: f64 = -50.0;
pub const SENSOR_MAX_C: f64 = 100.0;

/// A decoded, validated sensor reading.
///
/// Only `temperature` drives analysis.  The auxiliary fields are carried
/// through to storage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
}

impl SensorReading {
    /// Temperature-only reading.
    pub fn temperature(temperature: f64) -> Self {
        Self {
            temperature,
            pressure: None,
            altitude: None,
            rssi: None,
        }
    }

    /// Reject non-finite values and temperatures the probe cannot produce.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.temperature.is_finite() {
            return Err(ValidationError::NotFinite("temperature"));
        }
        if !(SENSOR_MIN_C..=SENSOR_MAX_C).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange(self.temperature));
        }
        if self.pressure.is_some_and(|v| !v.is_finite()) {
            return Err(ValidationError::NotFinite("pressure"));
        }
        if self.altitude.is_some_and(|v| !v.is_finite()) {
            return Err(ValidationError::NotFinite("altitude"));
        }
        Ok(())
    }
}

/// Inputs that can be queued for one device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceInput {
    /// A sensor reading arrived.
    Reading(SensorReading),

    /// A heartbeat arrived.
    LivenessSignal,

    /// Periodic liveness check (1 s cadence).
    LivenessTick,

    /// Periodic commit-due check (60 s cadence).
    PersistenceTick,

    /// Persist the last reading now, bypassing the hourly window.
    ForceCommit,

    /// Stop the device's task.  Nothing after it is processed.
    Shutdown,
}
