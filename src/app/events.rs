//! Outbound monitoring events.
//!
//! The [`DeviceEngine`](super::service::DeviceEngine) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, push them to a UI, or
//! forward them to an alerting service.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{AlertKind, Verdict};

/// Structured events emitted by a device engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Every classified reading, changed or not.
    ReadingAnalyzed {
        device_id: String,
        verdict: Verdict,
        timestamp: DateTime<Utc>,
    },

    /// The alert kind differs from the previously emitted one.
    AlertChanged(AlertChange),

    /// The device went online or offline.
    LivenessChanged {
        device_id: String,
        is_online: bool,
        timestamp: DateTime<Utc>,
    },

    /// An hourly (or forced) commit was confirmed by storage.
    ReadingPersisted {
        device_id: String,
        temperature: f64,
        recorded_at: DateTime<Utc>,
    },
}

/// Payload of [`MonitorEvent::AlertChanged`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertChange {
    pub device_id: String,
    pub alert_kind: AlertKind,
    pub message: String,
    pub current_temp: f64,
    pub baseline_temp: Option<f64>,
    pub temp_change: f64,
    pub is_recovering: bool,
}

impl AlertChange {
    pub fn from_verdict(device_id: &str, verdict: &Verdict) -> Self {
        Self {
            device_id: device_id.to_string(),
            alert_kind: verdict.alert_kind,
            message: verdict.message.clone(),
            current_temp: verdict.current_temp,
            baseline_temp: verdict.baseline_temp,
            temp_change: verdict.temp_change,
            is_recovering: verdict.is_recovering,
        }
    }
}

impl MonitorEvent {
    /// Device the event belongs to.
    pub fn device_id(&self) -> &str {
        match self {
            Self::ReadingAnalyzed { device_id, .. }
            | Self::LivenessChanged { device_id, .. }
            | Self::ReadingPersisted { device_id, .. } => device_id,
            Self::AlertChanged(change) => &change.device_id,
        }
    }
}
