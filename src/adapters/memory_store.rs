//! In-memory record store.
//!
//! Implements [`ReadingStore`] with two tables: the append-only hourly
//! readings and one status row per device.  Used by the host binary and by
//! tests; a SQL-backed store would implement the same trait.
//!
//! A failure mode can be injected with [`MemoryStore::fail_with`] so the
//! engine's retry path can be exercised without a real backend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::app::commands::SensorReading;
use crate::app::ports::{PersistedReading, ReadingStore, StorageError};

/// Current state of one device, updated on every reading and every
/// liveness transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub is_online: bool,
    pub last_liveness_change: Option<DateTime<Utc>>,
    pub last_data_received: Option<DateTime<Utc>>,
    pub total_readings: u64,
    pub last_reading: Option<SensorReading>,
}

impl DeviceStatus {
    fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            is_online: false,
            last_liveness_change: None,
            last_data_received: None,
            total_readings: 0,
            last_reading: None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct MemoryStore {
    readings: Vec<PersistedReading>,
    devices: HashMap<String, DeviceStatus>,
    #[serde(skip)]
    failure: Option<StorageError>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `err` (`None` restores normal
    /// operation).
    pub fn fail_with(&mut self, err: Option<StorageError>) {
        self.failure = err;
    }

    // ── Queries ───────────────────────────────────────────────

    /// Every saved reading, in insertion order.
    pub fn readings(&self) -> &[PersistedReading] {
        &self.readings
    }

    /// Readings for `device_id` recorded within `[start, end]`, newest first.
    pub fn readings_between(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PersistedReading> {
        let mut out: Vec<_> = self
            .readings
            .iter()
            .filter(|r| r.device_id == device_id && r.recorded_at >= start && r.recorded_at <= end)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        out
    }

    /// The newest `limit` readings for `device_id`, newest first.
    pub fn latest_readings(&self, device_id: &str, limit: usize) -> Vec<PersistedReading> {
        let mut out: Vec<_> = self
            .readings
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        out.truncate(limit);
        out
    }

    pub fn reading_count(&self, device_id: &str) -> usize {
        self.readings.iter().filter(|r| r.device_id == device_id).count()
    }

    pub fn device_status(&self, device_id: &str) -> Option<DeviceStatus> {
        self.devices.get(device_id).cloned()
    }

    /// Whole store as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn check(&self) -> Result<(), StorageError> {
        match &self.failure {
            Some(err) => {
                warn!("MemoryStore: injected failure: {}", err);
                Err(err.clone())
            }
            None => Ok(()),
        }
    }

    fn status_mut(&mut self, device_id: &str) -> &mut DeviceStatus {
        self.devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceStatus::new(device_id))
    }
}

impl ReadingStore for MemoryStore {
    fn save_reading(&mut self, reading: &PersistedReading) -> Result<(), StorageError> {
        self.check()?;
        if !reading.temperature.is_finite() {
            return Err(StorageError::Rejected("temperature must be finite"));
        }
        debug!(
            "MemoryStore: saved {} {:.2}\u{00b0}C at {}",
            reading.device_id, reading.temperature, reading.recorded_at
        );
        self.readings.push(reading.clone());
        Ok(())
    }

    fn update_last_known(
        &mut self,
        device_id: &str,
        reading: &SensorReading,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check()?;
        let status = self.status_mut(device_id);
        status.last_reading = Some(*reading);
        status.last_data_received = Some(at);
        status.total_readings += 1;
        Ok(())
    }

    fn record_liveness(
        &mut self,
        device_id: &str,
        is_online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check()?;
        let status = self.status_mut(device_id);
        status.is_online = is_online;
        status.last_liveness_change = Some(at);
        Ok(())
    }
}
