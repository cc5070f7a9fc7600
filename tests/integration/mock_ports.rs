//! Mock ports for integration tests.
//!
//! Records every emitted event so tests can assert on the full history,
//! and wraps the in-memory store with a scripted failure budget.

use chrono::{DateTime, TimeZone, Utc};

use fridge_monitor::adapters::memory_store::MemoryStore;
use fridge_monitor::adapters::time::ManualClock;
use fridge_monitor::analysis::AlertKind;
use fridge_monitor::app::commands::SensorReading;
use fridge_monitor::app::events::MonitorEvent;
use fridge_monitor::app::ports::{EventSink, PersistedReading, ReadingStore, StorageError};
use fridge_monitor::config::MonitorConfig;

// ── Clock and config helpers ─────────────────────────────────

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 4, h, m, s).unwrap()
}

pub fn clock_at(h: u32, m: u32, s: u32) -> ManualClock {
    ManualClock::new(at(h, m, s))
}

/// Defaults, but with hour boundaries in UTC so test times read directly.
pub fn utc_config() -> MonitorConfig {
    MonitorConfig {
        utc_offset_minutes: 0,
        ..MonitorConfig::default()
    }
}

// ── RecordingSink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<MonitorEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alert kinds in emission order, with the recovery flag.
    pub fn alert_changes(&self) -> Vec<(AlertKind, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::AlertChanged(c) => Some((c.alert_kind, c.is_recovering)),
                _ => None,
            })
            .collect()
    }

    pub fn liveness_flips(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::LivenessChanged { is_online, .. } => Some(*is_online),
                _ => None,
            })
            .collect()
    }

    pub fn persisted_at(&self) -> Vec<DateTime<Utc>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::ReadingPersisted { recorded_at, .. } => Some(*recorded_at),
                _ => None,
            })
            .collect()
    }

    pub fn analyzed_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::ReadingAnalyzed { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &MonitorEvent) {
        self.events.push(event.clone());
    }
}

// ── FlakyStore ───────────────────────────────────────────────

/// Fails the first `failures` hourly saves, then behaves like `MemoryStore`.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failures: u32,
    pub save_attempts: u32,
}

impl FlakyStore {
    pub fn failing(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures,
            save_attempts: 0,
        }
    }
}

impl ReadingStore for FlakyStore {
    fn save_reading(&mut self, reading: &PersistedReading) -> Result<(), StorageError> {
        self.save_attempts += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StorageError::Unavailable);
        }
        self.inner.save_reading(reading)
    }

    fn update_last_known(
        &mut self,
        device_id: &str,
        reading: &SensorReading,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner.update_last_known(device_id, reading, at)
    }

    fn record_liveness(
        &mut self,
        device_id: &str,
        is_online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner.record_liveness(device_id, is_online, at)
    }
}
