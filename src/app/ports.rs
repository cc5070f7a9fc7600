//! Port traits: the hexagonal boundary between the monitoring core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceEngine (domain)
//! ```
//!
//! Driven adapters (clock, record store, event sinks) implement these
//! traits.  The [`DeviceEngine`](super::service::DeviceEngine) owns them
//! via generics, so the domain core never touches a database, a broker or
//! the system clock directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commands::SensorReading;
use super::events::MonitorEvent;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: host time → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock source.  Every timestamp inside the core comes from here,
/// never from the caller.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → UI / alerting / logging)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`MonitorEvent`]s through this port.
/// Adapters decide where they go (log, UI channel, push notification).
pub trait EventSink {
    fn emit(&mut self, event: &MonitorEvent);
}

// ───────────────────────────────────────────────────────────────
// Record store port (driven adapter: domain → durable storage)
// ───────────────────────────────────────────────────────────────

/// A reading selected for durable storage by the hourly policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedReading {
    pub device_id: String,
    pub temperature: f64,
    pub pressure: Option<f64>,
    pub altitude: Option<f64>,
    pub rssi: Option<i32>,
    pub recorded_at: DateTime<Utc>,
}

/// Durable record store.
///
/// Implementations may block; the engine only calls them after it has
/// finished updating its own state for the current input.
pub trait ReadingStore {
    /// Append an hourly reading.  Only called when a commit is due.
    fn save_reading(&mut self, reading: &PersistedReading) -> Result<(), StorageError>;

    /// Overwrite the device's last-known values.  Called on every reading.
    fn update_last_known(
        &mut self,
        device_id: &str,
        reading: &SensorReading,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Record an online/offline transition.
    fn record_liveness(
        &mut self,
        device_id: &str,
        is_online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Several device engines may share one store behind a mutex.
impl<T: ReadingStore + ?Sized> ReadingStore for Arc<Mutex<T>> {
    fn save_reading(&mut self, reading: &PersistedReading) -> Result<(), StorageError> {
        self.lock()
            .map_err(|_| StorageError::Unavailable)?
            .save_reading(reading)
    }

    fn update_last_known(
        &mut self,
        device_id: &str,
        reading: &SensorReading,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.lock()
            .map_err(|_| StorageError::Unavailable)?
            .update_last_known(device_id, reading, at)
    }

    fn record_liveness(
        &mut self,
        device_id: &str,
        is_online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.lock()
            .map_err(|_| StorageError::Unavailable)?
            .record_liveness(device_id, is_online, at)
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading and validation.  Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// A configuration key was present but could not be parsed.
    Invalid(&'static str),
}

/// Errors from [`ReadingStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be reached.
    Unavailable,
    /// The backend refused the record.
    Rejected(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Invalid(key) => write!(f, "invalid value for {}", key),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage unavailable"),
            Self::Rejected(why) => write!(f, "record rejected: {}", why),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
