//! Monitor configuration parameters
//!
//! All tunable thresholds and cadences for one monitored appliance.
//! Values come from the process environment (see [`MonitorConfig::from_env`])
//! and are passed explicitly into every component at construction, so
//! parallel engines can run with different thresholds.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::window::WINDOW_MAX;
use crate::app::ports::ConfigError;

/// Core monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    // --- Temperature alerts ---
    /// Rise (°C) within the 5-minute window that signals a door opening
    pub rapid_change_threshold_c: f64,
    /// Net drift (°C) within the 10-minute window that signals a failure
    pub slow_change_threshold_c: f64,
    /// Lower bound of the normal operating band (°C)
    pub normal_range_min_c: f64,
    /// Upper bound of the normal operating band (°C)
    pub normal_range_max_c: f64,

    // --- Liveness ---
    /// Seconds without a heartbeat before the device is declared offline
    pub liveness_timeout_secs: u32,
    /// Liveness check cadence (milliseconds)
    pub liveness_tick_ms: u32,

    // --- Persistence ---
    /// Cadence of the "is a commit due" check (milliseconds)
    pub persistence_tick_ms: u32,
    /// Offset of the site's local time from UTC, in minutes.
    /// Commits are aligned to local hour boundaries.  The offset is fixed:
    /// a site whose zone observes DST must update it at each transition,
    /// or its commits land an hour off for half the year.
    pub utc_offset_minutes: i32,

    // --- Analysis window ---
    /// Number of samples retained for pattern analysis
    pub window_capacity: usize,

    // --- Runtime ---
    /// Depth of each device's inbound message queue
    pub inbox_depth: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Alerts
            rapid_change_threshold_c: 3.0,
            slow_change_threshold_c: 1.5,
            normal_range_min_c: -5.0,
            normal_range_max_c: 8.0,

            // Liveness
            liveness_timeout_secs: 6,
            liveness_tick_ms: 1000, // 1 Hz

            // Persistence
            persistence_tick_ms: 60_000, // 1/min
            utc_offset_minutes: -240,    // America/La_Paz, no DST

            // 120 samples at 15 s = 30 minutes
            window_capacity: 120,

            inbox_depth: 32,
        }
    }
}

/// Inbox depth ceiling; matches the const capacity of the device channel.
pub const MAX_INBOX_DEPTH: usize = 64;

impl MonitorConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            self.rapid_change_threshold_c,
            self.slow_change_threshold_c,
            self.normal_range_min_c,
            self.normal_range_max_c,
        ];
        if thresholds.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationFailed("thresholds must be finite"));
        }
        if self.rapid_change_threshold_c <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "rapid_change_threshold_c must be positive",
            ));
        }
        if self.slow_change_threshold_c <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "slow_change_threshold_c must be positive",
            ));
        }
        if self.normal_range_min_c >= self.normal_range_max_c {
            return Err(ConfigError::ValidationFailed(
                "normal_range_min_c must be below normal_range_max_c",
            ));
        }
        if self.liveness_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "liveness_timeout_secs must be non-zero",
            ));
        }
        if self.liveness_tick_ms == 0 || self.persistence_tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick intervals must be non-zero"));
        }
        // Ticks slower than a minute would leave whole hours unchecked
        // when no readings arrive.
        if self.persistence_tick_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "persistence_tick_ms must not exceed 60000",
            ));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::ValidationFailed(
                "utc_offset_minutes must be within one day",
            ));
        }
        if self.window_capacity < 20 || self.window_capacity > WINDOW_MAX {
            return Err(ConfigError::ValidationFailed(
                "window_capacity must be between 20 and WINDOW_MAX",
            ));
        }
        if self.inbox_depth == 0 || self.inbox_depth > MAX_INBOX_DEPTH {
            return Err(ConfigError::ValidationFailed(
                "inbox_depth must be between 1 and MAX_INBOX_DEPTH",
            ));
        }
        Ok(())
    }

    /// Build a config from a key lookup, starting from defaults.
    ///
    /// Keys that are absent keep their default; keys that are present but
    /// unparseable are an error. The result is validated before return.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut c = Self::default();

        override_from(&lookup, "TEMP_ALERT_RAPID_CHANGE", &mut c.rapid_change_threshold_c)?;
        override_from(&lookup, "TEMP_ALERT_SLOW_INCREASE", &mut c.slow_change_threshold_c)?;
        override_from(&lookup, "TEMP_NORMAL_RANGE_MIN", &mut c.normal_range_min_c)?;
        override_from(&lookup, "TEMP_NORMAL_RANGE_MAX", &mut c.normal_range_max_c)?;
        override_from(&lookup, "HEARTBEAT_TIMEOUT", &mut c.liveness_timeout_secs)?;
        override_from(&lookup, "WINDOW_CAPACITY", &mut c.window_capacity)?;
        override_from(&lookup, "UTC_OFFSET_MINUTES", &mut c.utc_offset_minutes)?;

        c.validate()?;
        Ok(c)
    }

    /// Local offset used for hour-aligned commits.  Falls back to UTC for
    /// an out-of-range value, which `validate` already rejects.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn override_from<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::Invalid(key))?;
    }
    Ok(())
}
