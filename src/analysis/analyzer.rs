//! Temperature pattern analyzer.
//!
//! Classifies every incoming reading against a rolling baseline to tell a
//! benign door opening apart from a refrigeration failure.
//!
//! ## Decision order (first match wins)
//!
//! 1. **Warm-up**: fewer than 5 samples: report `None`, baseline is the
//!    running mean of everything seen so far.
//! 2. **Out of range**: outside the configured normal band.
//! 3. **Rapid change**: rise above the rapid threshold within 5 minutes
//!    (door opening).
//! 4. **Gradual change**: drift beyond the slow threshold within 10
//!    minutes *and* at least 5 consecutive moves in the same direction
//!    (critical increase / decrease).
//! 5. **Recovery**: an active door/critical alert clears once the reading
//!    is back within 0.5 °C (door) or 1.0 °C (critical) of the baseline.
//! 6. Otherwise the active door/critical alert is held, or `None`.
//!
//! ## Baseline hysteresis
//!
//! While any alert is active the baseline is frozen, so recovery is
//! measured against the pre-excursion reference instead of a baseline
//! already dragged along by the excursion.  Recovery bands are tighter
//! than detection thresholds to prevent flapping.

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::window::{Reading, ReadingWindow, WindowStats};
use crate::app::ports::Clock;
use crate::config::MonitorConfig;

/// Samples required before any classification happens.
const WARMUP_SAMPLES: usize = 5;
/// Samples averaged into the baseline (≈ 5 min at 15 s).
const BASELINE_SAMPLES: usize = 20;

const RAPID_WINDOW_MINS: i64 = 5;
const RAPID_MIN_SAMPLES: usize = 5;

const GRADUAL_WINDOW_MINS: i64 = 10;
const GRADUAL_MIN_SAMPLES: usize = 10;
/// Same-direction moves required before a drift counts as sustained.
const MIN_CONSECUTIVE_MOVES: u32 = 5;

const DOOR_RECOVERY_BAND_C: f64 = 0.5;
const CRITICAL_RECOVERY_BAND_C: f64 = 1.0;

// ═══════════════════════════════════════════════════════════════
//  Classification types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    #[default]
    None,
    /// Fast rise that is expected to recover on its own.
    DoorOpening,
    /// Sustained rise: probable refrigeration failure.
    CriticalIncrease,
    /// Sustained, abnormal fall.
    CriticalDecrease,
    /// Outside the configured normal band.
    OutOfRange,
}

impl AlertKind {
    pub fn is_alert(self) -> bool {
        self != Self::None
    }

    /// Alerts that only clear through the recovery rule.
    fn needs_recovery(self) -> bool {
        matches!(
            self,
            Self::DoorOpening | Self::CriticalIncrease | Self::CriticalDecrease
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DoorOpening => "door_opening",
            Self::CriticalIncrease => "critical_increase",
            Self::CriticalDecrease => "critical_decrease",
            Self::OutOfRange => "out_of_range",
        }
    }
}

impl core::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one reading.  Temperatures are rounded to two
/// decimals for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub alert_kind: AlertKind,
    pub message: String,
    pub current_temp: f64,
    pub baseline_temp: Option<f64>,
    /// `current_temp - baseline_temp`, zero while no baseline exists.
    pub temp_change: f64,
    pub is_recovering: bool,
    pub consecutive_increases: u32,
    pub consecutive_decreases: u32,
}

/// Read-only view of the analyzer's persistent state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerState {
    pub baseline: Option<f64>,
    pub active_alert: AlertKind,
    pub alert_started_at: Option<DateTime<Utc>>,
    pub consecutive_increases: u32,
    pub consecutive_decreases: u32,
}

/// Window summary plus the current baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalyzerStats {
    #[serde(flatten)]
    pub window: WindowStats,
    pub baseline: Option<f64>,
}

// ═══════════════════════════════════════════════════════════════
//  Analyzer
// ═══════════════════════════════════════════════════════════════

pub struct TemperatureAnalyzer<C: Clock> {
    clock: C,
    window: ReadingWindow,
    rapid_threshold_c: f64,
    slow_threshold_c: f64,
    range_min_c: f64,
    range_max_c: f64,

    baseline: Option<f64>,
    active_alert: AlertKind,
    alert_started_at: Option<DateTime<Utc>>,
    consecutive_increases: u32,
    consecutive_decreases: u32,
}

impl<C: Clock> TemperatureAnalyzer<C> {
    pub fn new(config: &MonitorConfig, clock: C) -> Self {
        Self {
            clock,
            window: ReadingWindow::new(config.window_capacity),
            rapid_threshold_c: config.rapid_change_threshold_c,
            slow_threshold_c: config.slow_change_threshold_c,
            range_min_c: config.normal_range_min_c,
            range_max_c: config.normal_range_max_c,
            baseline: None,
            active_alert: AlertKind::None,
            alert_started_at: None,
            consecutive_increases: 0,
            consecutive_decreases: 0,
        }
    }

    /// Record a reading taken now and classify it.
    ///
    /// `temperature` must be finite; the transport boundary rejects
    /// anything else.
    pub fn classify(&mut self, temperature: f64) -> Verdict {
        let now = self.clock.now();
        self.window.push(Reading {
            temperature,
            timestamp: now,
        });

        if self.window.len() < WARMUP_SAMPLES {
            self.baseline = self.window.mean_of_recent(WARMUP_SAMPLES);
            return self.conclude(AlertKind::None, "Calibrating...".into(), false, now);
        }

        if !self.active_alert.is_alert() {
            self.baseline = self.window.mean_of_recent(BASELINE_SAMPLES);
        }

        self.analyze(temperature, now)
    }

    pub fn state(&self) -> AnalyzerState {
        AnalyzerState {
            baseline: self.baseline,
            active_alert: self.active_alert,
            alert_started_at: self.alert_started_at,
            consecutive_increases: self.consecutive_increases,
            consecutive_decreases: self.consecutive_decreases,
        }
    }

    pub fn statistics(&self) -> Option<AnalyzerStats> {
        self.window.stats().map(|window| AnalyzerStats {
            window,
            baseline: self.baseline,
        })
    }

    // ── Internal ──────────────────────────────────────────────────

    fn analyze(&mut self, temperature: f64, now: DateTime<Utc>) -> Verdict {
        let Some(baseline) = self.baseline else {
            return self.conclude(AlertKind::None, "Establishing baseline...".into(), false, now);
        };

        // ── Normal band ───────────────────────────────────────────
        if temperature < self.range_min_c {
            let msg = format!(
                "Temperature too low: {:.1}\u{00b0}C (min: {}\u{00b0}C)",
                temperature, self.range_min_c
            );
            return self.conclude(AlertKind::OutOfRange, msg, false, now);
        }
        if temperature > self.range_max_c {
            let msg = format!(
                "Temperature too high: {:.1}\u{00b0}C (max: {}\u{00b0}C)",
                temperature, self.range_max_c
            );
            return self.conclude(AlertKind::OutOfRange, msg, false, now);
        }

        // ── Rapid change ──────────────────────────────────────────
        if let Some(rise) = self.rapid_rise(temperature, now) {
            let msg = format!("Possible door opening: +{:.1}\u{00b0}C in 5 minutes", rise);
            return self.conclude(AlertKind::DoorOpening, msg, false, now);
        }

        // ── Gradual change ────────────────────────────────────────
        self.track_slope(temperature);
        if let Some((kind, delta)) = self.sustained_drift(temperature, now) {
            let msg = match kind {
                AlertKind::CriticalIncrease => format!(
                    "CRITICAL: temperature rising steadily (+{:.1}\u{00b0}C in 10 minutes)",
                    delta
                ),
                _ => format!(
                    "CRITICAL: temperature falling abnormally ({:.1}\u{00b0}C in 10 minutes)",
                    delta
                ),
            };
            return self.conclude(kind, msg, false, now);
        }

        // ── Recovery / hold ───────────────────────────────────────
        let deviation = (temperature - baseline).abs();
        match self.active_alert {
            AlertKind::DoorOpening if deviation < DOOR_RECOVERY_BAND_C => {
                info!("Temperature recovered after door opening");
                self.reset_counters();
                self.conclude(
                    AlertKind::None,
                    "Temperature recovered after door opening".into(),
                    true,
                    now,
                )
            }
            AlertKind::CriticalIncrease | AlertKind::CriticalDecrease
                if deviation < CRITICAL_RECOVERY_BAND_C =>
            {
                info!("Temperature stabilised");
                self.reset_counters();
                self.conclude(AlertKind::None, "Temperature stabilised".into(), true, now)
            }
            held if held.needs_recovery() => {
                let msg = format!(
                    "{} still active: {:+.1}\u{00b0}C from baseline",
                    held,
                    temperature - baseline
                );
                self.conclude(held, msg, false, now)
            }
            _ => self.conclude(AlertKind::None, "Temperature normal".into(), false, now),
        }
    }

    /// Rise relative to the oldest sample of the last 5 minutes, if it
    /// exceeds the rapid threshold.
    fn rapid_rise(&self, temperature: f64, now: DateTime<Utc>) -> Option<f64> {
        let cutoff = now - Duration::minutes(RAPID_WINDOW_MINS);
        let mut recent = self.window.since(cutoff);
        let oldest = recent.next()?.temperature;
        if 1 + recent.count() < RAPID_MIN_SAMPLES {
            return None;
        }
        let rise = temperature - oldest;
        (rise > self.rapid_threshold_c).then_some(rise)
    }

    /// Local slope against the immediately preceding sample.
    fn track_slope(&mut self, temperature: f64) {
        let Some(prev) = self.window.previous().map(|r| r.temperature) else {
            return;
        };
        if temperature > prev {
            self.consecutive_increases += 1;
            self.consecutive_decreases = 0;
        } else if temperature < prev {
            self.consecutive_decreases += 1;
            self.consecutive_increases = 0;
        }
    }

    fn sustained_drift(&self, temperature: f64, now: DateTime<Utc>) -> Option<(AlertKind, f64)> {
        let cutoff = now - Duration::minutes(GRADUAL_WINDOW_MINS);
        let mut recent = self.window.since(cutoff);
        let oldest = recent.next()?.temperature;
        if 1 + recent.count() < GRADUAL_MIN_SAMPLES {
            return None;
        }

        let delta = temperature - oldest;
        if delta > self.slow_threshold_c && self.consecutive_increases >= MIN_CONSECUTIVE_MOVES {
            return Some((AlertKind::CriticalIncrease, delta));
        }
        if delta < -self.slow_threshold_c && self.consecutive_decreases >= MIN_CONSECUTIVE_MOVES {
            return Some((AlertKind::CriticalDecrease, delta));
        }
        None
    }

    fn reset_counters(&mut self) {
        self.consecutive_increases = 0;
        self.consecutive_decreases = 0;
    }

    /// Commit `kind` as the active alert and build the verdict.
    fn conclude(
        &mut self,
        kind: AlertKind,
        message: String,
        is_recovering: bool,
        now: DateTime<Utc>,
    ) -> Verdict {
        if kind != self.active_alert {
            if kind.is_alert() {
                self.alert_started_at = Some(now);
                match kind {
                    AlertKind::DoorOpening => warn!("{}", message),
                    _ => error!("{}", message),
                }
            } else {
                self.alert_started_at = None;
            }
        }
        self.active_alert = kind;

        let current = self.window.last().map_or(0.0, |r| r.temperature);
        let temp_change = self.baseline.map_or(0.0, |b| current - b);

        Verdict {
            alert_kind: kind,
            message,
            current_temp: round2(current),
            baseline_temp: self.baseline.map(round2),
            temp_change: round2(temp_change),
            is_recovering,
            consecutive_increases: self.consecutive_increases,
            consecutive_decreases: self.consecutive_decreases,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
