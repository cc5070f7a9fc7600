//! Device engine: the hexagonal core for one monitored appliance.
//!
//! [`DeviceEngine`] owns the analyzer, the liveness monitor and the
//! persistence scheduler for a single device, plus the ports they report
//! through.  Every input is applied synchronously and in order; the
//! engine is never shared, so none of its state needs a lock.
//!
//! ```text
//!  DeviceInput ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │         DeviceEngine          │
//!                  │ Analyzer · Liveness · Sched.  │ ──▶ ReadingStore
//!                  └──────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::analysis::{AlertKind, AnalyzerStats, TemperatureAnalyzer, Verdict};
use crate::config::MonitorConfig;
use crate::error::ValidationError;
use crate::liveness::{LivenessMonitor, LivenessStatus, LivenessTransition};
use crate::scheduler::PersistenceScheduler;

use super::commands::{DeviceInput, SensorReading};
use super::events::{AlertChange, MonitorEvent};
use super::ports::{Clock, ConfigError, EventSink, PersistedReading, ReadingStore};

/// Counters and component snapshots for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub device_id: String,
    pub total_received: u64,
    pub total_saved: u64,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub active_alert: AlertKind,
    pub temperature: Option<AnalyzerStats>,
    pub liveness: LivenessStatus,
}

/// What the engine did with one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    Continue,
    Stop,
}

// ───────────────────────────────────────────────────────────────
// DeviceEngine
// ───────────────────────────────────────────────────────────────

pub struct DeviceEngine<C, S, E>
where
    C: Clock + Clone,
    S: ReadingStore,
    E: EventSink,
{
    device_id: String,
    config: MonitorConfig,
    clock: C,
    analyzer: TemperatureAnalyzer<C>,
    liveness: LivenessMonitor<C>,
    scheduler: PersistenceScheduler<C>,
    store: S,
    sink: E,

    /// Alert kind last reported through the sink.  De-duplicates
    /// steady-state alerts.
    last_emitted_alert: AlertKind,
    last_reading: Option<SensorReading>,
    total_received: u64,
    total_saved: u64,
}

impl<C, S, E> DeviceEngine<C, S, E>
where
    C: Clock + Clone,
    S: ReadingStore,
    E: EventSink,
{
    /// Build an engine for `device_id`.  Refuses an invalid config.
    pub fn new(
        device_id: impl Into<String>,
        config: &MonitorConfig,
        clock: C,
        store: S,
        sink: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let device_id = device_id.into();

        let engine = Self {
            analyzer: TemperatureAnalyzer::new(config, clock.clone()),
            liveness: LivenessMonitor::new(config.liveness_timeout_secs, clock.clone()),
            scheduler: PersistenceScheduler::new(config.local_offset(), clock.clone()),
            clock,
            store,
            sink,
            last_emitted_alert: AlertKind::None,
            last_reading: None,
            total_received: 0,
            total_saved: 0,
            device_id,
            config: config.clone(),
        };
        info!("DeviceEngine[{}] ready", engine.device_id);
        Ok(engine)
    }

    // ── Input dispatch ────────────────────────────────────────

    /// Apply one queued input.  Invalid readings are logged and dropped.
    pub fn handle(&mut self, input: DeviceInput) -> Handled {
        match input {
            DeviceInput::Reading(reading) => {
                if let Err(e) = self.on_reading(reading) {
                    warn!("DeviceEngine[{}]: reading rejected: {}", self.device_id, e);
                }
            }
            DeviceInput::LivenessSignal => self.on_liveness_signal(),
            DeviceInput::LivenessTick => self.on_liveness_tick(),
            DeviceInput::PersistenceTick => {
                self.on_persistence_tick();
            }
            DeviceInput::ForceCommit => {
                self.force_commit();
            }
            DeviceInput::Shutdown => {
                info!("DeviceEngine[{}] shutting down", self.device_id);
                return Handled::Stop;
            }
        }
        Handled::Continue
    }

    // ── Readings ──────────────────────────────────────────────

    /// Classify a reading, report alert changes, refresh the last-known
    /// record and commit if the hourly window is open.
    pub fn on_reading(&mut self, reading: SensorReading) -> Result<Verdict, ValidationError> {
        reading.validate()?;
        self.total_received += 1;
        let now = self.clock.now();

        let verdict = self.analyzer.classify(reading.temperature);
        self.sink.emit(&MonitorEvent::ReadingAnalyzed {
            device_id: self.device_id.clone(),
            verdict: verdict.clone(),
            timestamp: now,
        });

        if verdict.alert_kind != self.last_emitted_alert {
            self.last_emitted_alert = verdict.alert_kind;
            self.sink.emit(&MonitorEvent::AlertChanged(AlertChange::from_verdict(
                &self.device_id,
                &verdict,
            )));
        }

        self.last_reading = Some(reading);
        if let Err(e) = self.store.update_last_known(&self.device_id, &reading, now) {
            error!(
                "DeviceEngine[{}]: last-known update failed: {}",
                self.device_id, e
            );
        }

        debug!(
            "DeviceEngine[{}]: {:.2}\u{00b0}C | received {}",
            self.device_id, reading.temperature, self.total_received
        );

        if self.scheduler.check_due() {
            self.commit();
        }
        Ok(verdict)
    }

    // ── Liveness ──────────────────────────────────────────────

    pub fn on_liveness_signal(&mut self) {
        if let Some(t) = self.liveness.register_signal() {
            self.report_liveness(t);
        }
    }

    pub fn on_liveness_tick(&mut self) {
        if let Some(t) = self.liveness.check_timeout() {
            self.report_liveness(t);
        }
    }

    // ── Persistence ───────────────────────────────────────────

    /// Periodic commit check.  Returns `true` if a reading was committed.
    pub fn on_persistence_tick(&mut self) -> bool {
        if self.last_reading.is_none() {
            debug!("DeviceEngine[{}]: nothing to commit yet", self.device_id);
            return false;
        }
        self.scheduler.check_due() && self.commit()
    }

    /// Commit the last reading immediately, outside the hourly window.
    pub fn force_commit(&mut self) -> bool {
        info!("DeviceEngine[{}]: forced commit", self.device_id);
        self.commit()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn liveness(&self) -> LivenessStatus {
        self.liveness.status()
    }

    pub fn last_reading(&self) -> Option<SensorReading> {
        self.last_reading
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            device_id: self.device_id.clone(),
            total_received: self.total_received,
            total_saved: self.total_saved,
            last_commit_at: self.scheduler.last_commit_at(),
            active_alert: self.analyzer.state().active_alert,
            temperature: self.analyzer.statistics(),
            liveness: self.liveness.status(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    // ── Internal ──────────────────────────────────────────────

    /// Save the last reading.  The scheduler only advances on success,
    /// so a failed commit is retried on the next due check.
    fn commit(&mut self) -> bool {
        let Some(reading) = self.last_reading else {
            debug!("DeviceEngine[{}]: no reading to commit", self.device_id);
            return false;
        };
        let now = self.clock.now();
        let record = PersistedReading {
            device_id: self.device_id.clone(),
            temperature: reading.temperature,
            pressure: reading.pressure,
            altitude: reading.altitude,
            rssi: reading.rssi,
            recorded_at: now,
        };

        match self.store.save_reading(&record) {
            Ok(()) => {
                self.scheduler.record_commit(now);
                self.total_saved += 1;
                info!(
                    "DeviceEngine[{}]: saved {:.2}\u{00b0}C (total {})",
                    self.device_id, reading.temperature, self.total_saved
                );
                self.sink.emit(&MonitorEvent::ReadingPersisted {
                    device_id: self.device_id.clone(),
                    temperature: reading.temperature,
                    recorded_at: now,
                });
                true
            }
            Err(e) => {
                warn!(
                    "DeviceEngine[{}]: commit failed ({}), will retry",
                    self.device_id, e
                );
                false
            }
        }
    }

    fn report_liveness(&mut self, transition: LivenessTransition) {
        let now = self.clock.now();
        let is_online = transition == LivenessTransition::Connected;

        if let Err(e) = self.store.record_liveness(&self.device_id, is_online, now) {
            error!(
                "DeviceEngine[{}]: liveness update failed: {}",
                self.device_id, e
            );
        }
        self.sink.emit(&MonitorEvent::LivenessChanged {
            device_id: self.device_id.clone(),
            is_online,
            timestamp: now,
        });
    }
}
