//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every monitoring event through the
//! `log` facade.  Alert and liveness changes are raised above `info` so
//! they stand out in a filtered log.

use log::{debug, error, info, warn};

use crate::analysis::AlertKind;
use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::ReadingAnalyzed {
                device_id, verdict, ..
            } => {
                debug!(
                    "READING | {} | T={:.2}\u{00b0}C base={} \u{0394}={:+.2} | up={} down={} | {}",
                    device_id,
                    verdict.current_temp,
                    verdict
                        .baseline_temp
                        .map_or_else(|| "-".to_string(), |b| format!("{:.2}", b)),
                    verdict.temp_change,
                    verdict.consecutive_increases,
                    verdict.consecutive_decreases,
                    verdict.alert_kind,
                );
            }
            MonitorEvent::AlertChanged(change) => match change.alert_kind {
                AlertKind::None => info!("ALERT | {} | cleared: {}", change.device_id, change.message),
                AlertKind::DoorOpening => {
                    warn!("ALERT | {} | {}: {}", change.device_id, change.alert_kind, change.message)
                }
                _ => error!("ALERT | {} | {}: {}", change.device_id, change.alert_kind, change.message),
            },
            MonitorEvent::LivenessChanged {
                device_id,
                is_online,
                timestamp,
            } => {
                let state = if *is_online { "ONLINE" } else { "OFFLINE" };
                if *is_online {
                    info!("LIVENESS | {} | {} at {}", device_id, state, timestamp);
                } else {
                    warn!("LIVENESS | {} | {} at {}", device_id, state, timestamp);
                }
            }
            MonitorEvent::ReadingPersisted {
                device_id,
                temperature,
                recorded_at,
            } => {
                info!(
                    "SAVED | {} | {:.2}\u{00b0}C at {}",
                    device_id, temperature, recorded_at
                );
            }
        }
    }
}
