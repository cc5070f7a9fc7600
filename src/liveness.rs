//! Liveness monitor.
//!
//! Tracks heartbeats from the appliance independently of its data stream.
//!
//! ## Lifecycle
//!
//! 1. Created offline with no signal recorded.  Ticks are no-ops until the
//!    first heartbeat arrives, so a device that never spoke is never
//!    reported as disconnected.
//! 2. A heartbeat while offline moves it online (one `Connected` edge).
//! 3. Each tick compares the silence against the timeout; exceeding it
//!    (strictly) while online moves it offline (one `Disconnected` edge).
//! 4. Offline is latched until the next heartbeat.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;

use crate::app::ports::Clock;

/// Edge reported when the online flag flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTransition {
    Connected,
    Disconnected,
}

/// Point-in-time liveness view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LivenessStatus {
    pub is_online: bool,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub seconds_since_last_signal: Option<f64>,
}

pub struct LivenessMonitor<C: Clock> {
    clock: C,
    timeout_secs: u32,
    last_signal_at: Option<DateTime<Utc>>,
    is_online: bool,
}

impl<C: Clock> LivenessMonitor<C> {
    pub fn new(timeout_secs: u32, clock: C) -> Self {
        info!("LivenessMonitor: timeout {}s", timeout_secs);
        Self {
            clock,
            timeout_secs,
            last_signal_at: None,
            is_online: false,
        }
    }

    /// Record a heartbeat.  Returns `Connected` only on the offline → online edge.
    pub fn register_signal(&mut self) -> Option<LivenessTransition> {
        let now = self.clock.now();
        let was_offline = !self.is_online;

        self.last_signal_at = Some(now);
        self.is_online = true;

        debug!("Heartbeat at {}", now.format("%H:%M:%S"));
        if was_offline {
            info!("Device CONNECTED - heartbeat received");
            return Some(LivenessTransition::Connected);
        }
        None
    }

    /// Periodic check.  Returns `Disconnected` only on the online → offline edge.
    pub fn check_timeout(&mut self) -> Option<LivenessTransition> {
        let elapsed = self.seconds_since_last_signal()?;

        if elapsed > f64::from(self.timeout_secs) && self.is_online {
            self.is_online = false;
            error!("Device DISCONNECTED - no heartbeat for {:.0}s", elapsed);
            return Some(LivenessTransition::Disconnected);
        }
        None
    }

    pub fn status(&self) -> LivenessStatus {
        LivenessStatus {
            is_online: self.is_online,
            last_signal_at: self.last_signal_at,
            seconds_since_last_signal: self.seconds_since_last_signal(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    fn seconds_since_last_signal(&self) -> Option<f64> {
        let last = self.last_signal_at?;
        let elapsed = self.clock.now() - last;
        Some(elapsed.num_milliseconds() as f64 / 1000.0)
    }
}
