//! Hourly persistence scheduler.
//!
//! Decides when the current reading should be committed to durable
//! storage.  Commits are aligned to wall-clock hour boundaries (local
//! time), not to a rolling 60-minute window:
//!
//! ```text
//!   09:59:58   09:59:59 | 10:00:00 ... 10:00:04 | 10:00:05 ... 10:59:59 | 11:00:00
//!        not due        |    commit window      |        not due        |  window
//! ```
//!
//! A decision is positive when the local time is inside the 5-second
//! window at minute 0 and at least 59 minutes have passed since the last
//! confirmed commit.  The scheduler never touches storage: the caller
//! performs the commit and reports success through [`record_commit`].
//!
//! [`record_commit`]: PersistenceScheduler::record_commit

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use log::{debug, info};

use crate::app::ports::Clock;

// ═══════════════════════════════════════════════════════════════
//  Policy constants
// ═══════════════════════════════════════════════════════════════

/// Width of the acceptance window at the top of each hour.
pub const COMMIT_WINDOW_SECS: u32 = 5;

/// Minimum gap between two commits.  One minute short of an hour so
/// tick drift cannot skip an hour, while still ruling out a double
/// commit inside the same window.
pub const MIN_COMMIT_GAP_SECS: i64 = 3540;

/// Pure due-check.  `now` must already be in the local offset.
pub fn is_due(last_commit: Option<DateTime<Utc>>, now: DateTime<FixedOffset>) -> bool {
    if now.minute() != 0 || now.second() >= COMMIT_WINDOW_SECS {
        return false;
    }
    match last_commit {
        None => true,
        Some(last) => (now.with_timezone(&Utc) - last).num_seconds() >= MIN_COMMIT_GAP_SECS,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct PersistenceScheduler<C: Clock> {
    clock: C,
    offset: FixedOffset,
    last_commit_at: Option<DateTime<Utc>>,
}

impl<C: Clock> PersistenceScheduler<C> {
    /// `offset` is the local UTC offset used to find hour boundaries.
    pub fn new(offset: FixedOffset, clock: C) -> Self {
        info!("PersistenceScheduler: local offset {}", offset);
        Self {
            clock,
            offset,
            last_commit_at: None,
        }
    }

    /// Is a commit due right now?
    pub fn check_due(&self) -> bool {
        let now = self.clock.now().with_timezone(&self.offset);
        let due = is_due(self.last_commit_at, now);
        if due {
            debug!("Commit due at {}", now.format("%H:%M:%S"));
        }
        due
    }

    /// Record a confirmed commit.  Only call after storage reported success.
    pub fn record_commit(&mut self, at: DateTime<Utc>) {
        self.last_commit_at = Some(at);
        info!(
            "Hourly commit recorded at {}",
            at.with_timezone(&self.offset).format("%H:%M:%S")
        );
    }

    pub fn last_commit_at(&self) -> Option<DateTime<Utc>> {
        self.last_commit_at
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
