//! Fixed-capacity ring buffer of recent temperature samples.
//!
//! Backed by a stack-allocated `heapless::Deque` sized for the largest
//! permitted window; the configured capacity bounds how much of it is used.
//! Samples are pushed in arrival order, so timestamps are non-decreasing
//! from front (oldest) to back (newest).

use chrono::{DateTime, Utc};
use heapless::Deque;
use serde::Serialize;

/// Hard ceiling on window capacity (≈ 2 h at a 15 s sample interval).
pub const WINDOW_MAX: usize = 512;

/// One temperature sample.  Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

/// Summary of the samples currently held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub count: usize,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Minutes between the oldest and newest sample.
    pub span_minutes: f64,
}

pub struct ReadingWindow {
    samples: Deque<Reading, WINDOW_MAX>,
    capacity: usize,
}

impl ReadingWindow {
    /// `capacity` is clamped to `1..=WINDOW_MAX`; config validation
    /// rejects out-of-range values before they get here.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, WINDOW_MAX),
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, reading: Reading) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        // Cannot fail: len < capacity <= WINDOW_MAX after the eviction above.
        let _ = self.samples.push_back(reading);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest sample.
    pub fn last(&self) -> Option<&Reading> {
        self.samples.back()
    }

    /// The sample immediately before the newest one.
    pub fn previous(&self) -> Option<&Reading> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        self.samples.iter().nth(n - 2)
    }

    /// The newest `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Reading> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip)
    }

    /// All samples with `timestamp >= cutoff`, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &Reading> {
        self.samples.iter().filter(move |r| r.timestamp >= cutoff)
    }

    /// Mean temperature of the newest `n` samples (or all, if fewer).
    pub fn mean_of_recent(&self, n: usize) -> Option<f64> {
        let (sum, count) = self
            .recent(n)
            .fold((0.0, 0usize), |(s, c), r| (s + r.temperature, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn stats(&self) -> Option<WindowStats> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for r in self.samples.iter() {
            min = min.min(r.temperature);
            max = max.max(r.temperature);
            sum += r.temperature;
        }

        let span = last.timestamp - first.timestamp;
        Some(WindowStats {
            count: self.samples.len(),
            current: last.temperature,
            min,
            max,
            mean: sum / self.samples.len() as f64,
            span_minutes: span.num_milliseconds() as f64 / 60_000.0,
        })
    }
}
