//! Channel event sink adapter.
//!
//! Forwards every [`MonitorEvent`] into a `std::sync::mpsc` channel so a
//! consumer on another thread (a UI, a notifier) can react to it.  The
//! consumer is a plain blocking thread, not a task on the device's
//! executor, so it waits with `recv` instead of awaiting an async channel.
//! The channel is unbounded: a slow consumer never stalls the device task.  A
//! closed receiver is not an error for the engine: events are dropped and
//! the drop is logged once.

use std::sync::mpsc::{self, Receiver, Sender};

use log::warn;

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<MonitorEvent>,
    disconnected: bool,
}

impl ChannelSink {
    /// A sink plus the receiving end.
    pub fn pair() -> (Self, Receiver<MonitorEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    pub fn new(tx: Sender<MonitorEvent>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: &MonitorEvent) {
        if self.tx.send(event.clone()).is_err() && !self.disconnected {
            self.disconnected = true;
            warn!("ChannelSink: receiver gone, dropping events");
        }
    }
}

/// Fan one event out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &MonitorEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
