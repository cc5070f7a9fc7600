//! Device inbox channel.
//!
//! A bounded `embassy-sync` MPMC channel per device.  Producers on any
//! thread `try_send`; the device's consumer task `receive().await`s and
//! wakes as soon as something arrives.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::commands::DeviceInput;
use crate::config::MAX_INBOX_DEPTH;

/// Inbox for one device.  The const capacity is the ceiling; the
/// configured depth is enforced by the producer side.
pub type Inbox = Channel<CriticalSectionRawMutex, DeviceInput, MAX_INBOX_DEPTH>;

/// Inbox shared between the device thread and its producers.
pub type SharedInbox = Arc<Inbox>;

pub fn new_inbox() -> SharedInbox {
    Arc::new(Channel::new())
}
