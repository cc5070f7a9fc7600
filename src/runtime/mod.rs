//! Per-device runtime.
//!
//! Each monitored device runs on its own thread with a single-threaded
//! async executor.  Everything that touches a device's engine (readings,
//! heartbeats, timer ticks) goes through one bounded inbox and is applied
//! in arrival order by one consumer task, so the engine needs no lock.
//!
//! ```text
//!  Supervisor ──try_send──▶ ┌──────────── device thread ─────────────┐
//!                           │  inbox ──▶ consumer ──▶ DeviceEngine    │
//!                           │    ▲                                    │
//!                           │    ├── liveness ticker (1 s)            │
//!                           │    └── persistence ticker (60 s)        │
//!                           └─────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod device_task;
pub mod supervisor;

pub use device_task::{DeviceHandle, spawn_device};
pub use supervisor::Supervisor;
