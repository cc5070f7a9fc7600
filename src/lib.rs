//! Fridge monitor library.
//!
//! Temperature-pattern analysis, heartbeat liveness and hourly persistence
//! for remote refrigeration units.  Exposes the pure-logic core for
//! integration testing and for embedding in other hosts; the binary in
//! `main.rs` is one such host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod liveness;
pub mod runtime;
pub mod scheduler;

pub use error::{Error, Result};
