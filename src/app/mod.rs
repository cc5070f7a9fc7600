//! Application core: pure domain logic, zero I/O.
//!
//! Inputs ([`commands`]), outputs ([`events`]), the port traits the core
//! talks through ([`ports`]) and the per-device engine that ties analysis,
//! liveness and persistence together ([`service`]).  Everything here is
//! testable with in-memory adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
