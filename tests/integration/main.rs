//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against in-memory adapters and a manual clock.  No broker, database or
//! real-time waits beyond a few tick periods are needed.

mod engine_tests;
mod mock_ports;
mod runtime_tests;
mod transport_tests;
