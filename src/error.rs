//! Unified error types for the fridge monitor.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! supervisor and the host binary handle failures uniformly.  Port-level
//! errors ([`ConfigError`], [`StorageError`]) live next to their traits in
//! [`crate::app::ports`].

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An inbound message was malformed or physically implausible.
    Validation(ValidationError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The record store failed.
    Storage(StorageError),
    /// The device's inbox is full; the message was dropped.
    InboxFull(String),
    /// No engine is registered for this device.
    UnknownDevice(String),
    /// An engine is already registered under this id.
    AlreadyRegistered(String),
    /// The device's task has already stopped.
    DeviceStopped(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::InboxFull(id) => write!(f, "inbox full for device {id}"),
            Self::UnknownDevice(id) => write!(f, "unknown device {id}"),
            Self::AlreadyRegistered(id) => write!(f, "device {id} already registered"),
            Self::DeviceStopped(id) => write!(f, "device {id} has stopped"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Rejections raised at the transport boundary.  Nothing that fails here
/// ever reaches the analysis core.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The payload was not valid JSON or had the wrong shape.
    Malformed(String),
    /// A required field was absent.
    MissingField(&'static str),
    /// A numeric field was NaN or infinite.
    NotFinite(&'static str),
    /// Temperature outside the sensor's physical range.
    TemperatureOutOfRange(f64),
    /// The topic does not match any known route.
    UnknownTopic(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(why) => write!(f, "malformed payload: {why}"),
            Self::MissingField(name) => write!(f, "missing field {name}"),
            Self::NotFinite(name) => write!(f, "field {name} is not finite"),
            Self::TemperatureOutOfRange(t) => {
                write!(f, "temperature {t} outside plausible range")
            }
            Self::UnknownTopic(topic) => write!(f, "unknown topic {topic}"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
