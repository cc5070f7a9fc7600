//! Device supervisor.
//!
//! Keeps one [`DeviceHandle`] per device id and routes inbound messages to
//! the right inbox.  Devices never share state; the supervisor only owns
//! the handles.

use std::collections::HashMap;

use log::{info, warn};

use crate::adapters::payload::InboundMessage;
use crate::app::commands::SensorReading;
use crate::app::ports::{Clock, ConfigError, EventSink, ReadingStore};
use crate::app::service::{DeviceEngine, EngineStats};
use crate::config::MonitorConfig;
use crate::error::{Error, Result};

use super::device_task::{DeviceHandle, spawn_device};

pub struct Supervisor {
    config: MonitorConfig,
    devices: HashMap<String, DeviceHandle>,
}

impl Supervisor {
    /// Every device registered later shares `config`.
    pub fn new(config: MonitorConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            devices: HashMap::new(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Build an engine for `device_id` and start its task.
    pub fn register<C, S, E>(&mut self, device_id: &str, clock: C, store: S, sink: E) -> Result<()>
    where
        C: Clock + Clone + Send + 'static,
        S: ReadingStore + Send + 'static,
        E: EventSink + Send + 'static,
    {
        if self.devices.contains_key(device_id) {
            return Err(Error::AlreadyRegistered(device_id.to_string()));
        }
        let engine = DeviceEngine::new(device_id, &self.config, clock, store, sink)?;
        let handle = spawn_device(engine)?;
        self.devices.insert(device_id.to_string(), handle);
        info!("Supervisor: registered {} ({} devices)", device_id, self.devices.len());
        Ok(())
    }

    pub fn is_registered(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn on_reading(&self, device_id: &str, reading: SensorReading) -> Result<()> {
        self.handle(device_id)?.reading(reading)
    }

    pub fn on_liveness_signal(&self, device_id: &str) -> Result<()> {
        self.handle(device_id)?.liveness_signal()
    }

    pub fn force_commit(&self, device_id: &str) -> Result<()> {
        self.handle(device_id)?.force_commit()
    }

    /// Route a decoded transport message.
    pub fn dispatch(&self, msg: InboundMessage) -> Result<()> {
        match msg {
            InboundMessage::Reading { device_id, reading } => self.on_reading(&device_id, reading),
            InboundMessage::Heartbeat { device_id } => self.on_liveness_signal(&device_id),
        }
    }

    /// Stop one device after it drains its inbox.
    pub fn stop(&mut self, device_id: &str) -> Result<EngineStats> {
        let handle = self
            .devices
            .remove(device_id)
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))?;
        handle.stop()
    }

    /// Stop every device.  Devices whose task already died are logged
    /// and left out of the result.
    pub fn stop_all(&mut self) -> Vec<EngineStats> {
        let mut out = Vec::with_capacity(self.devices.len());
        for (id, handle) in self.devices.drain() {
            match handle.stop() {
                Ok(stats) => out.push(stats),
                Err(e) => warn!("Supervisor: {} did not stop cleanly: {}", id, e),
            }
        }
        out.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        out
    }

    fn handle(&self, device_id: &str) -> Result<&DeviceHandle> {
        self.devices
            .get(device_id)
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))
    }
}
