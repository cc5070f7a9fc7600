//! Device task: one thread, one executor, one engine.
//!
//! Three futures share the thread's `edge-executor`:
//!
//! 1. **Consumer** applies inbox messages to the engine until `Shutdown`.
//! 2. **Liveness ticker** queues a `LivenessTick` every `liveness_tick_ms`.
//! 3. **Persistence ticker** queues a `PersistenceTick` every
//!    `persistence_tick_ms`.
//!
//! Tickers sleep on `async-io-mini` reactor timers and go through the
//! same inbox as external messages, so ticks and readings never race.
//! When the consumer returns the executor is dropped, cancelling both
//! tickers.

use core::time::Duration;
use std::thread::JoinHandle;

use embassy_sync::channel::TrySendError;
use log::{info, warn};

use crate::app::commands::{DeviceInput, SensorReading};
use crate::app::ports::{Clock, EventSink, ReadingStore};
use crate::app::service::{DeviceEngine, EngineStats, Handled};
use crate::error::{Error, Result};

use super::channels::{SharedInbox, new_inbox};

/// Retry interval for queueing `Shutdown` into a full inbox.
const SHUTDOWN_POLL: Duration = Duration::from_millis(1);

// ── Async loops ──────────────────────────────────────────────

async fn consume<C, S, E>(mut engine: DeviceEngine<C, S, E>, inbox: SharedInbox) -> EngineStats
where
    C: Clock + Clone,
    S: ReadingStore,
    E: EventSink,
{
    loop {
        let input = inbox.receive().await;
        if engine.handle(input) == Handled::Stop {
            break;
        }
    }
    engine.stats()
}

/// Queues `input` every `period`.  Waits for room rather than dropping
/// ticks when the inbox is momentarily full.
async fn tick_loop(inbox: SharedInbox, period: Duration, input: DeviceInput) {
    loop {
        async_io_mini::Timer::after(period).await;
        inbox.send(input.clone()).await;
    }
}

fn run_device<C, S, E>(
    engine: DeviceEngine<C, S, E>,
    inbox: SharedInbox,
    liveness_period: Duration,
    persistence_period: Duration,
) -> EngineStats
where
    C: Clock + Clone,
    S: ReadingStore,
    E: EventSink,
{
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    executor
        .spawn(tick_loop(inbox.clone(), liveness_period, DeviceInput::LivenessTick))
        .detach();
    executor
        .spawn(tick_loop(
            inbox.clone(),
            persistence_period,
            DeviceInput::PersistenceTick,
        ))
        .detach();

    info!(
        "Device[{}] task started (liveness {:?}, persistence {:?})",
        engine.device_id(),
        liveness_period,
        persistence_period
    );

    futures_lite::future::block_on(executor.run(consume(engine, inbox)))
}

// ── Handle ───────────────────────────────────────────────────

/// Producer side of a running device task.
pub struct DeviceHandle {
    device_id: String,
    inbox: SharedInbox,
    depth: usize,
    thread: Option<JoinHandle<EngineStats>>,
}

impl DeviceHandle {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Queue an input without blocking.
    pub fn send(&self, input: DeviceInput) -> Result<()> {
        if !self.is_running() {
            return Err(Error::DeviceStopped(self.device_id.clone()));
        }
        if self.inbox.len() >= self.depth {
            warn!("Device[{}]: inbox full, dropping {:?}", self.device_id, input);
            return Err(Error::InboxFull(self.device_id.clone()));
        }
        self.inbox
            .try_send(input)
            .map_err(|_| Error::InboxFull(self.device_id.clone()))
    }

    pub fn reading(&self, reading: SensorReading) -> Result<()> {
        self.send(DeviceInput::Reading(reading))
    }

    pub fn liveness_signal(&self) -> Result<()> {
        self.send(DeviceInput::LivenessSignal)
    }

    pub fn force_commit(&self) -> Result<()> {
        self.send(DeviceInput::ForceCommit)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task after it drains everything queued so far, and
    /// return its final counters.
    pub fn stop(mut self) -> Result<EngineStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<EngineStats> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| Error::DeviceStopped(self.device_id.clone()))?;
        // Poll rather than block: a task that dies with a full inbox would
        // never make room.
        let mut input = DeviceInput::Shutdown;
        while !thread.is_finished() {
            match self.inbox.try_send(input) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    input = back;
                    std::thread::sleep(SHUTDOWN_POLL);
                }
            }
        }
        thread
            .join()
            .map_err(|_| Error::DeviceStopped(self.device_id.clone()))
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.shutdown();
        }
    }
}

// ── Spawn ────────────────────────────────────────────────────

/// Move `engine` onto its own thread and start its tickers.
pub fn spawn_device<C, S, E>(engine: DeviceEngine<C, S, E>) -> Result<DeviceHandle>
where
    C: Clock + Clone + Send + 'static,
    S: ReadingStore + Send + 'static,
    E: EventSink + Send + 'static,
{
    let device_id = engine.device_id().to_string();
    let config = engine.config().clone();
    let inbox = new_inbox();

    let liveness_period = Duration::from_millis(u64::from(config.liveness_tick_ms));
    let persistence_period = Duration::from_millis(u64::from(config.persistence_tick_ms));

    let task_inbox = inbox.clone();
    let thread = std::thread::Builder::new()
        .name(format!("device-{device_id}"))
        .spawn(move || run_device(engine, task_inbox, liveness_period, persistence_period))
        .map_err(|e| {
            warn!("Device[{}]: thread spawn failed: {}", device_id, e);
            Error::DeviceStopped(device_id.clone())
        })?;

    Ok(DeviceHandle {
        device_id,
        inbox,
        depth: config.inbox_depth,
        thread: Some(thread),
    })
}
