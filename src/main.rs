//! Fridge monitor: host entry point.
//!
//! Reads transport messages from stdin, one per line, and feeds them to a
//! supervisor that runs one engine per device:
//!
//! ```text
//! fridge/<id>/sensor_data {"device_id":"<id>","temperature":4.2,...}
//! fridge/<id>/heartbeat   {"device_id":"<id>","status":"alive"}
//! commit <id>
//! ```
//!
//! Devices are registered on their first message.  At end of input every
//! device is stopped and the final counters plus the stored records are
//! printed as JSON.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  stdin ──▶ payload::decode ──▶ Supervisor ──▶ device tasks │
//! │                                   │                        │
//! │               SystemClock · MemoryStore · LogEventSink     │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::io::BufRead;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fridge_monitor::Error;
use fridge_monitor::adapters::log_sink::LogEventSink;
use fridge_monitor::adapters::memory_store::MemoryStore;
use fridge_monitor::adapters::payload;
use fridge_monitor::adapters::time::SystemClock;
use fridge_monitor::config::MonitorConfig;
use fridge_monitor::runtime::Supervisor;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fridge_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env().context("invalid monitor configuration")?;
    info!("Config: {:?}", config);

    let store = Arc::new(Mutex::new(MemoryStore::new()));
    let mut supervisor = Supervisor::new(config)?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = handle_line(&mut supervisor, &store, line) {
            warn!("Dropped line: {}", e);
        }
    }

    info!("End of input, stopping devices");
    let stats = supervisor.stop_all();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    let store = store
        .lock()
        .map_err(|_| anyhow::anyhow!("record store lock poisoned"))?;
    println!("{}", store.to_json()?);
    Ok(())
}

fn handle_line(
    supervisor: &mut Supervisor,
    store: &Arc<Mutex<MemoryStore>>,
    line: &str,
) -> fridge_monitor::Result<()> {
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    if head == "commit" {
        return supervisor.force_commit(rest.trim());
    }

    let msg = payload::decode(head, rest.trim().as_bytes())?;
    let device_id = msg.device_id().to_string();
    if !supervisor.is_registered(&device_id) {
        match supervisor.register(&device_id, SystemClock, store.clone(), LogEventSink::new()) {
            Ok(()) | Err(Error::AlreadyRegistered(_)) => {}
            Err(e) => return Err(e),
        }
    }
    supervisor.dispatch(msg)
}
