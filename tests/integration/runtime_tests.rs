//! Integration tests for the per-device runtime: supervisor routing,
//! in-order delivery, ticker-driven liveness and clean shutdown.
//!
//! Device tasks run on real threads; the engine's clock is manual, so the
//! only real waiting is for a few short tick periods.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fridge_monitor::Error;
use fridge_monitor::adapters::channel_sink::ChannelSink;
use fridge_monitor::adapters::log_sink::LogEventSink;
use fridge_monitor::adapters::memory_store::MemoryStore;
use fridge_monitor::app::commands::SensorReading;
use fridge_monitor::app::events::MonitorEvent;
use fridge_monitor::app::ports::EventSink;
use fridge_monitor::config::MonitorConfig;
use fridge_monitor::runtime::Supervisor;

use super::mock_ports::{clock_at, utc_config};

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        liveness_tick_ms: 5,
        persistence_tick_ms: 5,
        inbox_depth: 64,
        ..utc_config()
    }
}

/// Wait for the first event matching `pred`, skipping others.
fn wait_for(rx: &Receiver<MonitorEvent>, pred: impl Fn(&MonitorEvent) -> bool) -> MonitorEvent {
    let deadline = Instant::now() + WAIT;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(e) if pred(&e) => return e,
            Ok(_) => continue,
            Err(e) => panic!("no matching event within {:?}: {:?}", WAIT, e),
        }
    }
}

#[test]
fn readings_applied_in_arrival_order() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    let (sink, rx) = ChannelSink::pair();
    sup.register("fridge-1", clock_at(9, 10, 0), MemoryStore::new(), sink)
        .unwrap();

    // Two-decimal values survive the verdict's rounding unchanged.
    let temps: Vec<f64> = (200..240).map(|c| f64::from(c) / 100.0).collect();
    for t in &temps {
        sup.on_reading("fridge-1", SensorReading::temperature(*t)).unwrap();
    }
    let stats = sup.stop("fridge-1").unwrap();
    assert_eq!(stats.total_received, 40);

    let seen: Vec<f64> = rx
        .try_iter()
        .filter_map(|e| match e {
            MonitorEvent::ReadingAnalyzed { verdict, .. } => Some(verdict.current_temp),
            _ => None,
        })
        .collect();
    assert_eq!(seen, temps);
}

#[test]
fn liveness_ticker_detects_silence() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    let clock = clock_at(9, 0, 0);
    let (sink, rx) = ChannelSink::pair();
    sup.register("fridge-1", clock.clone(), MemoryStore::new(), sink)
        .unwrap();

    sup.on_liveness_signal("fridge-1").unwrap();
    let online = wait_for(&rx, |e| matches!(e, MonitorEvent::LivenessChanged { .. }));
    assert!(matches!(online, MonitorEvent::LivenessChanged { is_online: true, .. }));

    // No heartbeat for longer than the timeout; the ticker notices.
    clock.advance_secs(7);
    let offline = wait_for(&rx, |e| matches!(e, MonitorEvent::LivenessChanged { .. }));
    assert!(matches!(offline, MonitorEvent::LivenessChanged { is_online: false, .. }));

    let stats = sup.stop("fridge-1").unwrap();
    assert!(!stats.liveness.is_online);
}

#[test]
fn persistence_ticker_commits_on_the_hour() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    let clock = clock_at(9, 59, 58);
    let store = Arc::new(Mutex::new(MemoryStore::new()));
    let (sink, rx) = ChannelSink::pair();
    sup.register("fridge-1", clock.clone(), store.clone(), sink)
        .unwrap();

    sup.on_reading("fridge-1", SensorReading::temperature(3.3)).unwrap();
    wait_for(&rx, |e| matches!(e, MonitorEvent::ReadingAnalyzed { .. }));

    clock.advance_secs(3); // 10:00:01
    wait_for(&rx, |e| matches!(e, MonitorEvent::ReadingPersisted { .. }));

    sup.stop_all();
    let store = store.lock().unwrap();
    assert_eq!(store.reading_count("fridge-1"), 1);
}

#[test]
fn devices_are_independent() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    let store = Arc::new(Mutex::new(MemoryStore::new()));
    for id in ["fridge-b", "fridge-a"] {
        sup.register(id, clock_at(9, 10, 0), store.clone(), LogEventSink::new())
            .unwrap();
    }

    sup.on_reading("fridge-a", SensorReading::temperature(3.0)).unwrap();
    sup.on_reading("fridge-a", SensorReading::temperature(3.1)).unwrap();
    sup.on_reading("fridge-b", SensorReading::temperature(5.0)).unwrap();
    sup.force_commit("fridge-a").unwrap();

    let stats = sup.stop_all();
    let ids: Vec<&str> = stats.iter().map(|s| s.device_id.as_str()).collect();
    assert_eq!(ids, vec!["fridge-a", "fridge-b"]);
    assert_eq!(stats[0].total_received, 2);
    assert_eq!(stats[0].total_saved, 1);
    assert_eq!(stats[1].total_received, 1);
    assert_eq!(stats[1].total_saved, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.reading_count("fridge-a"), 1);
    assert_eq!(store.latest_readings("fridge-a", 1)[0].temperature, 3.1);
    assert_eq!(
        store.device_status("fridge-b").unwrap().last_reading,
        Some(SensorReading::temperature(5.0))
    );
}

#[test]
fn routing_errors() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    assert_eq!(
        sup.on_liveness_signal("nobody"),
        Err(Error::UnknownDevice("nobody".into()))
    );

    sup.register("fridge-1", clock_at(9, 0, 0), MemoryStore::new(), LogEventSink::new())
        .unwrap();
    let dup = sup.register("fridge-1", clock_at(9, 0, 0), MemoryStore::new(), LogEventSink::new());
    assert_eq!(dup, Err(Error::AlreadyRegistered("fridge-1".into())));

    sup.stop("fridge-1").unwrap();
    assert!(!sup.is_registered("fridge-1"));
    assert!(matches!(
        sup.on_reading("fridge-1", SensorReading::temperature(3.0)),
        Err(Error::UnknownDevice(_))
    ));
}

#[test]
fn invalid_config_rejected_up_front() {
    let bad = MonitorConfig {
        inbox_depth: 0,
        ..MonitorConfig::default()
    };
    assert!(Supervisor::new(bad).is_err());
}

/// Sink that parks the device task inside its first `emit` until
/// released, then panics.
struct GatedSink {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl EventSink for GatedSink {
    fn emit(&mut self, _event: &MonitorEvent) {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        panic!("event sink failed");
    }
}

#[test]
fn stop_returns_when_task_dies_with_full_inbox() {
    let mut sup = Supervisor::new(fast_config()).unwrap();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = GatedSink {
        entered: entered_tx,
        release: release_rx,
    };
    sup.register("fridge-1", clock_at(9, 0, 0), MemoryStore::new(), sink)
        .unwrap();

    sup.on_reading("fridge-1", SensorReading::temperature(3.0)).unwrap();
    entered_rx.recv_timeout(WAIT).unwrap();

    // The task is stuck in the sink; fill its inbox.
    let full = loop {
        if let Err(e) = sup.on_reading("fridge-1", SensorReading::temperature(3.0)) {
            break e;
        }
    };
    assert_eq!(full, Error::InboxFull("fridge-1".into()));

    release_tx.send(()).unwrap();
    assert_eq!(
        sup.stop("fridge-1"),
        Err(Error::DeviceStopped("fridge-1".into()))
    );
}
