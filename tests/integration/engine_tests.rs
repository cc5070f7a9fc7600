//! Integration tests for the DeviceEngine → analyzer / liveness / scheduler
//! pipeline.
//!
//! Each test drives one engine with a manual clock, the way the device
//! task would, and asserts on what reached the sink and the store.

use chrono::Duration;

use fridge_monitor::adapters::memory_store::MemoryStore;
use fridge_monitor::adapters::time::ManualClock;
use fridge_monitor::analysis::AlertKind;
use fridge_monitor::app::commands::{DeviceInput, SensorReading};
use fridge_monitor::app::ports::Clock;
use fridge_monitor::app::service::{DeviceEngine, Handled};

use super::mock_ports::{FlakyStore, RecordingSink, at, clock_at, utc_config};

const SAMPLE_SECS: i64 = 15;

fn engine_with<S: fridge_monitor::app::ports::ReadingStore>(
    clock: &ManualClock,
    store: S,
) -> DeviceEngine<ManualClock, S, RecordingSink> {
    DeviceEngine::new("fridge-1", &utc_config(), clock.clone(), store, RecordingSink::new())
        .unwrap()
}

/// Feed `temps` one sample interval apart, first one at the current time.
fn feed<S: fridge_monitor::app::ports::ReadingStore>(
    engine: &mut DeviceEngine<ManualClock, S, RecordingSink>,
    clock: &ManualClock,
    temps: impl IntoIterator<Item = f64>,
) {
    for t in temps {
        engine.on_reading(SensorReading::temperature(t)).unwrap();
        clock.advance_secs(SAMPLE_SECS);
    }
}

// ── A full hour: door opening, recovery, two hourly commits ──

#[test]
fn hour_of_monitoring_with_door_opening() {
    let clock = clock_at(9, 58, 0);
    let mut engine = engine_with(&clock, MemoryStore::new());

    // 09:58:00 .. 11:00:00 inclusive; door open 10:20:00 .. 10:20:45.
    let door = at(10, 20, 0)..at(10, 21, 0);
    for _ in 0..=248 {
        let t = if door.contains(&clock.now()) { 7.5 } else { 3.0 };
        engine.on_reading(SensorReading::temperature(t)).unwrap();
        clock.advance_secs(SAMPLE_SECS);
    }

    let sink = engine.sink();
    assert_eq!(
        sink.alert_changes(),
        vec![(AlertKind::DoorOpening, false), (AlertKind::None, true)]
    );
    assert_eq!(sink.persisted_at(), vec![at(10, 0, 0), at(11, 0, 0)]);
    assert_eq!(sink.analyzed_count(), 249);

    let store = engine.store();
    assert_eq!(store.reading_count("fridge-1"), 2);
    let status = store.device_status("fridge-1").unwrap();
    assert_eq!(status.total_readings, 249);

    let stats = engine.stats();
    assert_eq!(stats.total_received, 249);
    assert_eq!(stats.total_saved, 2);
    assert_eq!(stats.last_commit_at, Some(at(11, 0, 0)));
    assert_eq!(stats.active_alert, AlertKind::None);
}

// ── Critical drift is reported once, then clears ────────────

#[test]
fn critical_drift_reported_once_then_stabilises() {
    let clock = clock_at(9, 10, 0);
    let mut engine = engine_with(&clock, MemoryStore::new());

    feed(&mut engine, &clock, std::iter::repeat_n(2.0, 40));
    feed(&mut engine, &clock, (1..=40).map(|i| 2.0 + 0.05 * f64::from(i)));
    feed(&mut engine, &clock, std::iter::repeat_n(4.5, 10));
    assert_eq!(engine.stats().active_alert, AlertKind::CriticalIncrease);

    feed(&mut engine, &clock, [2.5]);
    assert_eq!(
        engine.sink().alert_changes(),
        vec![(AlertKind::CriticalIncrease, false), (AlertKind::None, true)]
    );
}

// ── Failed commits ──────────────────────────────────────────

#[test]
fn failed_commit_retried_at_next_hour() {
    let clock = clock_at(10, 0, 0);
    let mut engine = engine_with(&clock, FlakyStore::failing(1));

    // 10:00:00 .. 11:00:00 inclusive.
    feed(&mut engine, &clock, std::iter::repeat_n(3.0, 241));

    let store = engine.store();
    assert_eq!(store.save_attempts, 2);
    assert_eq!(store.inner.readings().len(), 1);
    assert_eq!(store.inner.readings()[0].recorded_at, at(11, 0, 0));
    assert_eq!(engine.stats().last_commit_at, Some(at(11, 0, 0)));
    assert_eq!(engine.sink().persisted_at(), vec![at(11, 0, 0)]);
}

#[test]
fn failed_commit_retried_by_tick_inside_window() {
    let clock = clock_at(10, 0, 1);
    let mut engine = engine_with(&clock, FlakyStore::failing(1));

    engine.on_reading(SensorReading::temperature(3.0)).unwrap();
    assert_eq!(engine.stats().total_saved, 0);

    clock.advance_secs(2);
    assert!(engine.on_persistence_tick());
    assert_eq!(engine.store().save_attempts, 2);
    assert_eq!(engine.stats().last_commit_at, Some(at(10, 0, 3)));
}

// ── Liveness ────────────────────────────────────────────────

#[test]
fn heartbeat_gap_disconnects_once_and_reconnects() {
    let clock = clock_at(9, 0, 0);
    let mut engine = engine_with(&clock, MemoryStore::new());

    // Heartbeat every 5 s for a minute, ticking every second.
    for s in 0..60 {
        if s % 5 == 0 {
            engine.on_liveness_signal();
        }
        engine.on_liveness_tick();
        clock.advance_secs(1);
    }
    assert_eq!(engine.sink().liveness_flips(), vec![true]);

    // Silence well past the timeout.
    for _ in 0..20 {
        engine.on_liveness_tick();
        clock.advance_secs(1);
    }
    assert_eq!(engine.sink().liveness_flips(), vec![true, false]);
    assert!(!engine.liveness().is_online);

    engine.on_liveness_signal();
    assert_eq!(engine.sink().liveness_flips(), vec![true, false, true]);
    assert!(engine.store().device_status("fridge-1").unwrap().is_online);
}

#[test]
fn readings_do_not_count_as_heartbeats() {
    let clock = clock_at(9, 0, 0);
    let mut engine = engine_with(&clock, MemoryStore::new());

    engine.on_liveness_signal();
    for _ in 0..10 {
        engine.on_reading(SensorReading::temperature(3.0)).unwrap();
        clock.advance(Duration::seconds(1));
        engine.on_liveness_tick();
    }
    assert_eq!(engine.sink().liveness_flips(), vec![true, false]);
}

// ── Input dispatch ──────────────────────────────────────────

#[test]
fn handle_applies_inputs_in_order() {
    let clock = clock_at(10, 17, 0);
    let mut engine = engine_with(&clock, MemoryStore::new());

    let inputs = [
        DeviceInput::LivenessSignal,
        DeviceInput::Reading(SensorReading::temperature(f64::NAN)),
        DeviceInput::Reading(SensorReading {
            temperature: 4.2,
            pressure: Some(63408.0),
            altitude: Some(3783.08),
            rssi: Some(-71),
        }),
        DeviceInput::LivenessTick,
        DeviceInput::PersistenceTick,
        DeviceInput::ForceCommit,
    ];
    for input in inputs {
        assert_eq!(engine.handle(input), Handled::Continue);
    }
    assert_eq!(engine.handle(DeviceInput::Shutdown), Handled::Stop);

    // The NaN reading never reached the analyzer.
    assert_eq!(engine.stats().total_received, 1);

    let saved = engine.store().readings();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].temperature, 4.2);
    assert_eq!(saved[0].rssi, Some(-71));
    assert_eq!(saved[0].recorded_at, at(10, 17, 0));
}
