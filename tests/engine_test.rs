//! Integration tests for the window statistics engine

use approx::assert_relative_eq;
use statrs::statistics::Statistics;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use synheart_window_stats::{
    source::demo_batch, Accumulator, ChannelEmitter, Disposition, EngineConfig, EngineWorker,
    Event, EventError, LateChannel, LateDataPolicy, Stats, Window, WindowAssigner,
    WindowedAggregationEngine,
};

type Collected = Arc<Mutex<Vec<(String, Window, Stats)>>>;

fn collecting_engine(config: EngineConfig) -> (WindowedAggregationEngine, Collected) {
    let mut engine = WindowedAggregationEngine::new(config).expect("valid config");
    let collected: Collected = Arc::default();
    let sink = Arc::clone(&collected);
    engine.subscribe(move |key: &str, window: &Window, stats: &Stats| {
        sink.lock().unwrap().push((key.to_string(), *window, *stats));
    });
    (engine, collected)
}

fn emissions_for(collected: &Collected, key: &str) -> Vec<(Window, Stats)> {
    collected
        .lock()
        .unwrap()
        .iter()
        .filter(|(k, _, _)| k == key)
        .map(|(_, w, s)| (*w, *s))
        .collect()
}

#[test]
fn test_assignment_is_deterministic_and_contains_time() {
    let assigner = WindowAssigner::new(Duration::from_secs(60)).unwrap();
    let mut t = 0.0;
    while t < 600.0 {
        let first = assigner.assign(t).unwrap();
        assert_eq!(first, assigner.assign(t).unwrap());
        assert!(first.start_millis() as f64 / 1000.0 <= t);
        assert!(t < first.end_millis() as f64 / 1000.0);
        assert_eq!(first.end_millis() - first.start_millis(), 60_000);
        t += 7.3;
    }
}

#[test]
fn test_partial_aggregates_merge_to_whole() {
    let values = [20.0, 25.0, 20.5, 21.0, 24.5, 20.3, 22.0, 26.0, 23.0];
    let whole = Accumulator::from_values(values);

    // Even/odd split, as two parallel partial aggregations would see it.
    let evens = Accumulator::from_values(values.iter().step_by(2).copied());
    let odds = Accumulator::from_values(values.iter().skip(1).step_by(2).copied());
    let merged = evens.merge(&odds);

    assert_eq!(merged.count(), whole.count());
    assert_relative_eq!(merged.sum(), whole.sum(), epsilon = 1e-9);
    assert_relative_eq!(merged.sum_of_squares(), whole.sum_of_squares(), epsilon = 1e-9);
}

#[test]
fn test_singleton_window_reports_nan_spread() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 0.0)).unwrap();
    engine.flush();

    let emitted = emissions_for(&collected, "sensor_A");
    assert_eq!(emitted.len(), 1);
    let stats = emitted[0].1;
    assert_eq!(stats.count, 1);
    assert_eq!(stats.mean, 20.0);
    assert!(stats.variance.is_nan());
    assert!(stats.std_dev.is_nan());
}

#[test]
fn test_two_reading_example() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 0.0)).unwrap();
    engine.process(Event::new("sensor_A", 20.5, 5.0)).unwrap();
    assert!(collected.lock().unwrap().is_empty());

    // Advance the watermark past 60s.
    engine.process(Event::new("sensor_A", 21.0, 61.0)).unwrap();

    let emitted = emissions_for(&collected, "sensor_A");
    assert_eq!(emitted.len(), 1);
    let (window, stats) = emitted[0];
    assert_eq!(window.start_millis(), 0);
    assert_eq!(window.end_millis(), 60_000);
    assert_eq!(stats.count, 2);
    assert_relative_eq!(stats.mean, 20.25);
    assert_relative_eq!(stats.variance, 0.125);
    assert_relative_eq!(stats.std_dev, 0.3536, epsilon = 1e-4);
}

#[test]
fn test_late_reading_never_emits_twice() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 10.0)).unwrap();
    engine.process(Event::new("sensor_A", 21.0, 70.0)).unwrap();
    assert_eq!(emissions_for(&collected, "sensor_A").len(), 1);

    for t in [0.0, 30.0, 59.999] {
        assert_eq!(
            engine.process(Event::new("sensor_A", 99.0, t)).unwrap(),
            Disposition::LateDropped
        );
    }
    engine.flush();
    engine.flush();

    let first_window: Vec<_> = emissions_for(&collected, "sensor_A")
        .into_iter()
        .filter(|(w, _)| w.start_millis() == 0)
        .collect();
    assert_eq!(first_window.len(), 1);
    assert_eq!(first_window[0].1.count, 1);
    assert_eq!(engine.metrics().stats().late_dropped, 3);
}

#[test]
fn test_late_reading_side_output() {
    let config = EngineConfig::default().with_late_data_policy(LateDataPolicy::SideOutput);
    let (mut engine, collected) = collecting_engine(config);
    let (late, late_rx) = LateChannel::unbounded();
    engine.subscribe_late(late);

    engine.process(Event::new("sensor_A", 20.0, 10.0)).unwrap();
    engine.process(Event::new("sensor_A", 21.0, 70.0)).unwrap();
    engine.process(Event::new("sensor_A", 99.0, 30.0)).unwrap();

    let record = late_rx.try_recv().unwrap();
    assert_eq!(record.event.value(), 99.0);
    assert_eq!(record.window_end.timestamp(), 60);
    assert_eq!(emissions_for(&collected, "sensor_A").len(), 1);
}

#[test]
fn test_quiet_key_closed_by_other_keys() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 5.0)).unwrap();
    engine.process(Event::new("sensor_B", 25.0, 30.0)).unwrap();
    assert!(emissions_for(&collected, "sensor_A").is_empty());

    engine.process(Event::new("sensor_B", 25.5, 125.0)).unwrap();

    let a = emissions_for(&collected, "sensor_A");
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].1.count, 1);
    // B's first window closed too; its current one is still open.
    assert_eq!(emissions_for(&collected, "sensor_B").len(), 1);
    assert_eq!(engine.open_windows(), 1);
}

#[test]
fn test_flush_is_idempotent() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 5.0)).unwrap();
    engine.process(Event::new("sensor_B", 25.0, 6.0)).unwrap();

    assert_eq!(engine.flush(), 2);
    assert_eq!(collected.lock().unwrap().len(), 2);

    assert_eq!(engine.flush(), 0);
    assert_eq!(collected.lock().unwrap().len(), 2);
}

#[test]
fn test_nan_reading_is_isolated() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    engine.process(Event::new("sensor_A", 20.0, 5.0)).unwrap();

    let window = engine.assigner().assign(5.0).unwrap();
    let before = *engine.open_accumulator("sensor_A", &window).unwrap();

    let err = engine
        .process(Event::new("sensor_A", f64::NAN, 6.0))
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidMeasurement(_)));
    assert_eq!(*engine.open_accumulator("sensor_A", &window).unwrap(), before);
    assert_eq!(engine.metrics().stats().invalid_measurements, 1);

    engine.process(Event::new("sensor_A", 20.5, 7.0)).unwrap();
    engine.flush();

    let emitted = emissions_for(&collected, "sensor_A");
    assert_eq!(emitted[0].1.count, 2);
    assert_relative_eq!(emitted[0].1.mean, 20.25);
}

#[test]
fn test_engines_are_independent() {
    let (mut first, first_out) = collecting_engine(EngineConfig::default());
    let (mut second, second_out) = collecting_engine(EngineConfig::default());

    first.process(Event::new("a", 1.0, 0.0)).unwrap();
    second.process(Event::new("a", 2.0, 500.0)).unwrap();
    first.process(Event::new("a", 3.0, 1.0)).unwrap();

    assert!(first_out.lock().unwrap().is_empty());
    assert!(second_out.lock().unwrap().is_empty());
    assert_eq!(first.watermark(), Some(1_000));
    assert_eq!(second.watermark(), Some(500_000));
}

#[test]
fn test_demo_batch_matches_raw_statistics() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    for event in demo_batch() {
        engine.process(event).unwrap();
    }
    engine.flush();

    // Recompute every window from raw readings and compare.
    let assigner = WindowAssigner::new(Duration::from_secs(60)).unwrap();
    let emitted = collected.lock().unwrap().clone();
    assert_eq!(emitted.len(), 8);

    for (key, window, stats) in &emitted {
        let raw: Vec<f64> = demo_batch()
            .into_iter()
            .filter(|e| e.key() == key && assigner.assign(e.event_time()).unwrap() == *window)
            .map(|e| e.value())
            .collect();

        assert_eq!(stats.count as usize, raw.len());
        assert_relative_eq!(stats.mean, raw.iter().mean(), epsilon = 1e-9);
        if raw.len() > 1 {
            assert_relative_eq!(stats.variance, raw.iter().variance(), epsilon = 1e-9);
            assert_relative_eq!(stats.std_dev, raw.iter().std_dev(), epsilon = 1e-9);
        } else {
            assert!(stats.std_dev.is_nan());
        }
    }
}

#[test]
fn test_batch_replay_emits_in_window_order() {
    let (mut engine, collected) = collecting_engine(EngineConfig::default());
    for event in demo_batch() {
        engine.process(event).unwrap();
    }
    // Nothing for the last minute closes until end of input.
    assert_eq!(engine.open_windows(), 1);
    engine.flush();

    let starts: Vec<i64> = collected
        .lock()
        .unwrap()
        .iter()
        .map(|(_, w, _)| w.start_millis())
        .collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn test_worker_serializes_concurrent_feeds() {
    let mut engine = WindowedAggregationEngine::new(EngineConfig::default()).unwrap();
    let (emitter, results) = ChannelEmitter::unbounded();
    engine.subscribe(emitter);
    let worker = EngineWorker::spawn(engine).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|feed_no| {
            let feed = worker.feed();
            std::thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("sensor_{feed_no}");
                    feed.send(Event::new(key, i as f64, 10.0)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = worker.shutdown().unwrap();
    assert_eq!(snapshot.events_accepted, 1000);

    let results: Vec<_> = results.try_iter().collect();
    assert_eq!(results.len(), 4);
    for result in results {
        assert_eq!(result.stats.count, 250);
        assert_relative_eq!(result.stats.mean, 124.5);
    }
}
