//! Time-dependent behavior, run on a current-thread runtime.
//!
//! Tests with `start_paused` drive the clock explicitly, so the debounce
//! windows are exact.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use common::Person;
use keyflow_core::{
    subscribe, Computed, GuardedProperty, MutationThread, Notifier, Observable, ObserveOptions, Value,
};

async fn at(start: Instant, ms: u64) {
    tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn burst_produces_one_recompute_per_window() {
    let start = Instant::now();
    let person = Person::new("n", "S");
    assert_eq!(person.fullname.change_rate(), Duration::from_millis(100));
    let base = person.fullname.recompute_count();

    let emitted = Arc::new(Mutex::new(Vec::new()));
    let emitted_clone = emitted.clone();
    subscribe(&person, "fullname", ObserveOptions::empty(), None, move |_, change| {
        emitted_clone.lock().push(change.new_as::<String>().unwrap_or_default());
    })
    .unwrap();

    for ms in [0, 30, 60, 90] {
        at(start, ms).await;
        person.name.set(format!("n{ms}")).unwrap();
    }
    assert!(emitted.lock().is_empty());

    at(start, 105).await;
    assert_eq!(*emitted.lock(), vec!["n90 S"]);
    assert_eq!(person.fullname.recompute_count() - base, 1);

    at(start, 150).await;
    person.name.set("n150".to_string()).unwrap();
    assert!(person.fullname.is_pending());

    at(start, 210).await;
    assert_eq!(*emitted.lock(), vec!["n90 S", "n150 S"]);
    assert_eq!(person.fullname.recompute_count() - base, 2);
    assert_eq!(person.greeting.get().unwrap(), "Hello, n150 S");
}

#[tokio::test(start_paused = true)]
async fn change_after_quiet_period_is_immediate() {
    let person = Person::new("a", "b");
    tokio::time::sleep(Duration::from_millis(500)).await;

    person.surname.set("c".to_string()).unwrap();

    assert!(!person.fullname.is_pending());
    assert_eq!(person.fullname.get().unwrap(), "a c");
}

struct Sensor {
    notifier: Notifier,
    raw: GuardedProperty<i64>,
    scaled: Computed<Sensor, i64>,
}

impl Sensor {
    fn new(thread: MutationThread) -> Arc<Self> {
        let sensor = Arc::new(Self {
            notifier: Notifier::new(),
            raw: GuardedProperty::new(0, thread),
            scaled: Computed::with_change_rate(|s: &Sensor| s.raw.get() * 10, ["raw"], Duration::ZERO),
        });
        sensor.raw.bind(&sensor, "raw").unwrap();
        sensor.scaled.bind(&sensor, "scaled").unwrap();
        sensor
    }
}

impl Observable for Sensor {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn value_for_key(&self, key: &str) -> Option<Value> {
        match key {
            "raw" => Some(self.raw.to_value()),
            "scaled" => Some(self.scaled.to_value()),
            _ => None,
        }
    }
}

#[tokio::test]
async fn guarded_writes_from_worker_threads_propagate() {
    let main = MutationThread::current().unwrap();
    let sensor = Sensor::new(main.clone());
    let deliveries = Arc::new(AtomicUsize::new(0));
    let on_main = Arc::new(Mutex::new(Vec::new()));

    let deliveries_clone = deliveries.clone();
    let on_main_clone = on_main.clone();
    let expected = main.clone();
    subscribe(&sensor, "scaled", ObserveOptions::empty(), None, move |_, _| {
        deliveries_clone.fetch_add(1, Ordering::SeqCst);
        on_main_clone.lock().push(expected.is_current());
    })
    .unwrap();

    let workers: Vec<_> = (1..=3)
        .map(|n| {
            let sensor = sensor.clone();
            thread::spawn(move || sensor.raw.set(n).unwrap())
        })
        .collect();
    tokio::task::spawn_blocking(move || {
        for worker in workers {
            worker.join().unwrap();
        }
    })
    .await
    .unwrap();

    assert_eq!(deliveries.load(Ordering::SeqCst), 3);
    assert!(on_main.lock().iter().all(|&on_main| on_main));
    assert_eq!(sensor.scaled.get().unwrap(), sensor.raw.get() * 10);
}
