// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigil_telemetry::{
    Helper, MetricMap, MetricValue, MetricsService, Section, HELPER_ERRORS_KEY, RUNTIME_NAMESPACE,
};

/// Writes `key` after sleeping, optionally failing instead.
#[derive(Debug)]
struct DelayedWriter {
    key: &'static str,
    delay: Duration,
    fail: bool,
    trace: Arc<Mutex<Vec<String>>>,
}

impl DelayedWriter {
    fn new(key: &'static str, delay_ms: u64, trace: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            key,
            delay: Duration::from_millis(delay_ms),
            fail: false,
            trace: Arc::clone(trace),
        }
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Helper for DelayedWriter {
    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.trace.lock().unwrap().push(self.key.to_string());
        if self.fail {
            anyhow::bail!("{} failed", self.key);
        }
        section.set(self.key, "done")?;
        Ok(())
    }
}

/// Records the highest number of concurrently running steps.
#[derive(Debug, Default)]
struct InFlightProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Debug)]
struct ProbeStep(Arc<InFlightProbe>);

#[async_trait]
impl Helper for ProbeStep {
    async fn run(&self, _section: &Section) -> anyhow::Result<()> {
        let now = self.0.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.0.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn without_runtime(mut snapshot: serde_json::Value) -> serde_json::Value {
    if let Some(object) = snapshot.as_object_mut() {
        object.remove(RUNTIME_NAMESPACE);
    }
    snapshot
}

#[tokio::test]
async fn test_helpers_run_in_registration_order_despite_delays() {
    // --- 1. ARRANGE ---
    let service = MetricsService::default();
    let trace = Arc::new(Mutex::new(Vec::new()));
    service.register_helper(DelayedWriter::new("h1", 30, &trace)).unwrap();
    service.register_helper(DelayedWriter::new("h2", 0, &trace)).unwrap();
    service.register_helper(DelayedWriter::new("h3", 10, &trace)).unwrap();

    // --- 2. ACT ---
    let snapshot = service.get_stats().await.unwrap();

    // --- 3. ASSERT ---
    assert_eq!(*trace.lock().unwrap(), vec!["h1", "h2", "h3"]);
    for key in ["h1", "h2", "h3"] {
        assert_eq!(snapshot.get(key).and_then(MetricValue::as_str), Some("done"));
    }
    assert!(snapshot.get(HELPER_ERRORS_KEY).is_none());
}

#[tokio::test]
async fn test_failing_helper_does_not_abort_chain() {
    let service = MetricsService::default();
    let trace = Arc::new(Mutex::new(Vec::new()));
    service.register_helper(DelayedWriter::new("h1", 0, &trace)).unwrap();
    service
        .register_helper(DelayedWriter::new("h2", 0, &trace).failing())
        .unwrap();
    service.register_helper(DelayedWriter::new("h3", 0, &trace)).unwrap();

    let snapshot = service.get_stats().await.unwrap();

    assert_eq!(snapshot.get("h1").and_then(MetricValue::as_str), Some("done"));
    assert!(snapshot.get("h2").is_none());
    assert_eq!(snapshot.get("h3").and_then(MetricValue::as_str), Some("done"));
    assert_eq!(snapshot.get(HELPER_ERRORS_KEY).and_then(MetricValue::as_f64), Some(1.0));
}

#[tokio::test]
async fn test_every_helper_failing_still_delivers() {
    let service = MetricsService::default();
    let trace = Arc::new(Mutex::new(Vec::new()));
    for key in ["a", "b", "c"] {
        service
            .register_helper(DelayedWriter::new(key, 0, &trace).failing())
            .unwrap();
    }

    let snapshot = service.get_stats().await.unwrap();
    assert_eq!(snapshot.get(HELPER_ERRORS_KEY).and_then(MetricValue::as_f64), Some(3.0));
    assert!(snapshot.get(RUNTIME_NAMESPACE).is_some());
}

#[tokio::test]
async fn test_helper_writing_non_finite_is_counted_not_reported() {
    // --- 1. ARRANGE ---
    let service = MetricsService::default();
    service
        .register_fn("bad-load", |s| {
            s.merge("system", MetricMap::new().with("load", f64::NAN))?;
            Ok(())
        })
        .unwrap();

    // --- 2. ACT ---
    let snapshot = service.get_stats().await.unwrap();

    // --- 3. ASSERT ---
    assert_eq!(snapshot.get(HELPER_ERRORS_KEY).and_then(MetricValue::as_f64), Some(1.0));
    assert!(snapshot.get("system").is_none());
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(!json.contains("null"), "{json}");
}

#[tokio::test]
async fn test_empty_chain_has_no_runtime_namespace() {
    let service = MetricsService::default();
    service.increment("lines").unwrap();

    let snapshot = service.get_stats().await.unwrap();
    assert!(!snapshot.contains_key(RUNTIME_NAMESPACE));
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::json!({"lines": 1})
    );
}

#[tokio::test]
async fn test_get_stats_is_idempotent_apart_from_runtime() {
    let service = MetricsService::default();
    service.set("cat", "meow").unwrap();
    let games = service.windowed_stat("games", 10).unwrap();
    games.push(50.0).unwrap();
    let ht = service.add_stat("ht").unwrap();
    ht.update(40.0).unwrap();

    let first = serde_json::to_value(service.get_stats().await.unwrap()).unwrap();
    let second = serde_json::to_value(service.get_stats().await.unwrap()).unwrap();

    assert_eq!(without_runtime(first), without_runtime(second));
}

#[tokio::test]
async fn test_windowed_and_rolling_reporters() {
    let service = MetricsService::default();
    let games = service.windowed_stat("games", 10).unwrap();
    for v in [50.0, 100.0, 75.0] {
        games.push(v).unwrap();
    }
    let ht = service.add_stat("ht").unwrap();
    for v in [40.0, 1000.0, 352.0, 550.0] {
        ht.update(v).unwrap();
    }

    let snapshot = service.get_stats().await.unwrap();

    let games = snapshot.get("games").and_then(MetricValue::as_summary).unwrap();
    assert_eq!(games.count, 3);
    assert_eq!(games.min, Some(50.0));
    assert_eq!(games.max, Some(100.0));
    assert_eq!(games.mean, Some(75.0));

    let ht = snapshot.get("ht").and_then(MetricValue::as_summary).unwrap();
    assert_eq!(ht.count, 4);
    assert_eq!(ht.min, Some(40.0));
    assert_eq!(ht.max, Some(1000.0));
    assert_eq!(ht.sum, Some(1942.0));
    approx::assert_relative_eq!(ht.mean.unwrap(), 485.5);
}

#[tokio::test]
async fn test_namespace_isolation() {
    let service = MetricsService::default();
    service.set("foo", "root").unwrap();
    service.namespace("ns").unwrap().increment("foo").unwrap();

    let snapshot = service.get_stats().await.unwrap();
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::json!({"foo": "root", "ns": {"foo": 1}})
    );
}

#[tokio::test]
async fn test_namespace_methods_and_stats() {
    // --- 1. ARRANGE ---
    let service = MetricsService::default();
    let ns = service.namespace("ns").unwrap();
    ns.increment("bar").unwrap();
    ns.increment("bar").unwrap();
    ns.set("foo", "blah").unwrap();
    ns.increment_hash("codes", "200").unwrap();
    service
        .register_fn("zzz", |s| {
            s.set("zzz", "ZZZ")?;
            Ok(())
        })
        .unwrap();
    ns.register_fn("inner", |s| {
        s.set("inner", "yes")?;
        Ok(())
    })
    .unwrap();

    let ages = ns.windowed_stat("ages", 10).unwrap();
    for v in [4.0, 9.0, 11.0] {
        ages.push(v).unwrap();
    }
    let ht = ns.add_stat("ht").unwrap();
    for v in [36.0, 48.0, 66.0] {
        ht.update(v).unwrap();
    }

    // --- 2. ACT ---
    let snapshot = service.get_stats().await.unwrap();

    // --- 3. ASSERT ---
    let ns_map = snapshot.get("ns").and_then(MetricValue::as_map).unwrap();
    assert_eq!(ns_map.get("bar").and_then(MetricValue::as_f64), Some(2.0));
    assert_eq!(ns_map.get("foo").and_then(MetricValue::as_str), Some("blah"));
    assert_eq!(ns_map.get("inner").and_then(MetricValue::as_str), Some("yes"));
    assert!(snapshot.get("inner").is_none(), "namespace helper must not write at the root");
    assert_eq!(snapshot.get("zzz").and_then(MetricValue::as_str), Some("ZZZ"));

    let codes = ns_map.get("codes").and_then(MetricValue::as_map).unwrap();
    assert_eq!(codes.get("200").and_then(MetricValue::as_f64), Some(1.0));

    let ages = ns_map.get("ages").and_then(MetricValue::as_summary).unwrap();
    assert_eq!((ages.count, ages.min, ages.max, ages.mean), (3, Some(4.0), Some(11.0), Some(8.0)));

    let ht = ns_map.get("ht").and_then(MetricValue::as_summary).unwrap();
    assert_eq!(ht.sum, Some(150.0));
    assert_eq!(ht.standard_deviation.unwrap().floor(), 12.0);
    assert!(snapshot.get(RUNTIME_NAMESPACE).is_some());
}

#[tokio::test]
async fn test_root_and_namespace_helpers_interleave_by_registration() {
    let service = MetricsService::default();
    let ns = service.namespace("ns").unwrap();
    let trace = Arc::new(Mutex::new(Vec::new()));

    service.register_helper(DelayedWriter::new("r1", 0, &trace)).unwrap();
    ns.register_helper(DelayedWriter::new("n1", 5, &trace)).unwrap();
    service.register_helper(DelayedWriter::new("r2", 0, &trace)).unwrap();
    ns.register_helper(DelayedWriter::new("n2", 0, &trace)).unwrap();

    let snapshot = service.get_stats().await.unwrap();

    assert_eq!(*trace.lock().unwrap(), vec!["r1", "n1", "r2", "n2"]);
    let ns_map = snapshot.get("ns").and_then(MetricValue::as_map).unwrap();
    assert!(ns_map.contains_key("n1") && ns_map.contains_key("n2"));
    assert!(snapshot.contains_key("r1") && snapshot.contains_key("r2"));
}

#[tokio::test]
async fn test_namespace_failure_counted_at_root() {
    let service = MetricsService::default();
    let ns = service.namespace("ns").unwrap();
    let trace = Arc::new(Mutex::new(Vec::new()));
    ns.register_helper(DelayedWriter::new("bad", 0, &trace).failing())
        .unwrap();

    let snapshot = service.get_stats().await.unwrap();

    assert_eq!(snapshot.get(HELPER_ERRORS_KEY).and_then(MetricValue::as_f64), Some(1.0));
    let ns_map = snapshot.get("ns").and_then(MetricValue::as_map).unwrap();
    assert!(ns_map.get(HELPER_ERRORS_KEY).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_stats_never_overlap() {
    let service = MetricsService::default();
    let probe = Arc::new(InFlightProbe::default());
    service.register_helper(ProbeStep(Arc::clone(&probe))).unwrap();
    service.register_helper(ProbeStep(Arc::clone(&probe))).unwrap();

    let runs: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.get_stats().await })
        })
        .collect();
    for run in runs {
        let snapshot: MetricMap = run.await.unwrap().unwrap();
        assert!(snapshot.contains_key(RUNTIME_NAMESPACE));
    }

    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
}
