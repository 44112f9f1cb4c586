//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count fetch outcomes per strategy and track per-strategy latency
//! - Keep an in-process snapshot readable by the admin API
//! - Forward everything to the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `gateway_fetch_total` (counter): outcomes by strategy, outcome
//! - `gateway_fetch_latency_seconds` (histogram): successful tier latency by strategy
//! - `gateway_requests_total` (counter): gateway calls by final outcome
//! - `gateway_circuit_transitions_total` (counter): breaker transitions by state
//! - `gateway_circuit_open` (gauge): 1=open, 0=closed
//! - `gateway_in_flight` (gauge): fetches holding a concurrency slot
//!
//! # Design Decisions
//! - Recording is atomic increments only; it never fails and never blocks on I/O
//! - Histogram buckets tuned for page fetches (100ms to 60s)

use dashmap::DashMap;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::fetch::StrategyKind;
use crate::resilience::CircuitStatus;

const FETCH_TOTAL: &str = "gateway_fetch_total";
const FETCH_LATENCY: &str = "gateway_fetch_latency_seconds";

/// Upper bounds (seconds) of the latency buckets; a final +Inf bucket is implied.
pub const LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(FETCH_LATENCY.to_string()), LATENCY_BUCKETS)?
        .install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Outcome of one strategy tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub const ALL: [Outcome; 2] = [Outcome::Success, Outcome::Failure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

#[derive(Debug)]
struct LatencyHistogram {
    // Per-bucket (non-cumulative) counts; the last slot is +Inf.
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    sum_micros: AtomicU64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            buckets: (0..=LATENCY_BUCKETS.len()).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
        }
    }

    fn observe(&self, latency: Duration) {
        let secs = latency.as_secs_f64();
        let slot = LATENCY_BUCKETS
            .iter()
            .position(|bound| secs <= *bound)
            .unwrap_or(LATENCY_BUCKETS.len());
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        let micros = latency.as_micros().min(u128::from(u64::MAX)) as u64;
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self, strategy: StrategyKind) -> LatencySample {
        let mut cumulative = 0;
        let buckets = self
            .buckets
            .iter()
            .enumerate()
            .map(|(i, bucket)| {
                cumulative += bucket.load(Ordering::Relaxed);
                BucketSample {
                    le: LATENCY_BUCKETS.get(i).copied().unwrap_or(f64::INFINITY),
                    count: cumulative,
                }
            })
            .collect();

        LatencySample {
            strategy,
            count: self.count.load(Ordering::Relaxed),
            sum_seconds: self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            buckets,
        }
    }
}

/// One `(strategy, outcome)` counter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSample {
    pub strategy: StrategyKind,
    pub outcome: Outcome,
    pub value: u64,
}

/// One cumulative histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSample {
    #[serde(serialize_with = "serialize_bound")]
    pub le: f64,
    pub count: u64,
}

fn serialize_bound<S: serde::Serializer>(le: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if le.is_infinite() {
        serializer.serialize_str("+Inf")
    } else {
        serializer.serialize_f64(*le)
    }
}

/// Latency distribution of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySample {
    pub strategy: StrategyKind,
    pub count: u64,
    pub sum_seconds: f64,
    pub buckets: Vec<BucketSample>,
}

/// Exportable copy of the recorder state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: Vec<CounterSample>,
    pub latencies: Vec<LatencySample>,
}

/// Per-strategy outcome counters and latency histograms.
#[derive(Debug)]
pub struct MetricsRecorder {
    counters: DashMap<(StrategyKind, Outcome), AtomicU64>,
    latencies: DashMap<StrategyKind, LatencyHistogram>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let counters = DashMap::new();
        let latencies = DashMap::new();
        for strategy in StrategyKind::ALL {
            for outcome in Outcome::ALL {
                counters.insert((strategy, outcome), AtomicU64::new(0));
            }
            latencies.insert(strategy, LatencyHistogram::new());
        }
        Self {
            counters,
            latencies,
        }
    }

    /// Record one tier outcome; `latency` feeds the histogram when present.
    pub fn record(&self, strategy: StrategyKind, outcome: Outcome, latency: Option<Duration>) {
        // Every key is seeded in `new`, so the shared-lock path is the common one.
        match self.counters.get(&(strategy, outcome)) {
            Some(counter) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.counters
                    .entry((strategy, outcome))
                    .or_default()
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        ::metrics::counter!(
            FETCH_TOTAL,
            "strategy" => strategy.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);

        if let Some(latency) = latency {
            match self.latencies.get(&strategy) {
                Some(histogram) => histogram.observe(latency),
                None => self
                    .latencies
                    .entry(strategy)
                    .or_insert_with(LatencyHistogram::new)
                    .observe(latency),
            }

            ::metrics::histogram!(FETCH_LATENCY, "strategy" => strategy.as_str())
                .record(latency.as_secs_f64());
        }
    }

    /// Current value of one counter.
    pub fn count(&self, strategy: StrategyKind, outcome: Outcome) -> u64 {
        self.counters
            .get(&(strategy, outcome))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of latency observations for a strategy.
    pub fn latency_count(&self, strategy: StrategyKind) -> u64 {
        self.latencies
            .get(&strategy)
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut counters = Vec::new();
        let mut latencies = Vec::new();
        for strategy in StrategyKind::ALL {
            for outcome in Outcome::ALL {
                counters.push(CounterSample {
                    strategy,
                    outcome,
                    value: self.count(strategy, outcome),
                });
            }
            if let Some(histogram) = self.latencies.get(&strategy) {
                latencies.push(histogram.snapshot(strategy));
            }
        }
        MetricsSnapshot {
            counters,
            latencies,
        }
    }
}

/// Record the final outcome of one gateway call ("success", "failure", "circuit_open", ...).
pub fn record_request(outcome: &'static str) {
    ::metrics::counter!("gateway_requests_total", "outcome" => outcome).increment(1);
}

/// Record a breaker transition.
pub fn record_circuit_status(status: CircuitStatus) {
    ::metrics::counter!("gateway_circuit_transitions_total", "state" => status.as_str()).increment(1);
    let open = if status == CircuitStatus::Open { 1.0 } else { 0.0 };
    ::metrics::gauge!("gateway_circuit_open").set(open);
}

/// Record the number of fetches currently holding a slot.
pub fn record_in_flight(in_flight: usize) {
    ::metrics::gauge!("gateway_in_flight").set(in_flight as f64);
}
