use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AlgorithmResultLabel {
    pub algorithm: String,
    pub result: String,
}

impl EncodeLabelSet for AlgorithmResultLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("algorithm", self.algorithm.as_str()).encode(encoder.encode_label())?;
        ("result", self.result.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AlgorithmLabel(pub String);

impl EncodeLabelSet for AlgorithmLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("algorithm", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct QueueTerminalLabel {
    pub priority: String,
    pub terminal_status: String,
}

impl EncodeLabelSet for QueueTerminalLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("priority", self.priority.as_str()).encode(encoder.encode_label())?;
        ("terminal_status", self.terminal_status.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PriorityLabel(pub String);

impl EncodeLabelSet for PriorityLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("priority", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DepResultLabel {
    pub dep: String,
    pub result: String,
}

impl EncodeLabelSet for DepResultLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("dep", self.dep.as_str()).encode(encoder.encode_label())?;
        ("result", self.result.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DepLabel(pub String);

impl EncodeLabelSet for DepLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("dep", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Counters, histograms and gauges from §4.13, plus the reaper counters
/// mirroring `kalla-worker/src/metrics.rs`'s `WorkerMetrics`.
#[derive(Clone)]
pub struct MetricsRegistry {
    pub match_requests_total: Family<AlgorithmResultLabel, Counter>,
    pub queue_jobs_total: Family<QueueTerminalLabel, Counter>,
    pub external_calls_total: Family<DepResultLabel, Counter>,
    pub match_latency_seconds: Family<AlgorithmLabel, Histogram>,
    pub queue_wait_seconds: Family<PriorityLabel, Histogram>,
    pub external_latency_seconds: Family<DepLabel, Histogram>,
    pub circuit_state: Family<DepLabel, Gauge>,
    pub queue_depth: Family<PriorityLabel, Gauge>,
    pub reaper_reclaimed: Counter,
    pub reaper_failed: Counter,
    registry: Arc<Registry>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let match_requests_total = Family::<AlgorithmResultLabel, Counter>::default();
        registry.register(
            "concord_match_requests",
            "Total match requests by algorithm and result",
            match_requests_total.clone(),
        );

        let queue_jobs_total = Family::<QueueTerminalLabel, Counter>::default();
        registry.register(
            "concord_queue_jobs",
            "Total queue jobs reaching a terminal status",
            queue_jobs_total.clone(),
        );

        let external_calls_total = Family::<DepResultLabel, Counter>::default();
        registry.register(
            "concord_external_calls",
            "Total external dependency calls by result",
            external_calls_total.clone(),
        );

        let match_latency_seconds =
            Family::<AlgorithmLabel, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.01, 2.0, 10))
            });
        registry.register(
            "concord_match_latency_seconds",
            "Match scoring latency by algorithm",
            match_latency_seconds.clone(),
        );

        let queue_wait_seconds = Family::<PriorityLabel, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.1, 2.0, 12))
        });
        registry.register(
            "concord_queue_wait_seconds",
            "Time a job spent pending before being dequeued",
            queue_wait_seconds.clone(),
        );

        let external_latency_seconds =
            Family::<DepLabel, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.01, 2.0, 10))
            });
        registry.register(
            "concord_external_latency_seconds",
            "External dependency call latency",
            external_latency_seconds.clone(),
        );

        let circuit_state = Family::<DepLabel, Gauge>::default();
        registry.register(
            "concord_circuit_state",
            "Circuit breaker state per dependency (0=closed, 1=half-open, 2=open)",
            circuit_state.clone(),
        );

        let queue_depth = Family::<PriorityLabel, Gauge>::default();
        registry.register(
            "concord_queue_depth",
            "Pending job count per priority",
            queue_depth.clone(),
        );

        let reaper_reclaimed = Counter::default();
        registry.register(
            "concord_reaper_jobs_reclaimed",
            "Jobs reclaimed by the visibility-timeout reaper",
            reaper_reclaimed.clone(),
        );

        let reaper_failed = Counter::default();
        registry.register(
            "concord_reaper_jobs_failed",
            "Jobs permanently failed by the reaper after exceeding max retries",
            reaper_failed.clone(),
        );

        Self {
            match_requests_total,
            queue_jobs_total,
            external_calls_total,
            match_latency_seconds,
            queue_wait_seconds,
            external_latency_seconds,
            circuit_state,
            queue_depth,
            reaper_reclaimed,
            reaper_failed,
            registry: Arc::new(registry),
        }
    }

    /// Encode all metrics as Prometheus text-exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).unwrap();
        buf
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_registered_metrics() {
        let metrics = MetricsRegistry::new();
        metrics
            .match_requests_total
            .get_or_create(&AlgorithmResultLabel {
                algorithm: "rule".to_string(),
                result: "success".to_string(),
            })
            .inc();
        metrics.queue_depth.get_or_create(&PriorityLabel("premium".to_string())).set(3);

        let output = metrics.encode();
        assert!(output.contains("concord_match_requests"));
        assert!(output.contains("concord_queue_depth"));
        assert!(output.contains("algorithm=\"rule\""));
    }

    #[test]
    fn histogram_observation_is_encoded() {
        let metrics = MetricsRegistry::new();
        metrics
            .match_latency_seconds
            .get_or_create(&AlgorithmLabel("semantic".to_string()))
            .observe(0.05);

        let output = metrics.encode();
        assert!(output.contains("concord_match_latency_seconds"));
    }
}
