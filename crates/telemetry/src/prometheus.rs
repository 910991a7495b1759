// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter, register_int_counter_vec,
    HistogramVec, IntCounter, IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static RESOLUTIONS_TOTAL: OnceCell<HistogramVec> = OnceCell::new();
static TOKENS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static COST_MICRO_USD_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GATE_ACCEPTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GATE_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static DOCUMENTS_INGESTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CHUNKS_INDEXED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static DISCOVERY_RUNS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed sink.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Registers every metric family and installs the sink as the global one.
/// Safe to call once per process; a second call returns an error from the
/// registry.
pub fn install() -> Result<&'static PrometheusSink, prometheus::Error> {
    RESOLUTIONS_TOTAL.get_or_try_init(|| {
        register_histogram_vec!(
            "scopegate_resolution_duration_seconds",
            "Resolution latency by serving layer and outcome.",
            &["layer", "outcome"],
            exponential_buckets(0.001, 4.0, 10)?
        )
    })?;
    TOKENS_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "scopegate_llm_tokens_total",
            "LLM tokens consumed, by direction.",
            &["direction"]
        )
    })?;
    COST_MICRO_USD_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "scopegate_llm_cost_micro_usd_total",
            "Accumulated LLM cost estimate in micro-USD."
        )
    })?;
    GATE_ACCEPTED_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "scopegate_gate_accepted_total",
            "Promotions accepted by the write gate."
        )
    })?;
    GATE_REJECTED_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "scopegate_gate_rejected_total",
            "Promotions rejected by the write gate, by first reason code.",
            &["reason"]
        )
    })?;
    DOCUMENTS_INGESTED_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "scopegate_documents_ingested_total",
            "Documents ingested, by source kind.",
            &["source_kind"]
        )
    })?;
    CHUNKS_INDEXED_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "scopegate_chunks_indexed_total",
            "Chunks written to the corpus index."
        )
    })?;
    DISCOVERY_RUNS_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "scopegate_discovery_runs_total",
            "Discovery runs, by whether they ingested anything usable.",
            &["usable"]
        )
    })?;

    static SINK_INSTANCE: PrometheusSink = PrometheusSink;
    let _ = crate::sinks::SINK.set(&SINK_INSTANCE);
    Ok(&SINK_INSTANCE)
}

impl ResolutionMetricsSink for PrometheusSink {
    fn observe_resolution(&self, layer: &str, outcome: &str, latency_seconds: f64) {
        if let Some(histogram) = RESOLUTIONS_TOTAL.get() {
            histogram
                .with_label_values(&[layer, outcome])
                .observe(latency_seconds);
        }
    }

    fn inc_tokens(&self, direction: &str, count: u64) {
        if let Some(counter) = TOKENS_TOTAL.get() {
            counter.with_label_values(&[direction]).inc_by(count);
        }
    }

    fn inc_cost_micro_usd(&self, amount: u64) {
        if let Some(counter) = COST_MICRO_USD_TOTAL.get() {
            counter.inc_by(amount);
        }
    }
}

impl GateMetricsSink for PrometheusSink {
    fn inc_gate_accepted(&self) {
        if let Some(counter) = GATE_ACCEPTED_TOTAL.get() {
            counter.inc();
        }
    }

    fn inc_gate_rejected(&self, reason_code: &str) {
        if let Some(counter) = GATE_REJECTED_TOTAL.get() {
            counter.with_label_values(&[reason_code]).inc();
        }
    }
}

impl PipelineMetricsSink for PrometheusSink {
    fn inc_documents_ingested(&self, source_kind: &str) {
        if let Some(counter) = DOCUMENTS_INGESTED_TOTAL.get() {
            counter.with_label_values(&[source_kind]).inc();
        }
    }

    fn inc_chunks_indexed(&self, count: u64) {
        if let Some(counter) = CHUNKS_INDEXED_TOTAL.get() {
            counter.inc_by(count);
        }
    }

    fn inc_discovery_run(&self, usable: bool) {
        if let Some(counter) = DISCOVERY_RUNS_TOTAL.get() {
            counter
                .with_label_values(&[if usable { "yes" } else { "no" }])
                .inc();
        }
    }
}

impl MetricsSink for PrometheusSink {}
