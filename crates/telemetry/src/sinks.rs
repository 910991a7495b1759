// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured resolution metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn resolution_metrics() -> &'static dyn ResolutionMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured write-gate metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn gate_metrics() -> &'static dyn GateMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured ingest/discovery metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn pipeline_metrics() -> &'static dyn PipelineMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics from the resolution orchestrator.
pub trait ResolutionMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes one finished resolution, labeled by serving layer and outcome.
    fn observe_resolution(&self, layer: &str, outcome: &str, latency_seconds: f64);
    /// Increments the counter of LLM tokens consumed, labeled by direction.
    fn inc_tokens(&self, direction: &str, count: u64);
    /// Increments the accumulated LLM cost estimate, in micro-USD.
    fn inc_cost_micro_usd(&self, amount: u64);
}
impl ResolutionMetricsSink for NopSink {
    fn observe_resolution(&self, _layer: &str, _outcome: &str, _latency_seconds: f64) {}
    fn inc_tokens(&self, _direction: &str, _count: u64) {}
    fn inc_cost_micro_usd(&self, _amount: u64) {}
}

/// A sink for metrics from the write gate.
pub trait GateMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments accepted promotions.
    fn inc_gate_accepted(&self);
    /// Increments rejected promotions, labeled by the first block reason code.
    fn inc_gate_rejected(&self, reason_code: &str);
}
impl GateMetricsSink for NopSink {
    fn inc_gate_accepted(&self) {}
    fn inc_gate_rejected(&self, _reason_code: &str) {}
}

/// A sink for metrics from ingest and discovery.
pub trait PipelineMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments fetched documents, labeled by source kind.
    fn inc_documents_ingested(&self, source_kind: &str);
    /// Increments chunks written to the corpus index.
    fn inc_chunks_indexed(&self, count: u64);
    /// Increments discovery runs, labeled by whether anything was ingested.
    fn inc_discovery_run(&self, usable: bool);
}
impl PipelineMetricsSink for NopSink {
    fn inc_documents_ingested(&self, _source_kind: &str) {}
    fn inc_chunks_indexed(&self, _count: u64) {}
    fn inc_discovery_run(&self, _usable: bool) {}
}

/// The unified sink every backend implements.
pub trait MetricsSink:
    ResolutionMetricsSink + GateMetricsSink + PipelineMetricsSink + Send + Sync + std::fmt::Debug
{
}
impl MetricsSink for NopSink {}
