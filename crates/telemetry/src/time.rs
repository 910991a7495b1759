// Path: crates/telemetry/src/time.rs
use crate::sinks::ResolutionMetricsSink;
use std::time::Instant;

/// RAII timer that reports a resolution's duration when dropped.
pub struct ResolutionTimer<'a> {
    sink: &'a dyn ResolutionMetricsSink,
    layer: &'a str,
    outcome: &'a str,
    start: Instant,
}

impl<'a> ResolutionTimer<'a> {
    /// Starts the timer.
    pub fn new(sink: &'a dyn ResolutionMetricsSink, layer: &'a str, outcome: &'a str) -> Self {
        Self {
            sink,
            layer,
            outcome,
            start: Instant::now(),
        }
    }

    /// Elapsed time so far, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for ResolutionTimer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_resolution(self.layer, self.outcome, self.start.elapsed().as_secs_f64());
    }
}
