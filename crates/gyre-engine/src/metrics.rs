//! Per-step performance metrics.

use serde::Serialize;

/// Timing and memory data of one completed step.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepMetrics {
    /// The iteration that was computed.
    pub iteration: u64,
    /// Wall-clock time of the whole step.
    pub total_us: u64,
    /// Per-action times `(label, microseconds)` in execution order.
    pub stage_us: Vec<(String, u64)>,
    /// Field storage after the step, in bytes.
    pub memory_bytes: usize,
}

impl StepMetrics {
    /// Time spent in `label`, if it ran.
    pub fn stage(&self, label: &str) -> Option<u64> {
        self.stage_us
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, us)| us)
    }
}
