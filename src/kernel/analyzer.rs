use std::collections::HashSet;

use super::state::{AttemptMetric, Operation};

#[derive(Debug, Clone, PartialEq)]
pub struct WeaknessReport {
    /// Deduplicated, in first-occurrence order.
    pub queue: Vec<Operation>,
    pub avg_response_ms: f64,
    pub slow_threshold_ms: f64,
}

/// Turns diagnosis metrics into a training queue.
///
/// An operation is weak when it was answered wrong (timeouts included) or took longer
/// than `avg * slow_multiplier`. The threshold is relative to the learner's own average.
/// An empty metric set yields an average of zero and an empty queue.
pub fn analyze(metrics: &[AttemptMetric], slow_multiplier: f64) -> WeaknessReport {
    let avg_response_ms = if metrics.is_empty() {
        0.0
    } else {
        metrics.iter().map(|m| m.response_time_ms as f64).sum::<f64>() / metrics.len() as f64
    };
    let slow_threshold_ms = avg_response_ms * slow_multiplier;

    let mut seen = HashSet::new();
    let queue = metrics
        .iter()
        .filter(|m| !m.is_correct || m.response_time_ms as f64 > slow_threshold_ms)
        .map(AttemptMetric::operation)
        .filter(|op| seen.insert(*op))
        .collect();

    WeaknessReport {
        queue,
        avg_response_ms,
        slow_threshold_ms,
    }
}
