use std::collections::VecDeque;
use super::event::TelemetryEvent;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub attempt_stats: AttemptStats,
    pub hint_stats: HintStats,
    pub transitions: u64,
    pub inactivity_count: u64,
    pub stale_dropped: u64,
    pub last_analysis_weaknesses: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AttemptStats {
    pub total: u64,
    pub correct: u64,
    pub timeouts: u64,
    pub total_response_ms: u64,
    pub avg_response_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HintStats {
    pub reveals: u64,
    /// Reveals that were the first on their operation.
    pub operations_helped: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::PhaseTransition { .. } => snap.transitions += 1,
            TelemetryEvent::Attempt { is_correct, is_timeout, response_time_ms, .. } => {
                snap.attempt_stats.total += 1;
                snap.attempt_stats.total_response_ms += response_time_ms;
                if *is_correct {
                    snap.attempt_stats.correct += 1;
                }
                if *is_timeout {
                    snap.attempt_stats.timeouts += 1;
                }
            }
            TelemetryEvent::StaleDropped { .. } => snap.stale_dropped += 1,
            TelemetryEvent::Hint { first_for_operation, .. } => {
                snap.hint_stats.reveals += 1;
                if *first_for_operation {
                    snap.hint_stats.operations_helped += 1;
                }
            }
            TelemetryEvent::Inactivity { .. } => snap.inactivity_count += 1,
            TelemetryEvent::Analysis { weaknesses, .. } => {
                snap.last_analysis_weaknesses = Some(*weaknesses);
            }
            TelemetryEvent::SessionSummary { .. } => {}
        }
    }

    if snap.attempt_stats.total > 0 {
        snap.attempt_stats.avg_response_ms =
            snap.attempt_stats.total_response_ms as f64 / snap.attempt_stats.total as f64;
    }

    snap
}
