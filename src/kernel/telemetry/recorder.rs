use std::collections::VecDeque;
use uuid::Uuid;

use super::event::TelemetryEvent;
use super::metrics::{TelemetrySnapshot, compute_snapshot};
use crate::kernel::state::Mode;

const MAX_EVENTS: usize = 10_000;

#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.buffer)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Rolls the buffer up into one summary event. Called when a session finishes.
    pub fn aggregate_session(&self, session_id: Uuid, mode: Mode, duration_ms: u64) -> TelemetryEvent {
        let snap = self.snapshot();
        TelemetryEvent::SessionSummary {
            session_id,
            mode,
            duration_ms,
            attempts: snap.attempt_stats.total,
            timeouts: snap.attempt_stats.timeouts,
            hints: snap.hint_stats.operations_helped,
        }
    }
}
