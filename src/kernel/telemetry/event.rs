use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::state::{Mode, OperationId, Phase};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PhaseTransition {
        from: Phase,
        to: Phase,
        at_ms: u64,
    },

    Attempt {
        op: OperationId,
        is_correct: bool,
        is_timeout: bool,
        response_time_ms: u64,
    },

    /// A submission or expiry that arrived for a replaced operation.
    StaleDropped {
        kind: StaleKind,
    },

    Hint {
        op: OperationId,
        first_for_operation: bool,
    },

    Inactivity {
        at_ms: u64,
    },

    Analysis {
        weaknesses: usize,
        avg_response_ms: u64,
    },

    SessionSummary {
        session_id: Uuid,
        mode: Mode,
        duration_ms: u64,
        attempts: u64,
        timeouts: u64,
        hints: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaleKind {
    Submission,
    Timer,
}
