use std::collections::BTreeSet;

use super::state::{AttemptMetric, Mode, Operation, OperationId, Phase};
use super::timers::ClockReading;
use crate::services::attempts::{AttemptRecord, SessionStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Timer { limit_ms: u64 },
    Free,
    Adaptive,
}

impl ModeRequest {
    pub fn mode(&self) -> Mode {
        match self {
            ModeRequest::Timer { .. } => Mode::Timer,
            ModeRequest::Free => Mode::Free,
            ModeRequest::Adaptive => Mode::Adaptive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub nickname: String,
    pub tables: BTreeSet<u32>,
    pub mode: ModeRequest,
}

impl StartRequest {
    pub fn new(nickname: &str, tables: impl IntoIterator<Item = u32>, mode: ModeRequest) -> Self {
        Self {
            nickname: nickname.to_string(),
            tables: tables.into_iter().collect(),
            mode,
        }
    }
}

/// Externally triggerable commands, as delivered to the reactor.
#[derive(Debug, Clone)]
pub enum Command {
    Start(StartRequest),
    /// Any learner keystroke; feeds the inactivity watchdog.
    Keystroke,
    Submit(String),
    EndSession,
    Reset,
    BeginTraining,
    AcknowledgeVictory,
    AcknowledgeInactivity,
}

/// One-way notifications from the machine to UI and collaborators.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    StartRejected {
        reason: String,
    },
    OperationLoaded {
        id: OperationId,
        operation: Operation,
    },
    AttemptEvaluated {
        id: OperationId,
        metric: AttemptMetric,
    },
    StatsUpdated {
        correct: u32,
        wrong: u32,
    },
    QueueUpdated {
        remaining: usize,
    },
    Clock(ClockReading),
    HintShown {
        id: OperationId,
        operation: Operation,
        answer: i64,
    },
    HintHidden {
        id: OperationId,
        operation: Operation,
    },
    InactivityRaised,
    TransitionReady {
        weaknesses: usize,
        avg_response_ms: f64,
    },
    Victory {
        initial_weaknesses: usize,
        training_rounds: u32,
        hints_used: u32,
    },
    /// Read-only snapshot handed to reporting once the dashboard opens.
    SessionEnded {
        stats: SessionStats,
        records: Vec<AttemptRecord>,
    },
}
