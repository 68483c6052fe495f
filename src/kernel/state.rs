use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Countdown over the whole session.
    Timer,
    /// Unbounded stopwatch.
    Free,
    /// Diagnosis followed by targeted training.
    Adaptive,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Timer => "TIMER",
            Mode::Free => "FREE",
            Mode::Adaptive => "ADAPTIVE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state of `Phase::Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// TIMER and FREE drilling.
    Drill,
    Diagnosis,
    /// Weakness count shown, waiting for the learner to begin training.
    Transition,
    Training,
    /// Queue cleared, waiting for acknowledgment.
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Config,
    Playing(Stage),
    Dashboard,
}

impl Phase {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Phase::Playing(stage) => Some(*stage),
            _ => None,
        }
    }

    /// Stages in which an operation is on screen and answerable.
    pub fn accepts_answers(&self) -> bool {
        matches!(
            self,
            Phase::Playing(Stage::Drill | Stage::Diagnosis | Stage::Training)
        )
    }
}

/// A single drill item. The answer is always `row * col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Operation {
    pub row: u32,
    pub col: u32,
}

impl Operation {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn answer(&self) -> i64 {
        i64::from(self.row) * i64::from(self.col)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.row, self.col)
    }
}

/// Identity of one issuance of an operation. Monotonic within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedOperation {
    pub id: OperationId,
    pub operation: Operation,
    pub issued_at: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetric {
    pub row: u32,
    pub col: u32,
    pub is_correct: bool,
    pub response_time_ms: u64,
    pub is_timeout: bool,
}

impl AttemptMetric {
    pub fn operation(&self) -> Operation {
        Operation::new(self.row, self.col)
    }
}

/// Strict session delta. This is the ONLY way the session mutates.
#[derive(Debug, Clone)]
pub enum SessionDelta {
    Started {
        nickname: String,
        mode: Mode,
        tables: BTreeSet<u32>,
        time_limit_ms: Option<u64>,
    },
    PhaseChanged(Phase),
    OperationIssued(IssuedOperation),
    OperationCleared,
    AttemptResolved(AttemptMetric),
    QueueBuilt {
        queue: Vec<Operation>,
        avg_response_ms: f64,
    },
    Mastered(Operation),
    CountersCleared,
    TrainingRounds(u32),
    HintUsed,
    InactivityRaised,
    Cleared,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub mode: Mode,
    pub phase: Phase,
    pub nickname: String,
    pub selected_tables: BTreeSet<u32>,
    pub time_limit_ms: Option<u64>,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub issued_count: u32,
    pub current: Option<IssuedOperation>,
    /// Diagnosis telemetry, append-only.
    pub metrics: Vec<AttemptMetric>,
    pub training_queue: Vec<Operation>,
    pub avg_diagnosis_ms: f64,
    pub initial_weakness_count: usize,
    pub training_rounds: u32,
    pub hints_used: u32,
    pub inactivity_raised: bool,
    // Monotonic version, bumped by every delta.
    pub version: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            mode: Mode::Timer,
            phase: Phase::Config,
            nickname: String::new(),
            selected_tables: BTreeSet::new(),
            time_limit_ms: None,
            correct_count: 0,
            wrong_count: 0,
            issued_count: 0,
            current: None,
            metrics: Vec::new(),
            training_queue: Vec::new(),
            avg_diagnosis_ms: 0.0,
            initial_weakness_count: 0,
            training_rounds: 0,
            hints_used: 0,
            inactivity_raised: false,
            version: 0,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved_count(&self) -> u32 {
        self.correct_count + self.wrong_count
    }

    /// Pure reduction: Session + Delta -> Mutated Session
    pub fn reduce(&mut self, delta: SessionDelta) {
        self.version += 1;

        match delta {
            SessionDelta::Started {
                nickname,
                mode,
                tables,
                time_limit_ms,
            } => {
                let version = self.version;
                *self = Session {
                    id: Uuid::new_v4(),
                    mode,
                    nickname,
                    selected_tables: tables,
                    time_limit_ms,
                    version,
                    ..Session::default()
                };
            }
            SessionDelta::PhaseChanged(phase) => {
                self.phase = phase;
            }
            SessionDelta::OperationIssued(issued) => {
                self.current = Some(issued);
                self.issued_count += 1;
            }
            SessionDelta::OperationCleared => {
                self.current = None;
            }
            SessionDelta::AttemptResolved(metric) => {
                if metric.is_correct {
                    self.correct_count += 1;
                } else {
                    self.wrong_count += 1;
                }
                if self.phase == Phase::Playing(Stage::Diagnosis) {
                    self.metrics.push(metric);
                }
            }
            SessionDelta::QueueBuilt {
                queue,
                avg_response_ms,
            } => {
                self.initial_weakness_count = queue.len();
                self.training_queue = queue;
                self.avg_diagnosis_ms = avg_response_ms;
            }
            SessionDelta::Mastered(operation) => {
                self.training_queue.retain(|queued| *queued != operation);
            }
            SessionDelta::CountersCleared => {
                // The issued count restarts with the counters so that
                // resolved <= issued keeps holding per phase.
                self.correct_count = 0;
                self.wrong_count = 0;
                self.issued_count = u32::from(self.current.is_some());
            }
            SessionDelta::TrainingRounds(rounds) => {
                self.training_rounds = rounds;
            }
            SessionDelta::HintUsed => {
                self.hints_used += 1;
            }
            SessionDelta::InactivityRaised => {
                self.inactivity_raised = true;
            }
            SessionDelta::Cleared => {
                let version = self.version;
                *self = Session {
                    version,
                    ..Session::default()
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_delta_bumps_version() {
        let mut session = Session::new();
        session.reduce(SessionDelta::HintUsed);
        session.reduce(SessionDelta::Cleared);
        assert_eq!(session.version, 2);
        assert_eq!(session.hints_used, 0);
    }

    #[test]
    fn mastering_removes_only_that_pair() {
        let mut session = Session::new();
        session.reduce(SessionDelta::QueueBuilt {
            queue: vec![Operation::new(4, 4), Operation::new(6, 6)],
            avg_response_ms: 1000.0,
        });
        session.reduce(SessionDelta::Mastered(Operation::new(6, 6)));
        assert_eq!(session.training_queue, vec![Operation::new(4, 4)]);
        assert_eq!(session.initial_weakness_count, 2);
    }
}
