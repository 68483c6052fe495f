use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::analyzer::analyze;
use super::error::SessionError;
use super::evaluator::{evaluate, parse_answer, timed_out};
use super::event::{Command, ModeRequest, SessionEvent, StartRequest};
use super::feed::OperationFeed;
use super::phase::{PhaseGraph, PhaseRequest};
use super::state::{
    AttemptMetric, IssuedOperation, Mode, OperationId, Phase, Session, SessionDelta, Stage,
};
use super::telemetry::event::{StaleKind, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{Clock, Millis};
use super::timers::{ClockMode, ClockReading, HelpState, TimerEvent, TimerSet};
use crate::config::EngineConfig;
use crate::services::attempts::{AttemptLog, MemoryAttemptLog};
use crate::services::grid::{OperationGrid, TableGrid};

/// Owns one learner session: phase, counters, queue, timers and the collaborators
/// it drives. Every command and every tick runs to completion before the next one,
/// and the resulting notifications queue up until `drain_events`.
pub struct SessionMachine<G = TableGrid, L = MemoryAttemptLog> {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    grid: G,
    log: L,
    session: Session,
    timers: TimerSet,
    feed: OperationFeed,
    pub telemetry: TelemetryRecorder,
    started_at: Millis,
    outbox: Vec<SessionEvent>,
}

impl<G: OperationGrid, L: AttemptLog> SessionMachine<G, L> {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, grid: G, log: L) -> Self {
        let timers = TimerSet::new(config.timing.clone());
        Self {
            config,
            clock,
            grid,
            log,
            session: Session::new(),
            timers,
            feed: OperationFeed::new(),
            telemetry: TelemetryRecorder::new(),
            started_at: 0,
            outbox: Vec::new(),
        }
    }

    // Read-only accessors

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn current(&self) -> Option<IssuedOperation> {
        self.session.current
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn help_state(&self) -> Option<HelpState> {
        self.timers.help_state()
    }

    pub fn clock_reading(&self) -> Option<ClockReading> {
        self.timers.reading(self.clock.now_ms())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn handle(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Start(request) => return self.start(request),
            Command::Keystroke => self.keystroke(),
            Command::Submit(raw) => {
                self.submit(&raw);
            }
            Command::EndSession => self.end_session(),
            Command::Reset => self.reset(),
            Command::BeginTraining => self.begin_training(),
            Command::AcknowledgeVictory => self.acknowledge_victory(),
            Command::AcknowledgeInactivity => self.acknowledge_inactivity(),
        }
        Ok(())
    }

    /// CONFIG -> PLAYING. Validation happens before anything mutates.
    pub fn start(&mut self, request: StartRequest) -> Result<(), SessionError> {
        if self.session.phase != Phase::Config {
            return Err(SessionError::NotInConfig(self.session.phase));
        }
        let nickname = request.nickname.trim();
        if nickname.is_empty() {
            return Err(SessionError::MissingNickname);
        }
        if request.tables.is_empty() {
            return Err(SessionError::NoTables);
        }
        let max = self.config.grid.max_factor;
        if let Some(&table) = request.tables.iter().find(|&&t| t == 0 || t > max) {
            return Err(SessionError::TableOutOfRange { table, max });
        }
        let time_limit_ms = match request.mode {
            ModeRequest::Timer { limit_ms: 0 } => return Err(SessionError::InvalidTimeLimit),
            ModeRequest::Timer { limit_ms } => Some(limit_ms),
            _ => None,
        };

        let now = self.clock.now_ms();
        let mode = request.mode.mode();

        self.timers.stop_all();
        self.telemetry.clear();
        self.feed.reset();
        self.log.begin(nickname);
        self.grid.initialize(&request.tables);
        self.session.reduce(SessionDelta::Started {
            nickname: nickname.to_string(),
            mode,
            tables: request.tables,
            time_limit_ms,
        });
        self.started_at = now;
        self.request(PhaseRequest::Start(mode), now);

        match (mode, time_limit_ms) {
            (Mode::Timer, Some(limit_ms)) => self
                .timers
                .start_session_clock(ClockMode::Countdown { limit_ms }, now),
            (Mode::Adaptive, _) => self.feed.begin_diagnosis(),
            _ => self.timers.start_session_clock(ClockMode::Stopwatch, now),
        }
        self.timers.arm_watchdog(now);

        info!(
            "Session {} started: {} mode, tables {:?}",
            self.session.id, mode, self.session.selected_tables
        );
        self.emit_stats();
        self.load_next(now);
        Ok(())
    }

    /// Learner activity. Re-arms the watchdog wherever it is in force.
    pub fn keystroke(&mut self) {
        if self.watchdog_applies() {
            self.timers.arm_watchdog(self.clock.now_ms());
        }
    }

    /// Answers the operation currently on screen.
    pub fn submit(&mut self, raw: &str) -> Option<AttemptMetric> {
        let id = self.session.current?.id;
        self.submit_for(id, raw)
    }

    /// Answers operation `id`. Ignored when `id` is no longer current.
    pub fn submit_for(&mut self, id: OperationId, raw: &str) -> Option<AttemptMetric> {
        if !self.session.phase.accepts_answers() || self.session.inactivity_raised {
            trace!("Submission ignored in {:?}", self.session.phase);
            return None;
        }
        let current = self.session.current?;
        if current.id != id {
            trace!("Submission for stale operation {:?} dropped", id);
            self.telemetry.record(TelemetryEvent::StaleDropped {
                kind: StaleKind::Submission,
            });
            return None;
        }
        let Some(answer) = parse_answer(raw) else {
            trace!("Non-numeric input ignored");
            return None;
        };

        let now = self.clock.now_ms();
        if self.watchdog_applies() {
            self.timers.arm_watchdog(now);
        }
        let elapsed = now.saturating_sub(current.issued_at);
        let metric = evaluate(current.operation, answer, elapsed);
        self.log.record_attempt(
            metric.row,
            metric.col,
            Some(answer),
            metric.is_correct,
            elapsed,
            self.session.mode,
        );
        self.resolve(current, metric, now);
        Some(metric)
    }

    /// Explicit end request from the game view.
    pub fn end_session(&mut self) {
        // The inactivity prompt only closes through its acknowledgement.
        if self.session.inactivity_raised {
            trace!("End request ignored while the inactivity prompt is up");
            return;
        }
        let now = self.clock.now_ms();
        self.finish(PhaseRequest::EndRequested, now);
    }

    /// Any phase -> CONFIG. Safe to call repeatedly.
    pub fn reset(&mut self) {
        let now = self.clock.now_ms();
        self.timers.stop_all();
        self.log.reset_session();
        self.feed.reset();
        self.request(PhaseRequest::Reset, now);
        self.session.reduce(SessionDelta::Cleared);
    }

    /// TRANSITION -> TRAINING.
    pub fn begin_training(&mut self) {
        let now = self.clock.now_ms();
        if !self.request(PhaseRequest::TrainingAccepted, now) {
            return;
        }
        self.feed.begin_training();
        self.session.reduce(SessionDelta::TrainingRounds(self.feed.rounds()));
        self.grid.filter_for(&self.session.training_queue);
        self.session.reduce(SessionDelta::CountersCleared);
        self.emit_stats();
        self.outbox.push(SessionEvent::QueueUpdated {
            remaining: self.session.training_queue.len(),
        });
        // No watchdog here: idle time is expected while mastering.
        self.timers.start_session_clock(ClockMode::Stopwatch, now);
        self.load_next(now);
    }

    /// VICTORY -> DASHBOARD.
    pub fn acknowledge_victory(&mut self) {
        let now = self.clock.now_ms();
        if self.request(PhaseRequest::VictoryAcknowledged, now) {
            self.close_session(now);
        }
    }

    /// Closes the inactivity prompt, which always returns to CONFIG.
    pub fn acknowledge_inactivity(&mut self) {
        if self.session.inactivity_raised {
            self.reset();
        }
    }

    /// Samples the timer set. Called by the driver at the tick cadence.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        for event in self.timers.poll(now) {
            // An earlier event in this batch may have moved the session on.
            if !self.timers.is_live(&event) {
                trace!("Stale timer event dropped: {:?}", event);
                self.telemetry.record(TelemetryEvent::StaleDropped {
                    kind: StaleKind::Timer,
                });
                continue;
            }
            match event {
                TimerEvent::SessionExpired { .. } => {
                    info!("Session clock expired");
                    self.finish(PhaseRequest::ClockExpired, now);
                }
                TimerEvent::OperationExpired { op, .. } => self.on_operation_expired(op, now),
                TimerEvent::InactivityExpired { .. } => self.on_inactivity(now),
                TimerEvent::HintReveal { op, first, .. } => self.on_hint_reveal(op, first),
                TimerEvent::HintHide { op, .. } => self.on_hint_hide(op),
            }
        }

        if self.session.phase.accepts_answers() && !self.session.inactivity_raised {
            if let Some(reading) = self.timers.reading(now) {
                self.outbox.push(SessionEvent::Clock(reading));
            }
        }
    }

    // --- internals ---

    fn watchdog_applies(&self) -> bool {
        matches!(
            self.session.phase,
            Phase::Playing(Stage::Drill | Stage::Diagnosis)
        ) && !self.session.inactivity_raised
    }

    /// Applies a transition through the phase graph. Returns false when the graph
    /// refuses it.
    fn request(&mut self, request: PhaseRequest, now: Millis) -> bool {
        let from = self.session.phase;
        let Some(to) = PhaseGraph::transition(from, request) else {
            debug!("Ignored {:?} while in {:?}", request, from);
            return false;
        };
        if to != from {
            self.session.reduce(SessionDelta::PhaseChanged(to));
            self.telemetry.record(TelemetryEvent::PhaseTransition { from, to, at_ms: now });
            info!("Phase {:?} -> {:?}", from, to);
            self.outbox.push(SessionEvent::PhaseChanged { from, to });
        }
        true
    }

    fn load_next(&mut self, now: Millis) {
        self.timers.stop_hint();
        self.timers.stop_operation();

        let Some(issued) = self.feed.next(&mut self.grid, now) else {
            self.session.reduce(SessionDelta::OperationCleared);
            self.on_exhausted(now);
            return;
        };

        self.session.reduce(SessionDelta::OperationIssued(issued));
        match self.session.phase.stage() {
            Some(Stage::Diagnosis) => self.timers.arm_operation(issued.id, now),
            Some(Stage::Training) => {
                self.timers
                    .arm_hint(issued.id, now, self.session.avg_diagnosis_ms);
                if self.feed.rounds() != self.session.training_rounds {
                    self.session
                        .reduce(SessionDelta::TrainingRounds(self.feed.rounds()));
                }
            }
            _ => {}
        }
        debug!("Operation {:?}: {}", issued.id, issued.operation);
        self.outbox.push(SessionEvent::OperationLoaded {
            id: issued.id,
            operation: issued.operation,
        });
    }

    fn on_exhausted(&mut self, now: Millis) {
        match self.session.phase.stage() {
            Some(Stage::Diagnosis) => self.finish_diagnosis(now),
            Some(Stage::Training) if self.session.training_queue.is_empty() => {
                self.enter_victory(now)
            }
            Some(Stage::Training) => {
                warn!(
                    "Grid ran dry with {} pairs still queued; ending session",
                    self.session.training_queue.len()
                );
                self.finish(PhaseRequest::EndRequested, now);
            }
            _ => self.finish(PhaseRequest::GridExhausted, now),
        }
    }

    /// Books one outcome for the current operation and moves the session on.
    fn resolve(&mut self, current: IssuedOperation, metric: AttemptMetric, now: Millis) {
        let operation = current.operation;
        if metric.is_correct {
            self.grid.mark_correct(operation);
        } else {
            self.grid.mark_wrong(operation);
        }
        self.hide_visible_hint(current);
        self.timers.stop_operation();
        self.timers.stop_hint();

        self.session.reduce(SessionDelta::AttemptResolved(metric));
        self.session.reduce(SessionDelta::OperationCleared);
        self.telemetry.record(TelemetryEvent::Attempt {
            op: current.id,
            is_correct: metric.is_correct,
            is_timeout: metric.is_timeout,
            response_time_ms: metric.response_time_ms,
        });
        debug!(
            "{} answered {} in {}ms{}",
            operation,
            if metric.is_correct { "right" } else { "wrong" },
            metric.response_time_ms,
            if metric.is_timeout { " (timeout)" } else { "" }
        );
        self.outbox.push(SessionEvent::AttemptEvaluated {
            id: current.id,
            metric,
        });
        self.emit_stats();

        match self.session.phase.stage() {
            Some(Stage::Diagnosis) if self.grid.is_complete() => {
                self.finish_diagnosis(now);
                return;
            }
            Some(Stage::Training) => {
                if metric.is_correct {
                    self.session.reduce(SessionDelta::Mastered(operation));
                    self.grid.mark_mastered(operation);
                }
                self.outbox.push(SessionEvent::QueueUpdated {
                    remaining: self.session.training_queue.len(),
                });
                if self.session.training_queue.is_empty() {
                    self.enter_victory(now);
                    return;
                }
            }
            _ => {}
        }

        self.load_next(now);
    }

    fn on_operation_expired(&mut self, op: OperationId, now: Millis) {
        let Some(current) = self.session.current.filter(|c| c.id == op) else {
            return;
        };
        if self.session.phase != Phase::Playing(Stage::Diagnosis) {
            return;
        }
        let limit = self.config.timing.operation_limit_ms;
        info!("{} timed out after {}ms", current.operation, limit);
        let metric = timed_out(current.operation, limit);
        self.log.record_attempt(
            metric.row,
            metric.col,
            None,
            false,
            limit,
            self.session.mode,
        );
        self.resolve(current, metric, now);
    }

    fn on_inactivity(&mut self, now: Millis) {
        if !self.watchdog_applies() {
            return;
        }
        warn!("No learner activity for {}ms", self.config.timing.inactivity_limit_ms);
        self.timers.stop_session_clock();
        self.timers.stop_operation();
        self.timers.stop_hint();
        self.timers.stop_watchdog();
        self.session.reduce(SessionDelta::InactivityRaised);
        self.telemetry.record(TelemetryEvent::Inactivity { at_ms: now });
        self.outbox.push(SessionEvent::InactivityRaised);
    }

    fn on_hint_reveal(&mut self, op: OperationId, first: bool) {
        let Some(current) = self.session.current.filter(|c| c.id == op) else {
            return;
        };
        if first {
            self.session.reduce(SessionDelta::HintUsed);
        }
        let answer = current.operation.answer();
        self.grid.reveal_answer(current.operation, answer);
        self.telemetry.record(TelemetryEvent::Hint {
            op,
            first_for_operation: first,
        });
        debug!("Hint {} = {} (total {})", current.operation, answer, self.session.hints_used);
        self.outbox.push(SessionEvent::HintShown {
            id: op,
            operation: current.operation,
            answer,
        });
    }

    fn on_hint_hide(&mut self, op: OperationId) {
        // Never hide a hint on behalf of a replaced operation.
        let Some(current) = self.session.current.filter(|c| c.id == op) else {
            return;
        };
        self.grid.hide_answer(current.operation);
        self.outbox.push(SessionEvent::HintHidden {
            id: op,
            operation: current.operation,
        });
    }

    fn hide_visible_hint(&mut self, current: IssuedOperation) {
        if self.timers.help_state().is_some_and(|help| help.help_is_visible) {
            self.grid.hide_answer(current.operation);
            self.outbox.push(SessionEvent::HintHidden {
                id: current.id,
                operation: current.operation,
            });
        }
    }

    fn finish_diagnosis(&mut self, now: Millis) {
        self.timers.stop_all();
        self.session.reduce(SessionDelta::OperationCleared);

        let report = analyze(&self.session.metrics, self.config.analyzer.slow_multiplier);
        info!(
            "Diagnosis done: avg {:.0}ms, slow above {:.0}ms, {} weaknesses",
            report.avg_response_ms,
            report.slow_threshold_ms,
            report.queue.len()
        );
        self.telemetry.record(TelemetryEvent::Analysis {
            weaknesses: report.queue.len(),
            avg_response_ms: report.avg_response_ms.round() as u64,
        });
        let weaknesses = report.queue.len();
        self.session.reduce(SessionDelta::QueueBuilt {
            queue: report.queue,
            avg_response_ms: report.avg_response_ms,
        });

        if weaknesses == 0 {
            if self.request(PhaseRequest::NoWeaknesses, now) {
                self.announce_victory();
            }
        } else if self.request(PhaseRequest::WeaknessesFound, now) {
            self.outbox.push(SessionEvent::TransitionReady {
                weaknesses,
                avg_response_ms: report.avg_response_ms,
            });
        }
    }

    fn enter_victory(&mut self, now: Millis) {
        self.timers.stop_all();
        self.session.reduce(SessionDelta::OperationCleared);
        if self.request(PhaseRequest::QueueCleared, now) {
            self.announce_victory();
        }
    }

    fn announce_victory(&mut self) {
        info!(
            "Victory: {} weaknesses cleared in {} rounds, {} hints",
            self.session.initial_weakness_count,
            self.session.training_rounds,
            self.session.hints_used
        );
        self.outbox.push(SessionEvent::Victory {
            initial_weaknesses: self.session.initial_weakness_count,
            training_rounds: self.session.training_rounds,
            hints_used: self.session.hints_used,
        });
    }

    /// PLAYING -> DASHBOARD via `request`, if the graph allows it from here.
    fn finish(&mut self, request: PhaseRequest, now: Millis) {
        let current = self.session.current;
        if !self.request(request, now) {
            return;
        }
        if let Some(current) = current {
            self.hide_visible_hint(current);
        }
        self.timers.stop_all();
        self.session.reduce(SessionDelta::OperationCleared);
        self.close_session(now);
    }

    fn close_session(&mut self, now: Millis) {
        let summary = self.telemetry.aggregate_session(
            self.session.id,
            self.session.mode,
            now.saturating_sub(self.started_at),
        );
        self.telemetry.record(summary);

        let stats = self.log.session_stats();
        info!(
            "Session {} ended: {} attempts, {}% accuracy, avg {}ms",
            self.session.id, stats.total, stats.accuracy, stats.avg_time
        );
        self.outbox.push(SessionEvent::SessionEnded {
            stats,
            records: self.log.export_rows(),
        });
    }

    fn emit_stats(&mut self) {
        self.outbox.push(SessionEvent::StatsUpdated {
            correct: self.session.correct_count,
            wrong: self.session.wrong_count,
        });
    }
}
