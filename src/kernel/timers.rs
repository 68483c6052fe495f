//! The four session timers.
//!
//! Timers never call back on their own. The reactor samples them with `poll(now)` at
//! the tick cadence and each deadline that has passed comes back as one `TimerEvent`.
//! Every armed timer holds a `TimerToken`; stopping or re-arming retires it, and
//! `is_live` lets the caller drop events that were overtaken by a later transition.

use serde::Serialize;

use super::cancel::{TimerToken, TokenSource};
use super::state::OperationId;
use super::time::Millis;
use crate::config::TimingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    Countdown { limit_ms: u64 },
    Stopwatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    SessionExpired { token: TimerToken },
    OperationExpired { op: OperationId, token: TimerToken },
    InactivityExpired { token: TimerToken },
    HintReveal { op: OperationId, token: TimerToken, first: bool },
    HintHide { op: OperationId, token: TimerToken },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockKind {
    Remaining,
    Elapsed,
}

/// What the session clock shows right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    pub kind: ClockKind,
    pub value_ms: u64,
    /// Cosmetic only; never drives a transition.
    pub warning: bool,
}

/// Per-operation help bookkeeping. Rebuilt on every operation load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HelpState {
    pub help_shown: bool,
    pub help_is_visible: bool,
    pub next_help_eligible_at: Millis,
}

#[derive(Debug)]
struct SessionClock {
    mode: ClockMode,
    started_at: Millis,
    token: TimerToken,
    expired: bool,
}

#[derive(Debug)]
struct OperationCountdown {
    op: OperationId,
    started_at: Millis,
    token: TimerToken,
    fired: bool,
}

#[derive(Debug)]
struct Watchdog {
    deadline: Millis,
    token: TimerToken,
    fired: bool,
}

#[derive(Debug)]
struct HintCycle {
    op: OperationId,
    token: TimerToken,
    op_started_at: Millis,
    threshold_ms: f64,
    next_poll_at: Millis,
    hide_at: Option<Millis>,
    help: HelpState,
}

#[derive(Debug)]
pub struct TimerSet {
    timing: TimingConfig,
    tokens: TokenSource,
    session: Option<SessionClock>,
    operation: Option<OperationCountdown>,
    watchdog: Option<Watchdog>,
    hint: Option<HintCycle>,
}

impl TimerSet {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            tokens: TokenSource::new(),
            session: None,
            operation: None,
            watchdog: None,
            hint: None,
        }
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    // --- Session Timer ---

    pub fn start_session_clock(&mut self, mode: ClockMode, now: Millis) {
        self.session = Some(SessionClock {
            mode,
            started_at: now,
            token: self.tokens.issue(),
            expired: false,
        });
    }

    pub fn stop_session_clock(&mut self) {
        self.session = None;
    }

    pub fn session_clock_running(&self) -> bool {
        self.session.as_ref().is_some_and(|clock| !clock.expired)
    }

    // --- Operation Countdown ---

    pub fn arm_operation(&mut self, op: OperationId, now: Millis) {
        self.operation = Some(OperationCountdown {
            op,
            started_at: now,
            token: self.tokens.issue(),
            fired: false,
        });
    }

    pub fn stop_operation(&mut self) {
        self.operation = None;
    }

    pub fn operation_armed(&self) -> bool {
        self.operation.is_some()
    }

    // --- Inactivity Watchdog ---

    /// Arms or re-arms the single-shot watchdog.
    pub fn arm_watchdog(&mut self, now: Millis) {
        self.watchdog = Some(Watchdog {
            deadline: now + self.timing.inactivity_limit_ms,
            token: self.tokens.issue(),
            fired: false,
        });
    }

    pub fn stop_watchdog(&mut self) {
        self.watchdog = None;
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|w| !w.fired)
    }

    // --- Hint Cycle Scheduler ---

    /// Tears down any previous cycle and arms one for `op`.
    pub fn arm_hint(&mut self, op: OperationId, now: Millis, threshold_ms: f64) {
        self.hint = Some(HintCycle {
            op,
            token: self.tokens.issue(),
            op_started_at: now,
            threshold_ms,
            next_poll_at: now + self.timing.hint_poll_ms,
            hide_at: None,
            help: HelpState::default(),
        });
    }

    pub fn stop_hint(&mut self) {
        self.hint = None;
    }

    pub fn help_state(&self) -> Option<HelpState> {
        self.hint.as_ref().map(|cycle| cycle.help)
    }

    pub fn stop_all(&mut self) {
        self.stop_session_clock();
        self.stop_operation();
        self.stop_watchdog();
        self.stop_hint();
    }

    /// Samples every armed timer against `now`.
    pub fn poll(&mut self, now: Millis) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        if let Some(clock) = self.session.as_mut() {
            if let ClockMode::Countdown { limit_ms } = clock.mode {
                if !clock.expired && now.saturating_sub(clock.started_at) >= limit_ms {
                    clock.expired = true;
                    events.push(TimerEvent::SessionExpired { token: clock.token });
                }
            }
        }

        if let Some(countdown) = self.operation.as_mut() {
            if !countdown.fired
                && now.saturating_sub(countdown.started_at) >= self.timing.operation_limit_ms
            {
                countdown.fired = true;
                events.push(TimerEvent::OperationExpired {
                    op: countdown.op,
                    token: countdown.token,
                });
            }
        }

        if let Some(watchdog) = self.watchdog.as_mut() {
            if !watchdog.fired && now >= watchdog.deadline {
                watchdog.fired = true;
                events.push(TimerEvent::InactivityExpired {
                    token: watchdog.token,
                });
            }
        }

        if let Some(cycle) = self.hint.as_mut() {
            // Hide first so a reveal never overlaps its own cooldown.
            if let Some(hide_at) = cycle.hide_at {
                if now >= hide_at {
                    cycle.hide_at = None;
                    cycle.help.help_is_visible = false;
                    cycle.help.next_help_eligible_at = now + self.timing.hint_cooldown_ms;
                    events.push(TimerEvent::HintHide {
                        op: cycle.op,
                        token: cycle.token,
                    });
                }
            }

            if now >= cycle.next_poll_at {
                cycle.next_poll_at = now + self.timing.hint_poll_ms;
                let elapsed = now.saturating_sub(cycle.op_started_at) as f64;
                if !cycle.help.help_is_visible
                    && elapsed > cycle.threshold_ms
                    && now >= cycle.help.next_help_eligible_at
                {
                    let first = !cycle.help.help_shown;
                    cycle.help.help_shown = true;
                    cycle.help.help_is_visible = true;
                    cycle.hide_at = Some(now + self.timing.hint_display_ms);
                    events.push(TimerEvent::HintReveal {
                        op: cycle.op,
                        token: cycle.token,
                        first,
                    });
                }
            }
        }

        events
    }

    /// True while the timer that produced `event` is still the one armed.
    pub fn is_live(&self, event: &TimerEvent) -> bool {
        match event {
            TimerEvent::SessionExpired { token } => {
                self.session.as_ref().is_some_and(|c| c.token == *token)
            }
            TimerEvent::OperationExpired { op, token } => self
                .operation
                .as_ref()
                .is_some_and(|c| c.token == *token && c.op == *op),
            TimerEvent::InactivityExpired { token } => {
                self.watchdog.as_ref().is_some_and(|w| w.token == *token)
            }
            TimerEvent::HintReveal { op, token, .. } | TimerEvent::HintHide { op, token } => self
                .hint
                .as_ref()
                .is_some_and(|c| c.token == *token && c.op == *op),
        }
    }

    /// The per-operation countdown takes the display while it is armed.
    pub fn reading(&self, now: Millis) -> Option<ClockReading> {
        if let Some(countdown) = &self.operation {
            let remaining = self
                .timing
                .operation_limit_ms
                .saturating_sub(now.saturating_sub(countdown.started_at));
            return Some(ClockReading {
                kind: ClockKind::Remaining,
                value_ms: remaining,
                warning: remaining < self.timing.diagnosis_warning_ms,
            });
        }

        let clock = self.session.as_ref()?;
        let elapsed = now.saturating_sub(clock.started_at);
        Some(match clock.mode {
            ClockMode::Countdown { limit_ms } => {
                let remaining = limit_ms.saturating_sub(elapsed);
                ClockReading {
                    kind: ClockKind::Remaining,
                    value_ms: remaining,
                    warning: remaining < self.timing.timer_warning_ms,
                }
            }
            ClockMode::Stopwatch => ClockReading {
                kind: ClockKind::Elapsed,
                value_ms: elapsed,
                warning: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers() -> TimerSet {
        TimerSet::new(TimingConfig::default())
    }

    #[test]
    fn countdown_expires_once() {
        let mut t = timers();
        t.start_session_clock(ClockMode::Countdown { limit_ms: 1_000 }, 0);
        assert!(t.poll(900).is_empty());
        let events = t.poll(1_000);
        assert!(matches!(events[..], [TimerEvent::SessionExpired { .. }]));
        assert!(t.poll(1_100).is_empty());
        assert!(!t.session_clock_running());
    }

    #[test]
    fn stopping_twice_is_harmless() {
        let mut t = timers();
        t.stop_all();
        t.stop_all();
        t.stop_watchdog();
        assert!(t.poll(100_000).is_empty());
        assert!(t.reading(0).is_none());
    }

    #[test]
    fn rearmed_watchdog_retires_old_token() {
        let mut t = timers();
        t.arm_watchdog(0);
        let events = t.poll(30_000);
        let stale = events[0];
        t.arm_watchdog(30_050);
        assert!(!t.is_live(&stale));
    }

    #[test]
    fn hint_cycle_reveal_hide_cooldown() {
        let mut t = timers();
        let op = OperationId(1);
        t.arm_hint(op, 0, 1_000.0);

        // Not yet past the average.
        assert!(t.poll(500).is_empty());
        assert!(t.poll(1_000).is_empty());
        let events = t.poll(1_500);
        assert!(matches!(events[..], [TimerEvent::HintReveal { first: true, .. }]));
        assert!(t.help_state().unwrap().help_is_visible);

        let events = t.poll(3_500);
        assert!(matches!(events[..], [TimerEvent::HintHide { .. }]));

        // Cooldown until 13_500.
        for now in (4_000..13_500).step_by(500) {
            assert!(t.poll(now).is_empty(), "fired during cooldown at {now}");
        }
        let events = t.poll(13_500);
        assert!(matches!(events[..], [TimerEvent::HintReveal { first: false, .. }]));
    }

    #[test]
    fn diagnosis_reading_comes_from_operation_countdown() {
        let mut t = timers();
        t.arm_operation(OperationId(3), 1_000);
        let reading = t.reading(22_000).unwrap();
        assert_eq!(reading.kind, ClockKind::Remaining);
        assert_eq!(reading.value_ms, 9_000);
        assert!(reading.warning);
    }

    #[test]
    fn timer_mode_warning_under_a_minute() {
        let mut t = timers();
        t.start_session_clock(ClockMode::Countdown { limit_ms: 120_000 }, 0);
        assert!(!t.reading(60_000).unwrap().warning);
        assert!(t.reading(60_001).unwrap().warning);
    }
}
