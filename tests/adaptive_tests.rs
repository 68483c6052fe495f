mod common;

use common::{answer_right, answer_wrong, count, machine, tick_until};
use fastmath::kernel::state::{Operation, Phase, Stage};
use fastmath::kernel::time::Clock;
use fastmath::services::attempts::AttemptLog;
use fastmath::services::grid::CellState;
use fastmath::{ModeRequest, SessionEvent, StartRequest};

/// Diagnosis over table 3 (3x1, 3x2, 3x3): right in 1s, wrong in 1s, right but slow in 2s.
/// avg = 1333.3ms, threshold = 1600ms, queue = [3x2, 3x3].
fn diagnose_with_two_weaknesses() -> (fastmath::SessionMachine, fastmath::kernel::time::ManualClock) {
    let (mut m, clock) = machine(3);
    m.start(StartRequest::new("ana", [3], ModeRequest::Adaptive)).unwrap();
    assert_eq!(m.phase(), Phase::Playing(Stage::Diagnosis));

    clock.advance(1_000);
    answer_right(&mut m);
    clock.advance(1_000);
    answer_wrong(&mut m);
    clock.advance(2_000);
    answer_right(&mut m);
    (m, clock)
}

#[test]
fn test_diagnosis_builds_the_training_queue() {
    let (mut m, _clock) = diagnose_with_two_weaknesses();

    assert_eq!(m.phase(), Phase::Playing(Stage::Transition));
    let session = m.session();
    assert_eq!(session.metrics.len(), 3);
    assert_eq!(session.training_queue, vec![Operation::new(3, 2), Operation::new(3, 3)]);
    assert_eq!(session.initial_weakness_count, 2);
    assert!((session.avg_diagnosis_ms - 4_000.0 / 3.0).abs() < 1e-9);

    let events = m.drain_events();
    let ready = events.iter().find_map(|e| match e {
        SessionEvent::TransitionReady { weaknesses, .. } => Some(*weaknesses),
        _ => None,
    });
    assert_eq!(ready, Some(2));
    assert!(m.submit("3").is_none(), "no answers between phases");
    assert_eq!(m.telemetry.snapshot().last_analysis_weaknesses, Some(2));
}

#[test]
fn test_diagnosis_never_repeats_a_pair() {
    let (mut m, _clock) = machine(15);
    m.start(StartRequest::new("ana", [2, 5], ModeRequest::Adaptive)).unwrap();

    let mut seen = std::collections::BTreeSet::new();
    while let Some(current) = m.current() {
        assert!(seen.insert(current.operation), "{} issued twice", current.operation);
        answer_right(&mut m);
    }
    assert_eq!(seen.len(), 30);
    assert_eq!(m.session().metrics.len(), 30);
}

#[test]
fn test_training_to_victory() {
    let (mut m, clock) = diagnose_with_two_weaknesses();
    m.begin_training();
    assert_eq!(m.phase(), Phase::Playing(Stage::Training));

    // Counters restart and the watchdog stays off.
    assert_eq!(m.session().correct_count, 0);
    assert_eq!(m.session().wrong_count, 0);
    assert_eq!(m.session().training_rounds, 1);
    assert!(!m.timers().watchdog_armed());
    assert_eq!(m.current().unwrap().operation, Operation::new(3, 2));

    clock.advance(500);
    answer_right(&mut m);
    assert_eq!(m.session().training_queue, vec![Operation::new(3, 3)]);
    assert_eq!(m.grid().cell(Operation::new(3, 2)), Some(CellState::Mastered));

    // A wrong answer keeps the pair queued and it comes back.
    clock.advance(500);
    answer_wrong(&mut m);
    assert_eq!(m.session().training_queue.len(), 1);
    assert_eq!(m.current().unwrap().operation, Operation::new(3, 3));
    assert_eq!(m.session().training_rounds, 2);

    clock.advance(500);
    answer_right(&mut m);
    assert_eq!(m.phase(), Phase::Playing(Stage::Victory));
    assert_eq!(m.session().metrics.len(), 3, "training does not add diagnosis metrics");

    let events = m.drain_events();
    let victory = events.iter().find_map(|e| match e {
        SessionEvent::Victory {
            initial_weaknesses,
            training_rounds,
            ..
        } => Some((*initial_weaknesses, *training_rounds)),
        _ => None,
    });
    assert_eq!(victory, Some((2, 2)));

    m.acknowledge_victory();
    assert_eq!(m.phase(), Phase::Dashboard);
    let events = m.drain_events();
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::SessionEnded { .. })), 1);
    // Diagnosis and training attempts are both in the transcript.
    assert_eq!(m.log().session_stats().total, 6);
}

#[test]
fn test_idle_training_never_raises_inactivity() {
    let (mut m, clock) = diagnose_with_two_weaknesses();
    m.begin_training();
    let start = clock.now_ms();
    m.drain_events();

    // Two minutes without a keystroke.
    tick_until(&mut m, &clock, start + 120_000);

    assert_eq!(m.phase(), Phase::Playing(Stage::Training));
    assert!(!m.session().inactivity_raised);
    let events = m.drain_events();
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::InactivityRaised)), 0);
    assert!(answer_right(&mut m).is_correct, "answers still accepted");
}

#[test]
fn test_no_weaknesses_is_immediate_victory() {
    let (mut m, clock) = machine(3);
    m.start(StartRequest::new("ana", [2], ModeRequest::Adaptive)).unwrap();
    for _ in 0..3 {
        clock.advance(1_000);
        answer_right(&mut m);
    }

    assert_eq!(m.phase(), Phase::Playing(Stage::Victory));
    assert!(m.session().training_queue.is_empty());
    assert_eq!(m.session().training_rounds, 0);

    // Training can not be entered from here.
    m.begin_training();
    assert_eq!(m.phase(), Phase::Playing(Stage::Victory));
}

#[test]
fn test_operation_countdown_forces_a_timeout() {
    let (mut m, clock) = machine(3);
    m.start(StartRequest::new("ana", [3], ModeRequest::Adaptive)).unwrap();
    let first = m.current().unwrap();

    // Keep the watchdog from firing alongside the countdown.
    tick_until(&mut m, &clock, 29_000);
    m.keystroke();
    let reading = m.clock_reading().unwrap();
    assert_eq!(reading.value_ms, 1_000);
    assert!(reading.warning);

    tick_until(&mut m, &clock, 30_000);
    let events = m.drain_events();
    let timeout = events.iter().find_map(|e| match e {
        SessionEvent::AttemptEvaluated { id, metric } if *id == first.id => Some(*metric),
        _ => None,
    });
    let metric = timeout.expect("countdown expiry must record an attempt");
    assert!(metric.is_timeout);
    assert!(!metric.is_correct);
    assert_eq!(metric.response_time_ms, 30_000);

    assert_eq!(m.session().wrong_count, 1);
    assert_eq!(m.session().metrics, vec![metric]);
    assert_ne!(m.current().unwrap().id, first.id);
    assert!(!m.session().inactivity_raised);

    let rows = m.log().export_rows();
    assert_eq!(rows[0].user_input, None);
    assert_eq!(rows[0].response_time, 30_000);

    // The answer arrives too late.
    assert!(m.submit_for(first.id, "3").is_none());
    assert_eq!(clock.now_ms(), 30_000);
}

#[test]
fn test_hint_cycle_in_training() {
    let (mut m, clock) = diagnose_with_two_weaknesses();
    m.begin_training();
    let start = clock.now_ms();
    m.drain_events();

    // Revealed on the first poll past the 1333ms diagnosis average.
    tick_until(&mut m, &clock, start + 1_400);
    assert_eq!(m.session().hints_used, 0);
    tick_until(&mut m, &clock, start + 1_500);
    assert_eq!(m.session().hints_used, 1);
    assert_eq!(m.grid().revealed(), Some((Operation::new(3, 2), 6)));

    tick_until(&mut m, &clock, start + 3_500);
    assert_eq!(m.grid().revealed(), None);

    // Cooldown, then a second reveal that does not count again.
    tick_until(&mut m, &clock, start + 13_400);
    assert!(m.grid().revealed().is_none());
    tick_until(&mut m, &clock, start + 13_500);
    assert!(m.grid().revealed().is_some());
    assert_eq!(m.session().hints_used, 1);

    let events = m.drain_events();
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::HintShown { .. })), 2);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::HintHidden { .. })), 1);

    // Answering clears the visible hint and the next pair starts fresh.
    answer_right(&mut m);
    assert!(m.grid().revealed().is_none());
    assert!(!m.help_state().unwrap().help_shown);
    assert!(!m.session().inactivity_raised, "no watchdog in training");
}

#[test]
fn test_end_session_from_diagnosis() {
    let (mut m, clock) = machine(15);
    m.start(StartRequest::new("ana", [8], ModeRequest::Adaptive)).unwrap();
    clock.advance(900);
    answer_right(&mut m);
    m.end_session();
    assert_eq!(m.phase(), Phase::Dashboard);
    assert!(m.timers().help_state().is_none());
    assert!(!m.timers().operation_armed());
}
