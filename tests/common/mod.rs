#![allow(dead_code)]

use std::sync::Arc;

use fastmath::config::{EngineConfig, GridConfig};
use fastmath::kernel::state::AttemptMetric;
use fastmath::kernel::time::{Clock, ManualClock};
use fastmath::services::attempts::MemoryAttemptLog;
use fastmath::services::grid::TableGrid;
use fastmath::{SessionEvent, SessionMachine};

/// Unshuffled grid over `1..=max_factor` so tests know the issue order.
pub fn machine(max_factor: u32) -> (SessionMachine, ManualClock) {
    let clock = ManualClock::new();
    let config = EngineConfig {
        grid: GridConfig {
            max_factor,
            shuffle: false,
        },
        ..EngineConfig::default()
    };
    let grid = TableGrid::new(config.grid.clone());
    let machine = SessionMachine::new(config, Arc::new(clock.clone()), grid, MemoryAttemptLog::new());
    (machine, clock)
}

pub fn answer_right(m: &mut SessionMachine) -> AttemptMetric {
    let op = m.current().expect("no operation on screen").operation;
    m.submit(&op.answer().to_string()).expect("answer was ignored")
}

pub fn answer_wrong(m: &mut SessionMachine) -> AttemptMetric {
    let op = m.current().expect("no operation on screen").operation;
    m.submit(&(op.answer() + 1).to_string()).expect("answer was ignored")
}

/// Ticks at the default 100ms cadence until `until`.
pub fn tick_until(m: &mut SessionMachine, clock: &ManualClock, until: u64) {
    while clock.now_ms() < until {
        clock.advance(100);
        m.tick();
    }
}

pub fn count<F: Fn(&SessionEvent) -> bool>(events: &[SessionEvent], pred: F) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
