use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::event::{Command, SessionEvent};
use super::machine::SessionMachine;
use crate::services::attempts::AttemptLog;
use crate::services::grid::OperationGrid;

/// Receives every notification the machine produces, in order.
pub trait SessionObserver {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F: FnMut(&SessionEvent)> SessionObserver for F {
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Serializes commands and timer ticks onto one machine.
pub struct Reactor<G, L, O> {
    pub receiver: mpsc::Receiver<Command>,
    pub machine: SessionMachine<G, L>,
    observer: O,
    shutdown: CancellationToken,
}

impl<G: OperationGrid, L: AttemptLog, O: SessionObserver> Reactor<G, L, O> {
    pub fn new(receiver: mpsc::Receiver<Command>, machine: SessionMachine<G, L>, observer: O) -> Self {
        Self {
            receiver,
            machine,
            observer,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops `run` after the step in progress.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Applies one command. MUST NOT await: commands run to completion.
    pub fn dispatch(&mut self, command: Command) {
        if let Err(err) = self.machine.handle(command) {
            warn!("Start rejected: {}", err);
            self.observer.on_event(&SessionEvent::StartRejected {
                reason: err.to_string(),
            });
        }
        self.flush();
    }

    /// One timer sample.
    pub fn tick_step(&mut self) {
        self.machine.tick();
        self.flush();
    }

    fn flush(&mut self) {
        for event in self.machine.drain_events() {
            self.observer.on_event(&event);
        }
    }

    /// Async driver loop. Ends on shutdown or when every sender is gone.
    pub async fn run(&mut self) {
        let tick_ms = self.machine.config().timing.tick_ms.max(1);
        info!("Reactor started. Tick: {}ms", tick_ms);

        let mut cadence = interval(Duration::from_millis(tick_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.receiver.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
                _ = cadence.tick() => self.tick_step(),
            }
        }

        info!("Reactor stopped in {:?}", self.machine.phase());
    }
}
