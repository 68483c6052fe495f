use super::state::{Mode, Phase, Stage};

/// Requests a phase transition. These are REQUESTS, not forces; the graph validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseRequest {
    Start(Mode),
    GridExhausted,
    ClockExpired,
    EndRequested,
    WeaknessesFound,
    NoWeaknesses,
    TrainingAccepted,
    QueueCleared,
    VictoryAcknowledged,
    Reset,
}

/// The session phase graph.
pub struct PhaseGraph;

impl PhaseGraph {
    /// Pure function: (Current Phase, Request) -> New Phase
    /// Returns None if the transition is invalid/ignored.
    pub fn transition(current: Phase, request: PhaseRequest) -> Option<Phase> {
        use PhaseRequest::*;
        use Stage::*;

        match (current, request) {
            (_, Reset) => Some(Phase::Config),

            (Phase::Config, Start(Mode::Timer | Mode::Free)) => Some(Phase::Playing(Drill)),
            (Phase::Config, Start(Mode::Adaptive)) => Some(Phase::Playing(Diagnosis)),

            (Phase::Playing(Drill), GridExhausted | ClockExpired | EndRequested) => {
                Some(Phase::Dashboard)
            }

            (Phase::Playing(Diagnosis), WeaknessesFound) => Some(Phase::Playing(Transition)),
            (Phase::Playing(Diagnosis), NoWeaknesses) => Some(Phase::Playing(Victory)),
            (Phase::Playing(Transition), TrainingAccepted) => Some(Phase::Playing(Training)),
            (Phase::Playing(Training), QueueCleared) => Some(Phase::Playing(Victory)),
            (Phase::Playing(Victory), VictoryAcknowledged) => Some(Phase::Dashboard),

            // Quitting mid-way through an adaptive run still lands on the dashboard.
            (Phase::Playing(Diagnosis | Training), EndRequested) => Some(Phase::Dashboard),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_path() {
        let mut phase = Phase::Config;
        for request in [
            PhaseRequest::Start(Mode::Adaptive),
            PhaseRequest::WeaknessesFound,
            PhaseRequest::TrainingAccepted,
            PhaseRequest::QueueCleared,
            PhaseRequest::VictoryAcknowledged,
        ] {
            phase = PhaseGraph::transition(phase, request).unwrap();
        }
        assert_eq!(phase, Phase::Dashboard);
    }

    #[test]
    fn rejects_out_of_order_requests() {
        assert_eq!(
            PhaseGraph::transition(Phase::Config, PhaseRequest::EndRequested),
            None
        );
        assert_eq!(
            PhaseGraph::transition(Phase::Playing(Stage::Transition), PhaseRequest::EndRequested),
            None
        );
        assert_eq!(
            PhaseGraph::transition(Phase::Dashboard, PhaseRequest::Start(Mode::Free)),
            None
        );
        assert_eq!(
            PhaseGraph::transition(Phase::Playing(Stage::Drill), PhaseRequest::WeaknessesFound),
            None
        );
    }

    #[test]
    fn reset_from_anywhere() {
        for phase in [
            Phase::Config,
            Phase::Dashboard,
            Phase::Playing(Stage::Training),
            Phase::Playing(Stage::Victory),
        ] {
            assert_eq!(
                PhaseGraph::transition(phase, PhaseRequest::Reset),
                Some(Phase::Config)
            );
        }
    }
}
