use std::collections::HashSet;
use tracing::warn;

use super::state::{IssuedOperation, Operation, OperationId};
use super::time::Millis;
use crate::services::grid::OperationGrid;

/// Pulls drill items from the grid and stamps each issuance with a fresh id.
#[derive(Debug, Default)]
pub struct OperationFeed {
    next_id: u64,
    // Diagnosis must never repeat a pair, whatever the grid does.
    unique: Option<HashSet<Operation>>,
    // Training cycles the queue; a repeat starts a new round.
    round: Option<HashSet<Operation>>,
    rounds: u32,
}

impl OperationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self {
            next_id: self.next_id,
            ..Self::default()
        };
    }

    pub fn begin_diagnosis(&mut self) {
        self.unique = Some(HashSet::new());
        self.round = None;
    }

    pub fn begin_training(&mut self) {
        self.unique = None;
        self.round = Some(HashSet::new());
        self.rounds = 1;
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn next<G: OperationGrid>(&mut self, grid: &mut G, now: Millis) -> Option<IssuedOperation> {
        let operation = loop {
            let candidate = grid.next_operation()?;
            if let Some(seen) = self.unique.as_mut() {
                if !seen.insert(candidate) {
                    warn!("Grid re-offered {} during diagnosis; skipping", candidate);
                    continue;
                }
            }
            break candidate;
        };

        if let Some(round) = self.round.as_mut() {
            if !round.insert(operation) {
                self.rounds += 1;
                round.clear();
                round.insert(operation);
            }
        }

        self.next_id += 1;
        Some(IssuedOperation {
            id: OperationId(self.next_id),
            operation,
            issued_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, VecDeque};

    /// Grid that replays a fixed script, repeats included.
    struct ScriptedGrid(VecDeque<Operation>);

    impl OperationGrid for ScriptedGrid {
        fn initialize(&mut self, _tables: &BTreeSet<u32>) {}
        fn next_operation(&mut self) -> Option<Operation> {
            self.0.pop_front()
        }
        fn mark_correct(&mut self, _op: Operation) {}
        fn mark_wrong(&mut self, _op: Operation) {}
        fn mark_mastered(&mut self, _op: Operation) {}
        fn filter_for(&mut self, _queue: &[Operation]) {}
        fn is_complete(&self) -> bool {
            self.0.is_empty()
        }
        fn reveal_answer(&mut self, _op: Operation, _value: i64) {}
        fn hide_answer(&mut self, _op: Operation) {}
    }

    fn script(ops: &[(u32, u32)]) -> ScriptedGrid {
        ScriptedGrid(ops.iter().map(|&(r, c)| Operation::new(r, c)).collect())
    }

    #[test]
    fn diagnosis_skips_repeats_from_the_grid() {
        let mut grid = script(&[(2, 3), (2, 3), (2, 4), (2, 3)]);
        let mut feed = OperationFeed::new();
        feed.begin_diagnosis();

        let first = feed.next(&mut grid, 0).unwrap();
        let second = feed.next(&mut grid, 10).unwrap();
        assert_eq!(first.operation, Operation::new(2, 3));
        assert_eq!(second.operation, Operation::new(2, 4));
        assert_ne!(first.id, second.id);
        assert!(feed.next(&mut grid, 20).is_none());
    }

    #[test]
    fn training_counts_rounds_on_repeat() {
        let mut grid = script(&[(3, 1), (3, 2), (3, 1)]);
        let mut feed = OperationFeed::new();
        feed.begin_training();

        feed.next(&mut grid, 0).unwrap();
        feed.next(&mut grid, 0).unwrap();
        assert_eq!(feed.rounds(), 1);
        let again = feed.next(&mut grid, 0).unwrap();
        assert_eq!(again.operation, Operation::new(3, 1));
        assert_eq!(feed.rounds(), 2);
    }
}
