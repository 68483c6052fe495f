use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::GridConfig;
use crate::kernel::state::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Pending,
    Active,
    Correct,
    Wrong,
    Mastered,
}

/// The operation grid: which pairs remain and how each cell looks.
pub trait OperationGrid {
    fn initialize(&mut self, tables: &BTreeSet<u32>);
    /// `None` once the grid is exhausted.
    fn next_operation(&mut self) -> Option<Operation>;
    fn mark_correct(&mut self, op: Operation);
    fn mark_wrong(&mut self, op: Operation);
    fn mark_mastered(&mut self, op: Operation);
    /// Restricts future `next_operation` results to `queue`.
    fn filter_for(&mut self, queue: &[Operation]);
    fn is_complete(&self) -> bool;
    fn reveal_answer(&mut self, op: Operation, value: i64);
    fn hide_answer(&mut self, op: Operation);
}

/// In-memory grid over `tables × 1..=max_factor`.
///
/// Outside training every pair is offered once. In training the filtered queue
/// rotates: the pair just offered goes to the back and only leaves once mastered.
#[derive(Debug)]
pub struct TableGrid {
    config: GridConfig,
    cells: BTreeMap<Operation, CellState>,
    pending: VecDeque<Operation>,
    training: bool,
    revealed: Option<(Operation, i64)>,
}

impl TableGrid {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            cells: BTreeMap::new(),
            pending: VecDeque::new(),
            training: false,
            revealed: None,
        }
    }

    pub fn cell(&self, op: Operation) -> Option<CellState> {
        self.cells.get(&op).copied()
    }

    pub fn revealed(&self) -> Option<(Operation, i64)> {
        self.revealed
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// (answered, total) over the cells in play.
    pub fn progress(&self) -> (usize, usize) {
        let answered = self
            .cells
            .values()
            .filter(|state| !matches!(state, CellState::Pending | CellState::Active))
            .count();
        (answered, self.cells.len())
    }

    fn set(&mut self, op: Operation, state: CellState) {
        if let Some(cell) = self.cells.get_mut(&op) {
            *cell = state;
        }
    }
}

impl Default for TableGrid {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl OperationGrid for TableGrid {
    fn initialize(&mut self, tables: &BTreeSet<u32>) {
        let mut ops: Vec<Operation> = tables
            .iter()
            .flat_map(|&row| (1..=self.config.max_factor).map(move |col| Operation::new(row, col)))
            .collect();
        if self.config.shuffle {
            ops.shuffle(&mut rand::thread_rng());
        }
        self.cells = ops.iter().map(|op| (*op, CellState::Pending)).collect();
        self.pending = ops.into();
        self.training = false;
        self.revealed = None;
    }

    fn next_operation(&mut self) -> Option<Operation> {
        let op = self.pending.pop_front()?;
        if self.training {
            self.pending.push_back(op);
        }
        self.set(op, CellState::Active);
        Some(op)
    }

    fn mark_correct(&mut self, op: Operation) {
        self.set(op, CellState::Correct);
    }

    fn mark_wrong(&mut self, op: Operation) {
        self.set(op, CellState::Wrong);
    }

    fn mark_mastered(&mut self, op: Operation) {
        self.set(op, CellState::Mastered);
        self.pending.retain(|pending| *pending != op);
    }

    fn filter_for(&mut self, queue: &[Operation]) {
        self.training = true;
        self.pending.clear();
        for op in queue {
            if !self.pending.contains(op) {
                self.pending.push_back(*op);
            }
        }
        self.cells = self
            .pending
            .iter()
            .map(|op| (*op, CellState::Pending))
            .collect();
        self.revealed = None;
    }

    fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    fn reveal_answer(&mut self, op: Operation, value: i64) {
        self.revealed = Some((op, value));
    }

    fn hide_answer(&mut self, op: Operation) {
        if self.revealed.is_some_and(|(shown, _)| shown == op) {
            self.revealed = None;
        }
    }
}
