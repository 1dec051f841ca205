use crate::{engine::Engine, path::PathResult};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub(super) enum GraphUpdate {
    SetWeight { from: usize, to: usize, weight: f64 },
    Remove { from: usize, to: usize },
    Insert { from: usize, to: usize, weight: f64 },
}

#[derive(Debug, Default)]
pub(super) struct WriterOutcome {
    pub processed_updates: usize,
    pub mutations_applied: usize,
    pub invalid_index_updates: usize,
    pub invalid_weight_updates: usize,
}

#[derive(Debug, Default)]
pub(super) struct QueryOutcome {
    pub queries_run: usize,
    pub reachable_answers: usize,
    pub bidirectional_mismatches: usize,
    pub last_path: Option<PathResult>,
}

#[derive(Debug)]
pub(super) enum UpdateValidationError {
    IndexOutOfBounds(usize),
    InvalidWeight(f64),
}

/// Engine queries mutate cache state, so readers and the writer serialize
/// behind one lock.
pub(super) type SharedEngine = Arc<Mutex<Engine>>;
