use crate::path::PathResult;

#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub updates_processed: usize,
    pub mutations_applied: usize,
    pub invalid_index_updates: usize,
    pub invalid_weight_updates: usize,
    pub queries_run: usize,
    pub reachable_answers: usize,
    pub bidirectional_mismatches: usize,
    pub last_path: Option<PathResult>,
}
