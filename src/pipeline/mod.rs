mod config;
mod producer;
mod querier;
mod stats;
mod types;
mod writer;

pub use crate::error::PipelineError;
pub use config::PipelineConfig;
pub use stats::PipelineStats;

use crate::{dataset::Dataset, engine::Engine, graph::Graph};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

use types::{GraphUpdate, SharedEngine};

#[instrument(name = "pipeline_run", level = "debug", skip_all)]
pub async fn run(dataset: Dataset, config: PipelineConfig) -> Result<PipelineStats, PipelineError> {
    if dataset.edges.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let mut input_edges: Vec<(usize, usize, f64)> = Vec::with_capacity(dataset.edges.len());
    let mut highest_vertex = 0usize;

    for edge in &dataset.edges {
        let from = usize::try_from(edge.from).map_err(|source| PipelineError::FromIndex {
            edge_id: edge.id,
            source,
        })?;
        let to = usize::try_from(edge.to).map_err(|source| PipelineError::ToIndex {
            edge_id: edge.id,
            source,
        })?;
        if !edge.weight.is_finite() || edge.weight < 0.0 {
            return Err(PipelineError::InvalidWeight {
                edge_id: edge.id,
                weight: edge.weight,
            });
        }
        input_edges.push((from, to, edge.weight));
        highest_vertex = highest_vertex.max(from.max(to));
    }
    for node in &dataset.nodes {
        if let Ok(id) = usize::try_from(node.id) {
            highest_vertex = highest_vertex.max(id);
        }
    }

    let vertex_count = highest_vertex + 1;
    let mut graph = Graph::new(vertex_count)?;
    let mut baseline_edges = Vec::with_capacity(input_edges.len());
    for (from, to, weight) in input_edges {
        if graph.add_edge(from, to, weight)? {
            baseline_edges.push((from, to, weight));
        } else {
            warn!(from, to, "dataset repeats an edge pair, keeping the first weight");
        }
    }

    let mut engine = Engine::new(graph);
    engine.set_source(config.source)?;
    engine.set_threshold(config.distance_threshold);

    info!(
        edge_count = baseline_edges.len(),
        vertex_count,
        source = config.source,
        "initialised pipeline state"
    );

    let shared_engine: SharedEngine = Arc::new(Mutex::new(engine));

    let (update_sender, update_receiver) = mpsc::channel::<GraphUpdate>(config.channel_capacity);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    info!("spawning writer task");
    let writer_handle = writer::start(Arc::clone(&shared_engine), update_receiver, config.clone());

    info!("spawning querier task");
    let querier_handle = querier::start(Arc::clone(&shared_engine), shutdown_rx, config.clone());

    info!("spawning producer task");
    let producer_handle = producer::start(update_sender, baseline_edges, config.clone());

    info!("awaiting producer task completion");
    producer_handle.await.map_err(PipelineError::ProducerJoin)?;
    info!("producer task completed");

    let writer_outcome = writer_handle.await.map_err(PipelineError::WriterJoin)?;
    info!(
        processed_updates = writer_outcome.processed_updates,
        mutations_applied = writer_outcome.mutations_applied,
        invalid_index_updates = writer_outcome.invalid_index_updates,
        invalid_weight_updates = writer_outcome.invalid_weight_updates,
        "writer task completed"
    );

    let _ = shutdown_tx.send(());
    let query_outcome = querier_handle.await.map_err(PipelineError::QuerierJoin)?;
    if let Some(ref path) = query_outcome.last_path {
        info!(
            queries_run = query_outcome.queries_run,
            reachable_answers = query_outcome.reachable_answers,
            distance = path.distance,
            vertices = ?path.path,
            "querier task completed with a reachable answer"
        );
    } else {
        info!(
            queries_run = query_outcome.queries_run,
            found_path = false,
            "querier task completed"
        );
    }

    Ok(PipelineStats {
        updates_processed: writer_outcome.processed_updates,
        mutations_applied: writer_outcome.mutations_applied,
        invalid_index_updates: writer_outcome.invalid_index_updates,
        invalid_weight_updates: writer_outcome.invalid_weight_updates,
        queries_run: query_outcome.queries_run,
        reachable_answers: query_outcome.reachable_answers,
        bidirectional_mismatches: query_outcome.bidirectional_mismatches,
        last_path: query_outcome.last_path,
    })
}
