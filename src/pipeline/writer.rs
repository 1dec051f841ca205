use super::{
    config::{PipelineConfig, WeightBounds},
    types::{GraphUpdate, SharedEngine, UpdateValidationError, WriterOutcome},
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

pub(super) fn start(
    shared_engine: SharedEngine,
    receiver: mpsc::Receiver<GraphUpdate>,
    config: PipelineConfig,
) -> JoinHandle<WriterOutcome> {
    tokio::spawn(writer_task(
        shared_engine,
        ReceiverStream::new(receiver),
        config,
    ))
}

#[instrument(
    name = "pipeline_writer",
    level = "debug",
    skip_all,
    fields(
        max_coalesce = config.max_coalesce,
        coalesce_window_ms = config.coalesce_window.as_millis()
    )
)]
async fn writer_task(
    shared_engine: SharedEngine,
    mut update_stream: ReceiverStream<GraphUpdate>,
    config: PipelineConfig,
) -> WriterOutcome {
    let capacity = shared_engine.lock().graph().capacity();
    let mut outcome = WriterOutcome::default();

    let max_coalesce = config.max_coalesce.max(1);
    let coalesce_window = config.coalesce_window;
    let bounds = WeightBounds::from_config(&config);

    while let Some(batch) = next_batch(&mut update_stream, max_coalesce, coalesce_window).await {
        debug!(batch_size = batch.len(), "coalesced batch ready");
        let mut validated = Vec::with_capacity(batch.len());
        for update in batch {
            match validate_update(update, capacity) {
                Ok(valid) => validated.push(valid),
                Err(UpdateValidationError::IndexOutOfBounds(index)) => {
                    outcome.invalid_index_updates += 1;
                    warn!(index, "dropped update with out-of-bounds vertex");
                }
                Err(UpdateValidationError::InvalidWeight(weight)) => {
                    outcome.invalid_weight_updates += 1;
                    warn!(weight, "dropped update with invalid weight");
                }
            }
        }

        if validated.is_empty() {
            warn!("discarded batch: no valid updates after validation");
            continue;
        }

        outcome.processed_updates += validated.len();

        let bounded_updates: Vec<GraphUpdate> = validated
            .into_iter()
            .map(|update| match update {
                GraphUpdate::SetWeight { from, to, weight } => GraphUpdate::SetWeight {
                    from,
                    to,
                    weight: bounds.clamp(weight),
                },
                GraphUpdate::Insert { from, to, weight } => GraphUpdate::Insert {
                    from,
                    to,
                    weight: bounds.clamp(weight),
                },
                remove @ GraphUpdate::Remove { .. } => remove,
            })
            .collect();

        let applied = apply_updates(&shared_engine, &bounded_updates);
        if applied < bounded_updates.len() {
            debug!(
                batch_received = bounded_updates.len(),
                applied, "some updates changed nothing"
            );
        }

        outcome.mutations_applied += applied;
        info!(
            batch_received = bounded_updates.len(),
            applied,
            total_processed = outcome.processed_updates,
            total_applied = outcome.mutations_applied,
            "processed update batch"
        );
    }

    outcome
}

/// Apply one validated batch under a single engine lock. Returns how many
/// updates actually changed the graph.
#[instrument(level = "trace", skip_all, fields(batch = updates.len()))]
fn apply_updates(shared_engine: &SharedEngine, updates: &[GraphUpdate]) -> usize {
    if updates.is_empty() {
        return 0;
    }

    let mut engine = shared_engine.lock();
    let mut applied = 0;
    for update in updates {
        let effective = match *update {
            GraphUpdate::SetWeight { from, to, weight } => {
                engine
                    .set_edge(from, to, weight)
                    .expect("validated update should apply");
                true
            }
            GraphUpdate::Remove { from, to } => engine
                .remove_edge(from, to)
                .expect("validated update should apply"),
            GraphUpdate::Insert { from, to, weight } => engine
                .add_edge(from, to, weight)
                .expect("validated update should apply"),
        };
        if effective {
            applied += 1;
        }
    }
    applied
}

/// Coalescing helper:
/// - Always awaits the first item to respect backpressure.
/// - Then drains up to `max_coalesce - 1` more items until `coalesce_window`
///   elapses.
/// - Batches trade bounded latency for fewer engine lock acquisitions.
async fn next_batch<S>(
    stream: &mut S,
    max_coalesce: usize,
    coalesce_window: Duration,
) -> Option<Vec<GraphUpdate>>
where
    S: Stream<Item = GraphUpdate> + Unpin,
{
    match stream.next().await {
        Some(first) => {
            let mut batch = Vec::with_capacity(max_coalesce);
            batch.push(first);

            if coalesce_window > Duration::ZERO && max_coalesce > 1 {
                let deadline = Instant::now() + coalesce_window;
                while batch.len() < max_coalesce {
                    match timeout_at(deadline, stream.next()).await {
                        Ok(Some(next)) => batch.push(next),
                        Ok(None) => break,
                        Err(_) => break,
                    }
                }
            }

            Some(batch)
        }
        None => None,
    }
}

fn validate_update(
    update: GraphUpdate,
    capacity: usize,
) -> Result<GraphUpdate, UpdateValidationError> {
    let (from, to) = match update {
        GraphUpdate::SetWeight { from, to, .. }
        | GraphUpdate::Remove { from, to }
        | GraphUpdate::Insert { from, to, .. } => (from, to),
    };
    if from >= capacity {
        return Err(UpdateValidationError::IndexOutOfBounds(from));
    }
    if to >= capacity {
        return Err(UpdateValidationError::IndexOutOfBounds(to));
    }
    match update {
        GraphUpdate::SetWeight { weight, .. } | GraphUpdate::Insert { weight, .. }
            if !weight.is_finite() || weight < 0.0 =>
        {
            Err(UpdateValidationError::InvalidWeight(weight))
        }
        valid => Ok(valid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::graph::Graph;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test]
    async fn writer_tracks_invalid_updates() {
        let graph = Graph::from_edges(2, &[(0, 1, 1.0)]).unwrap();
        let shared = Arc::new(Mutex::new(Engine::new(graph)));
        let (tx, rx) = mpsc::channel(4);

        // out-of-bounds vertex
        tx.send(GraphUpdate::SetWeight {
            from: 5,
            to: 0,
            weight: 1.0,
        })
        .await
        .unwrap();
        // invalid weight
        tx.send(GraphUpdate::SetWeight {
            from: 0,
            to: 1,
            weight: -1.0,
        })
        .await
        .unwrap();
        drop(tx);

        let outcome = writer_task(
            Arc::clone(&shared),
            ReceiverStream::new(rx),
            PipelineConfig {
                max_coalesce: 4,
                coalesce_window: Duration::from_millis(1),
                ..PipelineConfig::default()
            },
        )
        .await;

        assert_eq!(outcome.processed_updates, 0);
        assert_eq!(outcome.invalid_index_updates, 1);
        assert_eq!(outcome.invalid_weight_updates, 1);
        assert_eq!(outcome.mutations_applied, 0);
        assert_eq!(shared.lock().graph().weight(0, 1).unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn writer_applies_mixed_batches() {
        let graph = Graph::from_edges(3, &[(0, 1, 1.0), (1, 2, 2.0)]).unwrap();
        let shared = Arc::new(Mutex::new(Engine::new(graph)));
        let (tx, rx) = mpsc::channel(8);

        tx.send(GraphUpdate::SetWeight {
            from: 0,
            to: 1,
            weight: 4.0,
        })
        .await
        .unwrap();
        tx.send(GraphUpdate::Remove { from: 1, to: 2 }).await.unwrap();
        tx.send(GraphUpdate::Insert {
            from: 2,
            to: 0,
            weight: 3.0,
        })
        .await
        .unwrap();
        drop(tx);

        let outcome = writer_task(
            Arc::clone(&shared),
            ReceiverStream::new(rx),
            PipelineConfig {
                max_coalesce: 8,
                coalesce_window: Duration::from_millis(1),
                ..PipelineConfig::default()
            },
        )
        .await;

        assert_eq!(outcome.processed_updates, 3);
        assert_eq!(outcome.mutations_applied, 3);
        let engine = shared.lock();
        assert_eq!(engine.graph().weight(0, 1).unwrap(), Some(4.0));
        assert_eq!(engine.graph().weight(1, 2).unwrap(), None);
        assert_eq!(engine.graph().weight(2, 0).unwrap(), Some(3.0));
    }
}
