use super::{
    config::{PipelineConfig, WeightBounds},
    types::GraphUpdate,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{instrument, warn};

pub(super) fn start(
    update_sender: mpsc::Sender<GraphUpdate>,
    baseline_edges: Vec<(usize, usize, f64)>,
    config: PipelineConfig,
) -> JoinHandle<()> {
    tokio::spawn(producer_task(update_sender, baseline_edges, config))
}

#[instrument(
    name = "pipeline_producer",
    level = "debug",
    skip_all,
    fields(
        max_updates = config.max_updates,
        edge_count = baseline_edges.len(),
        weight_jitter = config.weight_jitter,
        removal_ratio = config.removal_ratio
    )
)]
async fn producer_task(
    update_sender: mpsc::Sender<GraphUpdate>,
    baseline_edges: Vec<(usize, usize, f64)>,
    config: PipelineConfig,
) {
    let edge_count = baseline_edges.len();
    if edge_count == 0 {
        return;
    }

    let mut rng = StdRng::from_seed(rand::random::<[u8; 32]>());
    // Tracks which baseline edges this producer has removed, so removals and
    // re-inserts alternate per edge and the writer never sees a stale pair.
    let mut removed = vec![false; edge_count];
    let mut remaining = config.max_updates;
    let max_burst = config.max_coalesce.max(1);
    let removal_ratio = config.removal_ratio.clamp(0.0, 1.0);
    let bounds = WeightBounds::from_config(&config);

    while remaining > 0 {
        let burst = rng.random_range(1..=max_burst.min(remaining));

        for _ in 0..burst {
            let index = rng.random_range(0..edge_count);
            let (from, to, baseline_weight) = baseline_edges[index];

            let update = if removed[index] {
                removed[index] = false;
                GraphUpdate::Insert {
                    from,
                    to,
                    weight: baseline_weight,
                }
            } else if removal_ratio > 0.0 && rng.random_bool(removal_ratio) {
                removed[index] = true;
                GraphUpdate::Remove { from, to }
            } else {
                let jitter = if config.weight_jitter > 0.0 {
                    rng.random_range(-config.weight_jitter..config.weight_jitter)
                } else {
                    0.0
                };
                GraphUpdate::SetWeight {
                    from,
                    to,
                    weight: bounds.clamp(baseline_weight * (1.0 + jitter)),
                }
            };

            if update_sender.send(update).await.is_err() {
                warn!("writer dropped before producer finished sending updates");
                return;
            }
        }

        remaining -= burst;
        if remaining == 0 {
            break;
        }

        let max_delay_ms = (config.query_interval.as_millis().max(1) as u64).saturating_mul(2);
        let sleep_ms = rng.random_range(0..=max_delay_ms);
        if sleep_ms > 0 {
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        }
    }
}
