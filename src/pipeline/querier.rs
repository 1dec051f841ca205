use super::{
    config::PipelineConfig,
    types::{QueryOutcome, SharedEngine},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, instrument, warn};

pub(super) fn start(
    shared_engine: SharedEngine,
    shutdown: oneshot::Receiver<()>,
    config: PipelineConfig,
) -> JoinHandle<QueryOutcome> {
    tokio::spawn(querier_task(shared_engine, shutdown, config))
}

#[instrument(
    name = "pipeline_querier",
    level = "debug",
    skip_all,
    fields(query_interval_ms = config.query_interval.as_millis())
)]
async fn querier_task(
    shared_engine: SharedEngine,
    mut shutdown: oneshot::Receiver<()>,
    config: PipelineConfig,
) -> QueryOutcome {
    let mut interval = time::interval(config.query_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut rng = StdRng::from_seed(rand::random::<[u8; 32]>());
    let mut outcome = QueryOutcome::default();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_query_pass(&shared_engine, &mut rng, &mut outcome);
            }
            _shutdown_request = &mut shutdown => {
                // Final pass so a short run still answers at least once.
                run_query_pass(&shared_engine, &mut rng, &mut outcome);
                break;
            }
        }
    }

    outcome
}

/// One query pass under the engine lock: a cached shortest-path query to a
/// random target, cross-checked against a stateless bidirectional run.
fn run_query_pass(shared_engine: &SharedEngine, rng: &mut StdRng, outcome: &mut QueryOutcome) {
    let mut engine = shared_engine.lock();
    let Some(source) = engine.source() else {
        return;
    };
    let target = rng.random_range(0..engine.graph().capacity());

    let cached = engine
        .shortest_path(target)
        .expect("target drawn from the engine's vertex range");
    let check = engine
        .bidirectional(source, target)
        .expect("endpoints drawn from the engine's vertex range");

    let agree = if cached.distance.is_finite() || check.distance.is_finite() {
        (cached.distance - check.distance).abs() <= 1e-9
    } else {
        true
    };
    if !agree {
        outcome.bidirectional_mismatches += 1;
        warn!(
            target,
            cached = cached.distance,
            bidirectional = check.distance,
            "cached and bidirectional distances diverged"
        );
    }

    outcome.queries_run += 1;
    if cached.reachable {
        outcome.reachable_answers += 1;
        debug!(
            target,
            distance = cached.distance,
            hops = cached.path.len().saturating_sub(1),
            "query answered"
        );
        outcome.last_path = Some(cached);
    } else {
        debug!(target, "target unreachable");
    }
}
