use pathops::{
    dataset::{self, Dataset},
    pipeline::{self, PipelineConfig},
};
use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let dataset: Dataset = dataset::load_default_dataset()?;
    let stats = pipeline::run(dataset, PipelineConfig::default()).await?;
    if let Some(ref path) = stats.last_path {
        info!(
            updates_processed = stats.updates_processed,
            mutations_applied = stats.mutations_applied,
            queries_run = stats.queries_run,
            reachable_answers = stats.reachable_answers,
            distance = path.distance,
            vertices = ?path.path,
            "pipeline finished with a reachable answer"
        );
    } else {
        info!(
            updates_processed = stats.updates_processed,
            mutations_applied = stats.mutations_applied,
            queries_run = stats.queries_run,
            found_path = false,
            "pipeline finished"
        );
    }
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathops=info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
