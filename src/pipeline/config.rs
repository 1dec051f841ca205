use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Vertex the engine pins as query source for the whole run.
    pub source: usize,
    /// Expansion cap handed to the engine; infinity means unbounded.
    pub distance_threshold: f64,
    pub max_updates: usize,
    pub channel_capacity: usize,
    pub query_interval: Duration,
    pub coalesce_window: Duration,
    pub max_coalesce: usize,
    /// Relative jitter applied to baseline weights by the producer.
    pub weight_jitter: f64,
    /// Fraction of producer updates that remove (and later restore) an edge.
    pub removal_ratio: f64,
    pub min_weight_bound: f64,
    pub max_weight_bound: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: 0,
            distance_threshold: f64::INFINITY,
            max_updates: 256,
            channel_capacity: 64,
            query_interval: Duration::from_millis(250),
            coalesce_window: Duration::from_millis(5),
            max_coalesce: 16,
            weight_jitter: 0.02,
            removal_ratio: 0.1,
            min_weight_bound: 0.0,
            max_weight_bound: 1e9,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct WeightBounds {
    min: f64,
    max: f64,
}

impl WeightBounds {
    pub(super) fn from_config(config: &PipelineConfig) -> Self {
        let min = config.min_weight_bound.max(0.0);
        let max = config.max_weight_bound.max(min);
        Self { min, max }
    }

    #[inline]
    pub(super) fn clamp(self, weight: f64) -> f64 {
        weight.clamp(self.min, self.max)
    }
}
