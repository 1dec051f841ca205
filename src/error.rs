use std::{num::TryFromIntError, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GraphError {
    #[error("capacity {capacity} outside supported range [1, {max}]", max = crate::graph::Graph::MAX_CAPACITY)]
    CapacityRejected { capacity: usize },
    #[error("vertex {vertex} outside [0, {capacity})")]
    OutOfRange { vertex: usize, capacity: usize },
    #[error("edge weight {weight} must be finite and non-negative")]
    InvalidWeight { weight: f64 },
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum EngineError {
    #[error("no source vertex set before query")]
    NoSource,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file {path} could not be opened")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset file {path} could not be parsed")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset file {path} references vertex {vertex} beyond the supported range [0, {max})", max = crate::graph::Graph::MAX_CAPACITY)]
    VertexRange { path: PathBuf, vertex: u64 },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset contains no edges")]
    EmptyDataset,
    #[error("edge {edge_id} has from index outside usize")]
    FromIndex {
        edge_id: u64,
        #[source]
        source: TryFromIntError,
    },
    #[error("edge {edge_id} has to index outside usize")]
    ToIndex {
        edge_id: u64,
        #[source]
        source: TryFromIntError,
    },
    #[error("edge {edge_id} has invalid weight {weight}")]
    InvalidWeight { edge_id: u64, weight: f64 },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("producer task failed")]
    ProducerJoin(#[source] tokio::task::JoinError),
    #[error("writer task failed")]
    WriterJoin(#[source] tokio::task::JoinError),
    #[error("querier task failed")]
    QuerierJoin(#[source] tokio::task::JoinError),
}
