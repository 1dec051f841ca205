use crate::{error::DatasetError, graph::Graph};
use serde::Deserialize;
use std::{fs::File, path::Path};

pub const DEFAULT_DATASET_PATH: &str = "datasets/graph.json";

#[derive(Debug, Deserialize, Clone)]
pub struct Node {
    pub id: u64,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EdgeRecord {
    pub id: u64,
    pub from: u64,
    pub to: u64,
    pub weight: f64,
}

/// On-disk description of an initial graph: labeled nodes plus weighted
/// directed edges. Vertex ids double as engine vertex indices, so a loaded
/// dataset is checked against the engine's addressable range up front.
#[derive(Debug, Deserialize, Clone)]
pub struct Dataset {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
}

impl Dataset {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset: Dataset =
            serde_json::from_reader(file).map_err(|source| DatasetError::Deserialize {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(vertex) = dataset
            .highest_vertex_id()
            .filter(|&id| id >= Graph::MAX_CAPACITY as u64)
        {
            return Err(DatasetError::VertexRange {
                path: path.to_path_buf(),
                vertex,
            });
        }
        Ok(dataset)
    }

    /// Highest vertex id referenced by any node or edge endpoint, `None` for
    /// a dataset naming no vertices at all.
    pub fn highest_vertex_id(&self) -> Option<u64> {
        self.nodes
            .iter()
            .map(|node| node.id)
            .chain(self.edges.iter().flat_map(|edge| [edge.from, edge.to]))
            .max()
    }
}

pub fn load_default_dataset() -> Result<Dataset, DatasetError> {
    Dataset::load_from_path(DEFAULT_DATASET_PATH)
}
