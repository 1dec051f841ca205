use std::fmt;

use crate::error::GraphError;

/// Edge list item: (from, to, weight)
pub type InputEdge = (usize, usize, f64);

/// Weighted directed graph over a fixed vertex range `[0, capacity)`.
///
/// Keeps two adjacency lists per vertex:
/// - `out_edges[v]` holds `(to, weight)` records for edges leaving `v`.
/// - `in_edges[v]` holds the mirror `(from, weight)` records for edges
///   entering `v`, maintained in lockstep so backward search can walk the
///   reverse graph without a transpose pass.
///
/// At most one edge exists per ordered `(from, to)` pair; membership is
/// scanned linearly, which is fine at the sparse degrees this is built for.
#[derive(Clone)]
pub struct Graph {
    out_edges: Vec<Vec<(usize, f64)>>,
    in_edges: Vec<Vec<(usize, f64)>>,
    edge_count: usize,
    capacity: usize,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("capacity", &self.capacity)
            .field("edge_count", &self.edge_count)
            .finish()
    }
}

impl Graph {
    pub const MAX_CAPACITY: usize = 100_000;

    /// Build an empty graph with `capacity` addressable vertices.
    pub fn new(capacity: usize) -> Result<Self, GraphError> {
        if capacity == 0 || capacity > Self::MAX_CAPACITY {
            return Err(GraphError::CapacityRejected { capacity });
        }
        Ok(Self {
            out_edges: vec![Vec::new(); capacity],
            in_edges: vec![Vec::new(); capacity],
            edge_count: 0,
            capacity,
        })
    }

    /// Build a graph from `(from, to, weight)` triples. Duplicate pairs keep
    /// the first occurrence.
    pub fn from_edges(capacity: usize, edges: &[InputEdge]) -> Result<Self, GraphError> {
        let mut graph = Self::new(capacity)?;
        for &(from, to, weight) in edges {
            graph.add_edge(from, to, weight)?;
        }
        Ok(graph)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Insert the edge `from -> to`. Returns `Ok(false)` without side effect
    /// when the pair already exists.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f64) -> Result<bool, GraphError> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        check_weight(weight)?;
        if self.out_edges[from].iter().any(|&(v, _)| v == to) {
            return Ok(false);
        }
        self.out_edges[from].push((to, weight));
        self.in_edges[to].push((from, weight));
        self.edge_count += 1;
        Ok(true)
    }

    /// Remove the edge `from -> to` and its incoming mirror. Returns
    /// `Ok(false)` if no such edge exists.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> Result<bool, GraphError> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        let Some(out_pos) = self.out_edges[from].iter().position(|&(v, _)| v == to) else {
            return Ok(false);
        };
        self.out_edges[from].remove(out_pos);
        if let Some(in_pos) = self.in_edges[to].iter().position(|&(u, _)| u == from) {
            self.in_edges[to].remove(in_pos);
        }
        self.edge_count -= 1;
        Ok(true)
    }

    /// Replace the weight of `from -> to` in both records and return the
    /// previous weight, or insert the edge and return `None` if absent.
    pub fn set_weight(
        &mut self,
        from: usize,
        to: usize,
        weight: f64,
    ) -> Result<Option<f64>, GraphError> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        check_weight(weight)?;
        if let Some(entry) = self.out_edges[from].iter_mut().find(|(v, _)| *v == to) {
            let old = entry.1;
            entry.1 = weight;
            if let Some(mirror) = self.in_edges[to].iter_mut().find(|(u, _)| *u == from) {
                mirror.1 = weight;
            }
            return Ok(Some(old));
        }
        self.out_edges[from].push((to, weight));
        self.in_edges[to].push((from, weight));
        self.edge_count += 1;
        Ok(None)
    }

    /// Current weight of `from -> to`, or `None` if no such edge exists.
    pub fn weight(&self, from: usize, to: usize) -> Result<Option<f64>, GraphError> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        Ok(self.out_edges[from]
            .iter()
            .find(|&&(v, _)| v == to)
            .map(|&(_, w)| w))
    }

    /// Outgoing edges of `v` as `(to, weight)`, in insertion order.
    ///
    /// Panics if `v` is out of range.
    #[inline]
    pub fn iter_out(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.out_edges[v].iter().copied()
    }

    /// Incoming edges of `v` as `(from, weight)`, in insertion order.
    ///
    /// Panics if `v` is out of range.
    #[inline]
    pub fn iter_in(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.in_edges[v].iter().copied()
    }

    #[inline]
    fn check_vertex(&self, v: usize) -> Result<(), GraphError> {
        if v >= self.capacity {
            return Err(GraphError::OutOfRange {
                vertex: v,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[inline]
fn check_weight(weight: f64) -> Result<(), GraphError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(GraphError::InvalidWeight { weight });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_capacity_outside_range() {
        assert!(matches!(
            Graph::new(0),
            Err(GraphError::CapacityRejected { capacity: 0 })
        ));
        assert!(matches!(
            Graph::new(Graph::MAX_CAPACITY + 1),
            Err(GraphError::CapacityRejected { .. })
        ));
        assert!(Graph::new(1).is_ok());
        assert!(Graph::new(Graph::MAX_CAPACITY).is_ok());
    }

    #[test]
    fn edge_crud_round_trip() {
        let mut graph = Graph::new(3).unwrap();
        assert!(graph.add_edge(0, 1, 1.0).unwrap());
        assert!(!graph.add_edge(0, 1, 2.0).unwrap(), "duplicate pair");
        assert_eq!(graph.weight(0, 1).unwrap(), Some(1.0));
        assert_eq!(graph.weight(1, 0).unwrap(), None);
        assert!(graph.remove_edge(0, 1).unwrap());
        assert_eq!(graph.weight(0, 1).unwrap(), None);
        assert!(!graph.remove_edge(0, 1).unwrap());

        assert_eq!(graph.set_weight(0, 1, 5.0).unwrap(), None, "insert");
        assert_eq!(graph.weight(0, 1).unwrap(), Some(5.0));
        assert_eq!(graph.set_weight(0, 1, 10.0).unwrap(), Some(5.0), "update");
        assert_eq!(graph.weight(0, 1).unwrap(), Some(10.0));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn incoming_records_mirror_outgoing() {
        let mut graph = Graph::new(3).unwrap();
        graph.add_edge(0, 1, 2.0).unwrap();
        graph.add_edge(2, 1, 3.0).unwrap();

        let incoming: Vec<_> = graph.iter_in(1).collect();
        assert_eq!(incoming, vec![(0, 2.0), (2, 3.0)]);

        graph.set_weight(2, 1, 4.0).unwrap();
        let incoming: Vec<_> = graph.iter_in(1).collect();
        assert_eq!(incoming, vec![(0, 2.0), (2, 4.0)]);

        graph.remove_edge(0, 1).unwrap();
        let incoming: Vec<_> = graph.iter_in(1).collect();
        assert_eq!(incoming, vec![(2, 4.0)]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn iter_out_preserves_insertion_order() {
        let mut graph = Graph::new(4).unwrap();
        graph.add_edge(0, 2, 1.5).unwrap();
        graph.add_edge(0, 1, 0.5).unwrap();
        graph.add_edge(0, 3, 2.5).unwrap();

        let neighbors: Vec<_> = graph.iter_out(0).collect();
        assert_eq!(neighbors, vec![(2, 1.5), (1, 0.5), (3, 2.5)]);
        assert_eq!(graph.iter_out(1).count(), 0);
    }

    #[test]
    fn rejects_out_of_range_vertices() {
        let mut graph = Graph::new(2).unwrap();
        assert!(matches!(
            graph.add_edge(0, 2, 1.0),
            Err(GraphError::OutOfRange {
                vertex: 2,
                capacity: 2
            })
        ));
        assert!(matches!(
            graph.remove_edge(5, 0),
            Err(GraphError::OutOfRange { vertex: 5, .. })
        ));
        assert!(matches!(
            graph.weight(0, 3),
            Err(GraphError::OutOfRange { vertex: 3, .. })
        ));
        assert_eq!(graph.edge_count(), 0, "failed mutations leave no trace");
    }

    #[test]
    fn rejects_invalid_weights() {
        let mut graph = Graph::new(2).unwrap();
        assert!(matches!(
            graph.add_edge(0, 1, -1.0),
            Err(GraphError::InvalidWeight { .. })
        ));
        assert!(matches!(
            graph.add_edge(0, 1, f64::NAN),
            Err(GraphError::InvalidWeight { .. })
        ));
        assert!(matches!(
            graph.set_weight(0, 1, f64::INFINITY),
            Err(GraphError::InvalidWeight { .. })
        ));
        assert!(graph.add_edge(0, 1, 0.0).unwrap(), "zero weight is legal");
    }

    #[test]
    fn from_edges_builds_adjacency() {
        let graph = Graph::from_edges(3, &[(0, 1, 1.0), (1, 2, 2.0), (0, 2, 5.0)]).unwrap();
        assert_eq!(graph.edge_count(), 3);
        let neighbors: Vec<_> = graph.iter_out(0).collect();
        assert_eq!(neighbors, vec![(1, 1.0), (2, 5.0)]);
    }
}
