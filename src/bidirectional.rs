use std::collections::BinaryHeap;

use crate::{error::GraphError, graph::Graph, heap::HeapEntry, path::PathResult};

const INF: f64 = f64::INFINITY;

/// One search frontier: tentative distances, tree pointers, and the queue.
struct Search {
    dist: Vec<f64>,
    parent: Vec<Option<usize>>,
    heap: BinaryHeap<HeapEntry>,
}

impl Search {
    fn new(capacity: usize, origin: usize) -> Self {
        let mut dist = vec![INF; capacity];
        let mut parent = vec![None; capacity];
        dist[origin] = 0.0;
        parent[origin] = Some(origin);
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry {
            node: origin,
            dist: 0.0,
        });
        Self { dist, parent, heap }
    }

    fn min_pending(&self) -> f64 {
        self.heap.peek().map_or(INF, |e| e.dist)
    }
}

/// One-off source-target shortest path by bidirectional Dijkstra.
///
/// Runs a forward search over outgoing edges and a backward search over
/// incoming edges, always advancing the side with the smaller frontier (ties
/// to forward). Settling a vertex the opposite search has reached updates the
/// best meeting cost; once `min_forward + min_backward` can no longer beat
/// it, no shorter path exists and the search stops. Each search suppresses
/// expansions beyond `threshold`; a meeting whose two halves both fit the
/// bound is still reported even when their sum exceeds it.
///
/// Reads the graph only; no per-source cache is consulted or updated.
pub fn shortest_path_bidirectional(
    graph: &Graph,
    source: usize,
    target: usize,
    threshold: f64,
) -> Result<PathResult, GraphError> {
    check_vertex(graph, source)?;
    check_vertex(graph, target)?;
    if source == target {
        return Ok(PathResult::of(0.0, vec![source]));
    }

    let capacity = graph.capacity();
    let mut forward = Search::new(capacity, source);
    let mut backward = Search::new(capacity, target);

    let mut best = INF;
    let mut meeting = None;

    loop {
        let min_f = forward.min_pending();
        let min_b = backward.min_pending();
        // Any remaining path costs at least min_f + min_b.
        if min_f + min_b >= best {
            break;
        }
        if min_f <= min_b {
            settle(&mut forward, &backward, threshold, &mut best, &mut meeting, |u| {
                graph.iter_out(u)
            });
        } else {
            settle(&mut backward, &forward, threshold, &mut best, &mut meeting, |u| {
                graph.iter_in(u)
            });
        }
    }

    let Some(meeting) = meeting else {
        return Ok(PathResult::unreachable());
    };
    match assemble_path(&forward, &backward, source, target, meeting) {
        Some(path) => Ok(PathResult::of(best, path)),
        None => Ok(PathResult::unreachable()),
    }
}

/// Pop and settle one vertex of `own`, relaxing its neighbors and updating
/// the best meeting cost against the opposite search.
fn settle<I>(
    own: &mut Search,
    other: &Search,
    threshold: f64,
    best: &mut f64,
    meeting: &mut Option<usize>,
    neighbors: impl Fn(usize) -> I,
) where
    I: Iterator<Item = (usize, f64)>,
{
    let Some(HeapEntry { node: u, dist: d }) = own.heap.pop() else {
        return;
    };
    if d > own.dist[u] {
        return; // stale entry, lazy deletion
    }
    if d > threshold {
        return;
    }
    if other.dist[u] < INF {
        let candidate = d + other.dist[u];
        if candidate < *best {
            *best = candidate;
            *meeting = Some(u);
        }
    }
    for (v, w) in neighbors(u) {
        let next = d + w;
        if next > threshold || next >= own.dist[v] {
            continue;
        }
        own.dist[v] = next;
        own.parent[v] = Some(u);
        own.heap.push(HeapEntry { node: v, dist: next });
    }
}

/// Join the forward chain source..=meeting with the backward chain
/// meeting..=target, without repeating the meeting vertex. `None` on a broken
/// chain, which a finite meeting cost rules out.
fn assemble_path(
    forward: &Search,
    backward: &Search,
    source: usize,
    target: usize,
    meeting: usize,
) -> Option<Vec<usize>> {
    let mut path = vec![meeting];
    let mut v = meeting;
    while v != source {
        v = forward.parent[v]?;
        path.push(v);
    }
    path.reverse();
    let mut v = meeting;
    while v != target {
        v = backward.parent[v]?;
        path.push(v);
    }
    Some(path)
}

fn check_vertex(graph: &Graph, v: usize) -> Result<(), GraphError> {
    if v >= graph.capacity() {
        return Err(GraphError::OutOfRange {
            vertex: v,
            capacity: graph.capacity(),
        });
    }
    Ok(())
}
