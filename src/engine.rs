use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::debug;

use crate::{
    bidirectional,
    error::{EngineError, GraphError},
    graph::Graph,
    heap::HeapEntry,
    path::PathResult,
};

const INF: f64 = f64::INFINITY;

/// Relaxing mutation recorded for the next query: the edge `from -> to` now
/// carries `weight`, which can only lower `dist[to]`.
#[derive(Debug, Clone, Copy)]
struct PendingRelax {
    from: usize,
    to: usize,
    weight: f64,
}

/// Incremental single-source shortest-path engine.
///
/// Caches the shortest-path tree of one pinned source and repairs it across
/// graph mutations instead of recomputing from scratch:
/// - relaxing changes (edge added, weight decreased) queue up and are healed
///   in one localized Dijkstra pass at the next query;
/// - tightening changes (edge removed, weight increased) mark the cached
///   subtree below the edge head dirty and trigger a boundary-seeded
///   recompute;
/// - single-target queries stop as soon as the target settles.
///
/// The engine owns its [`Graph`]. Mutations issued through [`add_edge`],
/// [`remove_edge`] and [`set_edge`] keep the cache bookkeeping in sync;
/// anything done through [`graph_mut`] must be followed by [`invalidate`].
///
/// [`add_edge`]: Engine::add_edge
/// [`remove_edge`]: Engine::remove_edge
/// [`set_edge`]: Engine::set_edge
/// [`graph_mut`]: Engine::graph_mut
/// [`invalidate`]: Engine::invalidate
#[derive(Clone)]
pub struct Engine {
    graph: Graph,
    source: Option<usize>,
    /// Bumped on every mutation notification; equality with `committed` means
    /// the cache is fresh.
    graph_version: u64,
    /// Version the cached `dist`/`parent` arrays are globally correct for;
    /// `None` until the first complete run.
    committed: Option<u64>,
    dist: Vec<f64>,
    parent: Vec<Option<usize>>,
    heap: BinaryHeap<HeapEntry>,
    pending_relax: Vec<PendingRelax>,
    dirty: HashSet<usize>,
    threshold: f64,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("source", &self.source)
            .field("graph_version", &self.graph_version)
            .field("committed", &self.committed)
            .field("pending_relax", &self.pending_relax.len())
            .field("dirty", &self.dirty.len())
            .finish()
    }
}

impl Engine {
    /// Bind an engine to `graph` for the graph's lifetime.
    pub fn new(graph: Graph) -> Self {
        let capacity = graph.capacity();
        Self {
            graph,
            source: None,
            graph_version: 0,
            committed: None,
            dist: vec![INF; capacity],
            parent: vec![None; capacity],
            heap: BinaryHeap::new(),
            pending_relax: Vec::new(),
            dirty: HashSet::new(),
            threshold: INF,
        }
    }

    /// Engine over a fresh empty graph with `capacity` vertices.
    pub fn with_capacity(capacity: usize) -> Result<Self, GraphError> {
        Ok(Self::new(Graph::new(capacity)?))
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct access to the graph. Any mutation made this way bypasses the
    /// cache bookkeeping and must be followed by [`Engine::invalidate`].
    #[inline]
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    #[inline]
    pub fn source(&self) -> Option<usize> {
        self.source
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pin the source for subsequent queries. Changing the source drops all
    /// per-source state; re-pinning the current source keeps the cache.
    pub fn set_source(&mut self, source: usize) -> Result<(), EngineError> {
        self.check_vertex(source)?;
        if self.source != Some(source) {
            self.source = Some(source);
            self.committed = None;
            self.pending_relax.clear();
            self.dirty.clear();
            self.heap.clear();
        }
        Ok(())
    }

    /// Cap expansion at `threshold`: vertices whose tentative distance
    /// exceeds it are left at infinity. Negative or NaN values mean
    /// unbounded. Cached distances are only valid under the threshold they
    /// were computed with, so an effective change invalidates the cache.
    pub fn set_threshold(&mut self, threshold: f64) {
        let normalized = if threshold >= 0.0 { threshold } else { INF };
        if normalized != self.threshold {
            self.threshold = normalized;
            self.invalidate();
        }
    }

    /// Record an inserted edge (Case A: can only lower distances).
    pub fn notify_added(&mut self, from: usize, to: usize, weight: f64) {
        self.graph_version += 1;
        self.pending_relax.push(PendingRelax { from, to, weight });
    }

    /// Record a removed edge (Case B: distances below `to` may rise).
    pub fn notify_removed(&mut self, _from: usize, to: usize) {
        self.graph_version += 1;
        self.mark_dirty_subtree(to);
    }

    /// Record a weight change, classified as Case A (decrease) or Case B
    /// (increase). An unchanged weight is a no-op.
    pub fn notify_weight_changed(
        &mut self,
        from: usize,
        to: usize,
        old_weight: f64,
        new_weight: f64,
    ) {
        if new_weight == old_weight {
            return;
        }
        self.graph_version += 1;
        if new_weight < old_weight {
            self.pending_relax.push(PendingRelax {
                from,
                to,
                weight: new_weight,
            });
        } else {
            self.mark_dirty_subtree(to);
        }
    }

    /// Force the next query to recompute from scratch. The escape hatch for
    /// graph mutations the engine was not notified about; neither the
    /// pending list nor the dirty set can describe those.
    pub fn invalidate(&mut self) {
        self.graph_version += 1;
        self.committed = None;
        self.pending_relax.clear();
        self.dirty.clear();
    }

    /// Insert `from -> to` in the graph and notify the cache. Returns whether
    /// the edge was new.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f64) -> Result<bool, EngineError> {
        let added = self.graph.add_edge(from, to, weight)?;
        if added {
            self.notify_added(from, to, weight);
        }
        Ok(added)
    }

    /// Remove `from -> to` from the graph and notify the cache. Returns
    /// whether the edge existed.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> Result<bool, EngineError> {
        let removed = self.graph.remove_edge(from, to)?;
        if removed {
            self.notify_removed(from, to);
        }
        Ok(removed)
    }

    /// Set the weight of `from -> to`, inserting the edge if absent, and
    /// notify the cache with the matching classification.
    pub fn set_edge(&mut self, from: usize, to: usize, weight: f64) -> Result<(), EngineError> {
        match self.graph.set_weight(from, to, weight)? {
            None => self.notify_added(from, to, weight),
            Some(old) => self.notify_weight_changed(from, to, old, weight),
        }
        Ok(())
    }

    /// Distance from the pinned source to `target`, `f64::INFINITY` when
    /// unreachable. Brings the whole cache up to date first.
    pub fn distance(&mut self, target: usize) -> Result<f64, EngineError> {
        self.check_vertex(target)?;
        self.ensure_fresh(None)?;
        Ok(self.dist[target])
    }

    /// Shortest path from the pinned source to `target`. Uses target pruning:
    /// a recompute triggered by this query may stop once `target` settles.
    pub fn shortest_path(&mut self, target: usize) -> Result<PathResult, EngineError> {
        self.check_vertex(target)?;
        let source = self.ensure_fresh(Some(target))?;
        if self.dist[target] == INF {
            return Ok(PathResult::unreachable());
        }
        Ok(self.build_path(source, target))
    }

    /// One-off source-target query via bidirectional Dijkstra. Reads the
    /// graph only; the per-source cache is neither consulted nor touched.
    pub fn bidirectional(&self, source: usize, target: usize) -> Result<PathResult, EngineError> {
        Ok(bidirectional::shortest_path_bidirectional(
            &self.graph,
            source,
            target,
            self.threshold,
        )?)
    }

    /// Bring the cache up to date, entirely or (with `target`) at least up to
    /// the target's settled distance. Priority order: dirty recompute (with
    /// any queued relaxations applied on top), then pending relaxations
    /// alone, then full run. Returns the pinned source.
    fn ensure_fresh(&mut self, target: Option<usize>) -> Result<usize, EngineError> {
        let source = self.source.ok_or(EngineError::NoSource)?;
        if self.committed == Some(self.graph_version) {
            return Ok(source);
        }
        if !self.dirty.is_empty() {
            let truncated = if self.committed.is_some() {
                self.run_dirty_recompute(source);
                // Relaxations queued after the tightening mutation are not
                // covered by the dirty region; apply them on top before the
                // state can count as committed.
                if !self.pending_relax.is_empty() {
                    self.flush_pending_relaxations();
                    self.run_dijkstra_loop(None);
                }
                false
            } else {
                self.run_full_dijkstra(source, target)
            };
            self.dirty.clear();
            self.pending_relax.clear();
            self.committed = (!truncated).then_some(self.graph_version);
            return Ok(source);
        }
        if !self.pending_relax.is_empty() && self.committed.is_some() {
            self.flush_pending_relaxations();
            let truncated = self.run_dijkstra_loop(target);
            self.pending_relax.clear();
            if !truncated {
                self.committed = Some(self.graph_version);
            }
            return Ok(source);
        }
        let truncated = self.run_full_dijkstra(source, target);
        // The full run reflects the live graph; relaxations queued before a
        // first commit are subsumed by it and must not be replayed later.
        self.pending_relax.clear();
        if !truncated {
            self.committed = Some(self.graph_version);
        }
        Ok(source)
    }

    /// Seed the heap with every pending relaxation that improves its head,
    /// then let the caller run the main loop from that frontier. The heap may
    /// still hold entries from an earlier truncated pass; lazy deletion
    /// discards the stale ones.
    fn flush_pending_relaxations(&mut self) {
        debug!(
            pending = self.pending_relax.len(),
            version = self.graph_version,
            "flushing relaxations"
        );
        for &PendingRelax { from, to, weight } in &self.pending_relax {
            let from_dist = self.dist[from];
            if from_dist == INF {
                continue;
            }
            let candidate = from_dist + weight;
            if candidate >= self.dist[to] {
                continue;
            }
            self.dist[to] = candidate;
            self.parent[to] = Some(from);
            self.heap.push(HeapEntry {
                node: to,
                dist: candidate,
            });
        }
    }

    /// Mark `root` and its descendants in the cached tree as dirty. The
    /// descendant walk is only safe one mutation past a commit; on a staler
    /// tree only `root` is marked and the committed version is dropped so the
    /// next query runs from scratch, keeping the dirty-coverage invariant.
    fn mark_dirty_subtree(&mut self, root: usize) {
        self.dirty.insert(root);
        if self.committed != Some(self.graph_version - 1) {
            self.committed = None;
            return;
        }
        // children[u] = vertices whose cached path enters through u; the
        // parent[source] == source entry is a root sentinel, not a child edge.
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (v, p) in self.parent.iter().enumerate() {
            match *p {
                Some(p) if p != v => children.entry(p).or_default().push(v),
                _ => {}
            }
        }
        let mut queue = VecDeque::from([root]);
        while let Some(u) = queue.pop_front() {
            if let Some(kids) = children.get(&u) {
                for &c in kids {
                    if self.dirty.insert(c) {
                        queue.push_back(c);
                    }
                }
            }
        }
    }

    /// Recompute only the dirty region: reset it to infinity, re-seed the
    /// source, and push every settled vertex with an edge into the region so
    /// its cached distance can relax dirty neighbors.
    fn run_dirty_recompute(&mut self, source: usize) {
        for &d in &self.dirty {
            self.dist[d] = INF;
            self.parent[d] = None;
        }
        self.dist[source] = 0.0;
        self.parent[source] = Some(source);
        self.heap.clear();
        self.heap.push(HeapEntry {
            node: source,
            dist: 0.0,
        });
        let mut boundary = 0usize;
        for &d in &self.dirty {
            for (from, _) in self.graph.iter_in(d) {
                if self.dirty.contains(&from) || self.dist[from] == INF {
                    continue;
                }
                self.heap.push(HeapEntry {
                    node: from,
                    dist: self.dist[from],
                });
                boundary += 1;
            }
        }
        debug!(
            dirty = self.dirty.len(),
            boundary,
            version = self.graph_version,
            "dirty recompute"
        );
        self.run_dijkstra_loop(None);
    }

    fn run_full_dijkstra(&mut self, source: usize, target: Option<usize>) -> bool {
        debug!(source, ?target, version = self.graph_version, "full dijkstra");
        self.dist.fill(INF);
        self.parent.fill(None);
        self.dist[source] = 0.0;
        self.parent[source] = Some(source);
        self.heap.clear();
        self.heap.push(HeapEntry {
            node: source,
            dist: 0.0,
        });
        self.run_dijkstra_loop(target)
    }

    /// Dijkstra main loop from the current heap state, shared by full,
    /// incremental and dirty runs. Returns true when it stopped early by
    /// settling `target`; distances past the target are then not final.
    fn run_dijkstra_loop(&mut self, target: Option<usize>) -> bool {
        while let Some(HeapEntry { node: u, dist: d }) = self.heap.pop() {
            if d > self.dist[u] {
                continue; // stale entry, lazy deletion
            }
            if d > self.threshold {
                continue;
            }
            if target == Some(u) {
                // The target settles but its out-edges stay unrelaxed; keep
                // it queued so a later incremental pass resumes from here.
                self.heap.push(HeapEntry { node: u, dist: d });
                return true;
            }
            for (v, w) in self.graph.iter_out(u) {
                let next = d + w;
                if next > self.threshold || next >= self.dist[v] {
                    continue;
                }
                self.dist[v] = next;
                self.parent[v] = Some(u);
                self.heap.push(HeapEntry { node: v, dist: next });
            }
        }
        false
    }

    fn build_path(&self, source: usize, target: usize) -> PathResult {
        let mut path = Vec::new();
        let mut v = target;
        loop {
            path.push(v);
            if v == source {
                break;
            }
            match self.parent[v] {
                Some(p) => v = p,
                // A finite dist[target] implies a complete chain to source.
                None => return PathResult::unreachable(),
            }
        }
        path.reverse();
        PathResult::of(self.dist[target], path)
    }

    #[inline]
    fn check_vertex(&self, v: usize) -> Result<(), EngineError> {
        if v >= self.graph.capacity() {
            return Err(GraphError::OutOfRange {
                vertex: v,
                capacity: self.graph.capacity(),
            }
            .into());
        }
        Ok(())
    }
}
