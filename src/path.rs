/// Outcome of a shortest-path query: total distance, the vertex sequence from
/// source to target, and a reachability flag.
///
/// Unreachable targets carry `f64::INFINITY` and an empty path; a
/// source-to-source query yields distance zero and the single-vertex path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub distance: f64,
    pub path: Vec<usize>,
    pub reachable: bool,
}

impl PathResult {
    pub fn unreachable() -> Self {
        Self {
            distance: f64::INFINITY,
            path: Vec::new(),
            reachable: false,
        }
    }

    pub fn of(distance: f64, path: Vec<usize>) -> Self {
        Self {
            distance,
            path,
            reachable: true,
        }
    }
}
