//! Minimum intensity error over the pair graph for fixed abundances.
//!
//! Path intensities `q1` and `q2` are charged when a path enters a peak:
//!
//! * both paths enter the same peak together: `|I - q1 - q2|`;
//! * paths enter different peaks: `|I1 - q1| + |I2 - q2|`;
//! * a path enters the peak the other one already sits on: the single
//!   residual charged earlier, `|I - q_other|`, is swapped for
//!   `|I - q1 - q2|`.
//!
//! Every protein vertex a path jumps over is a predicted peak with no
//! match and costs that path's intensity. The root is never charged.

use super::pair_graph::{
    PairGraph,
    PathPair,
};
use crate::backtrack::{
    BacktrackGraph,
    VertexId,
};

pub(crate) const NO_NEXT: u32 = u32::MAX;

/// Reusable buffers for the pair DP.
#[derive(Debug, Default, Clone)]
pub struct PairErrors {
    pub(crate) errors: Vec<f64>,
    pub(crate) next: Vec<u32>,
}

impl PairErrors {
    pub fn root_error(&self, graph: &PairGraph) -> f64 {
        self.errors[graph.root() as usize]
    }

    /// Pair ids from the root pair to its final pair along the best moves.
    pub fn best_walk(&self, graph: &PairGraph) -> Vec<u32> {
        let mut walk = vec![graph.root()];
        let mut current = graph.root();
        while self.next[current as usize] != NO_NEXT {
            current = self.next[current as usize];
            walk.push(current);
        }
        walk
    }
}

fn gap(dag: &BacktrackGraph, from: VertexId, to: VertexId) -> f64 {
    let skipped = dag.vertex(to).state.i - dag.vertex(from).state.i - 1;
    skipped as f64
}

/// Local cost of moving from pair `from` to pair `to`.
pub fn transition_cost(
    dag: &BacktrackGraph,
    from: PathPair,
    to: PathPair,
    q1: f64,
    q2: f64,
) -> f64 {
    let moved_first = from.first != to.first;
    let moved_second = from.second != to.second;
    let peak = |v: VertexId| {
        let vertex = dag.vertex(v);
        (vertex.state.j, vertex.intensity)
    };
    let (j1, i1) = peak(to.first);
    let (j2, i2) = peak(to.second);

    let mut cost = 0.0;
    if moved_first {
        cost += q1 * gap(dag, from.first, to.first);
    }
    if moved_second {
        cost += q2 * gap(dag, from.second, to.second);
    }
    cost += match (moved_first, moved_second) {
        (true, true) if j1 == j2 => (i1 - q1 - q2).abs(),
        (true, true) => (i1 - q1).abs() + (i2 - q2).abs(),
        (true, false) if j1 == j2 => (i1 - q1 - q2).abs() - (i1 - q2).abs(),
        (true, false) => (i1 - q1).abs(),
        (false, true) if j1 == j2 => (i2 - q1 - q2).abs() - (i2 - q1).abs(),
        (false, true) => (i2 - q2).abs(),
        (false, false) => 0.0,
    };
    cost
}

/// Fills `buffers` with the minimum remaining error of every pair and
/// returns the error of the root pair.
///
/// Pairs that cannot reach a final pair keep an infinite error. Among
/// equal moves the first successor wins.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn solve(
    dag: &BacktrackGraph,
    graph: &PairGraph,
    q1: f64,
    q2: f64,
    buffers: &mut PairErrors,
) -> f64 {
    buffers.errors.clear();
    buffers.errors.resize(graph.len(), f64::INFINITY);
    buffers.next.clear();
    buffers.next.resize(graph.len(), NO_NEXT);

    for &id in graph.reverse_topological() {
        if graph.is_final(dag, id) {
            buffers.errors[id as usize] = 0.0;
            continue;
        }
        let pair = graph.pair(id);
        let mut best = f64::INFINITY;
        let mut best_next = NO_NEXT;
        for &next in graph.successors(id) {
            let rest = buffers.errors[next as usize];
            if !rest.is_finite() {
                continue;
            }
            let total = rest + transition_cost(dag, pair, graph.pair(next), q1, q2);
            if total < best {
                best = total;
                best_next = next;
            }
        }
        buffers.errors[id as usize] = best;
        buffers.next[id as usize] = best_next;
    }
    buffers.root_error(graph)
}
