//! Joint state space of two paths through the backtracking DAG.
//!
//! A pair `(a, b)` holds the current vertex of each path. Starting from
//! `(root, root)` pairs advance towards the end vertices:
//!
//! * both on the same spectrum vertex: both advance, keeping protein
//!   positions within `max_head_diff` of each other;
//! * on different spectrum vertices: only the path behind advances;
//! * one path finished: the other advances freely.
//!
//! Every advance moves one path one DAG edge forward, so the sum of the two
//! vertex layers strictly grows along pair edges.

use crate::backtrack::{
    BacktrackGraph,
    VertexId,
};
use serde::Serialize;
use std::collections::{
    HashMap,
    VecDeque,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathPair {
    pub first: VertexId,
    pub second: VertexId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairGraph {
    pairs: Vec<PathPair>,
    successors: Vec<Vec<u32>>,
    /// Pair ids sorted so that successors always come first.
    order: Vec<u32>,
}

impl PairGraph {
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn build(dag: &BacktrackGraph, max_head_diff: usize) -> Self {
        let root = PathPair {
            first: dag.root(),
            second: dag.root(),
        };
        let mut graph = Self {
            pairs: vec![root],
            successors: vec![Vec::new()],
            order: Vec::new(),
        };
        let mut ids: HashMap<PathPair, u32> = HashMap::from([(root, 0)]);
        let mut queue = VecDeque::from([0u32]);

        while let Some(id) = queue.pop_front() {
            let pair = graph.pairs[id as usize];
            let mut next_ids = Vec::new();
            for next in advance(dag, pair, max_head_diff) {
                let next_id = *ids.entry(next).or_insert_with(|| {
                    let new_id = graph.pairs.len() as u32;
                    graph.pairs.push(next);
                    graph.successors.push(Vec::new());
                    queue.push_back(new_id);
                    new_id
                });
                next_ids.push(next_id);
            }
            graph.successors[id as usize] = next_ids;
        }

        let layer_sum = |p: &PathPair| dag.vertex(p.first).layer + dag.vertex(p.second).layer;
        let mut order: Vec<u32> = (0..graph.pairs.len() as u32).collect();
        order.sort_by_key(|&id| std::cmp::Reverse(layer_sum(&graph.pairs[id as usize])));
        graph.order = order;

        debug!(
            "Pair graph: {} pairs, {} pair edges",
            graph.pairs.len(),
            graph.successors.iter().map(|s| s.len()).sum::<usize>()
        );
        graph
    }

    pub fn root(&self) -> u32 {
        0
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pair(&self, id: u32) -> PathPair {
        self.pairs[id as usize]
    }

    pub fn successors(&self, id: u32) -> &[u32] {
        &self.successors[id as usize]
    }

    /// Pair ids in reverse topological order.
    pub fn reverse_topological(&self) -> &[u32] {
        &self.order
    }

    pub fn is_final(&self, dag: &BacktrackGraph, id: u32) -> bool {
        let pair = self.pair(id);
        dag.is_end(pair.first) && dag.is_end(pair.second)
    }

    /// True when no reachable pair has two distinct vertices, i.e. the two
    /// paths are forced to coincide.
    pub fn is_diagonal_only(&self) -> bool {
        self.pairs.iter().all(|p| p.first == p.second)
    }
}

fn advance(dag: &BacktrackGraph, pair: PathPair, max_head_diff: usize) -> Vec<PathPair> {
    let (a, b) = (pair.first, pair.second);
    let within = |x: VertexId, y: VertexId| {
        let (ix, iy) = (dag.vertex(x).state.i, dag.vertex(y).state.i);
        ix.abs_diff(iy) as usize <= max_head_diff
    };
    match (dag.is_end(a), dag.is_end(b)) {
        (true, true) => Vec::new(),
        (true, false) => dag
            .successors(b)
            .map(|(_, d)| PathPair { first: a, second: d })
            .collect(),
        (false, true) => dag
            .successors(a)
            .map(|(_, c)| PathPair { first: c, second: b })
            .collect(),
        (false, false) => {
            let (ja, jb) = (dag.vertex(a).state.j, dag.vertex(b).state.j);
            if ja == jb {
                let mut out = Vec::new();
                for (_, c) in dag.successors(a) {
                    for (_, d) in dag.successors(b) {
                        if within(c, d) {
                            out.push(PathPair { first: c, second: d });
                        }
                    }
                }
                out
            } else if ja < jb {
                dag.successors(a)
                    .filter(|(_, c)| within(*c, b))
                    .map(|(_, c)| PathPair { first: c, second: b })
                    .collect()
            } else {
                dag.successors(b)
                    .filter(|(_, d)| within(a, *d))
                    .map(|(_, d)| PathPair { first: a, second: d })
                    .collect()
            }
        }
    }
}
