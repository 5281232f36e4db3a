//! Backtracking DAG.
//!
//! Only states reachable backwards from a qualifying end state are kept.
//! Vertex 0 is always the root `(0, 0, 0)`; end vertices follow it. Edges
//! point forward in mass, from the predecessor state to the state it
//! extends, and carry the exact and unmodified protein masses of the
//! transition along with its modifications.

use crate::alignment::{
    AlignmentTable,
    StateKey,
};
use crate::tolerance_window::ToleranceWindows;
use massgraph::{
    ModSite,
    ProteinGraph,
    SpectrumGraph,
};
use serde::Serialize;
use std::collections::{
    HashMap,
    VecDeque,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VertexId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagVertex {
    pub state: StateKey,
    /// `T` of the state.
    pub layer: i32,
    /// Offset of the matched mass from the peak (`k - delta_l[j]`).
    pub shift: i32,
    pub intensity: f64,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagEdge {
    pub source: VertexId,
    pub target: VertexId,
    /// Unmodified protein mass between the two protein vertices.
    pub black_mass: i32,
    /// Protein mass of the consistent pair, modifications included.
    pub exact_mass: i32,
    /// Shift of the source state relative to its peak.
    pub shift: i32,
    pub mods: Vec<ModSite>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktrackGraph {
    vertices: Vec<DagVertex>,
    edges: Vec<DagEdge>,
    #[serde(skip)]
    index: HashMap<StateKey, VertexId>,
    ends: Vec<VertexId>,
    max_intensity: f64,
}

/// Which states may end an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndCriteria {
    /// Minimum `T` of an end state.
    pub threshold: i32,
    /// Spectrum vertices below the last one that may also end it.
    pub terminal_span: usize,
}

impl BacktrackGraph {
    /// Materializes the DAG, or `None` when no end state reaches the threshold.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn build(
        table: &AlignmentTable,
        windows: &ToleranceWindows,
        protein: &ProteinGraph,
        spectrum: &SpectrumGraph,
        criteria: EndCriteria,
    ) -> Option<Self> {
        let last_i = table.num_protein_vertices().checked_sub(1)?;
        let last_j = table.num_spectrum_vertices().checked_sub(1)?;
        let first_j = last_j.saturating_sub(criteria.terminal_span);
        let end_states: Vec<StateKey> = (first_j..=last_j)
            .flat_map(|j| table.states_at(last_i, j, criteria.threshold))
            .filter(|s| *s != StateKey::ROOT)
            .collect();
        if end_states.is_empty() {
            debug!(
                "No end state reaches {}, best chain is {}",
                criteria.threshold,
                table.best_score()
            );
            return None;
        }

        let mut graph = Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
            ends: Vec::with_capacity(end_states.len()),
            max_intensity: 0.0,
        };
        graph.insert_vertex(StateKey::ROOT, table, windows, spectrum);

        let mut queue = VecDeque::with_capacity(end_states.len());
        for state in end_states {
            let id = graph.insert_vertex(state, table, windows, spectrum);
            graph.ends.push(id);
            queue.push_back((state, id));
        }

        while let Some((state, target)) = queue.pop_front() {
            for pred in table.predecessors(state) {
                let source = match graph.index.get(&pred.state) {
                    Some(&id) => id,
                    None => {
                        let id = graph.insert_vertex(pred.state, table, windows, spectrum);
                        queue.push_back((pred.state, id));
                        id
                    }
                };
                graph.insert_edge(DagEdge {
                    source,
                    target,
                    black_mass: protein.black_mass(pred.state.i as usize, state.i as usize),
                    exact_mass: pred.mass,
                    shift: pred.shift,
                    mods: pred.mods.clone(),
                });
            }
        }

        graph.max_intensity = graph
            .vertices
            .iter()
            .skip(1)
            .map(|v| v.intensity)
            .fold(0.0, f64::max);
        debug!(
            "Backtracking graph: {} vertices, {} edges, {} ends, max intensity {:.2}",
            graph.vertices.len(),
            graph.edges.len(),
            graph.ends.len(),
            graph.max_intensity
        );
        Some(graph)
    }

    fn insert_vertex(
        &mut self,
        state: StateKey,
        table: &AlignmentTable,
        windows: &ToleranceWindows,
        spectrum: &SpectrumGraph,
    ) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(DagVertex {
            state,
            layer: table.score(state),
            shift: windows.shift(state.j as usize, state.k as usize),
            intensity: spectrum.intensity(state.j as usize),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        self.index.insert(state, id);
        id
    }

    fn insert_edge(&mut self, edge: DagEdge) {
        let id = EdgeId(self.edges.len() as u32);
        self.vertices[edge.source.0 as usize].outgoing.push(id);
        self.vertices[edge.target.0 as usize].incoming.push(id);
        self.edges.push(edge);
    }

    pub fn root(&self) -> VertexId {
        VertexId(0)
    }

    pub fn ends(&self) -> &[VertexId] {
        &self.ends
    }

    pub fn vertex(&self, id: VertexId) -> &DagVertex {
        &self.vertices[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &DagEdge {
        &self.edges[id.0 as usize]
    }

    pub fn vertices(&self) -> &[DagVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[DagEdge] {
        &self.edges
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_of(&self, state: &StateKey) -> Option<VertexId> {
        self.index.get(state).copied()
    }

    /// Largest peak intensity over every vertex but the root.
    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    /// Forward neighbours, in edge insertion order.
    pub fn successors(&self, id: VertexId) -> impl Iterator<Item = (EdgeId, VertexId)> + '_ {
        self.vertex(id)
            .outgoing
            .iter()
            .map(move |&e| (e, self.edge(e).target))
    }

    pub fn predecessors(&self, id: VertexId) -> impl Iterator<Item = (EdgeId, VertexId)> + '_ {
        self.vertex(id)
            .incoming
            .iter()
            .map(move |&e| (e, self.edge(e).source))
    }

    pub fn is_end(&self, id: VertexId) -> bool {
        self.vertex(id).outgoing.is_empty()
    }

    pub fn edge_between(&self, source: VertexId, target: VertexId) -> Option<&DagEdge> {
        self.successors(source)
            .find(|(_, t)| *t == target)
            .map(|(e, _)| self.edge(e))
    }

    /// A longest root-to-end path: ends at the highest layer end vertex and
    /// follows the first stored predecessor back to the root.
    pub fn best_path(&self) -> Vec<VertexId> {
        let Some(&end) = self
            .ends
            .iter()
            .max_by_key(|&&e| (self.vertex(e).layer, std::cmp::Reverse(e)))
        else {
            return vec![self.root()];
        };
        let mut path = vec![end];
        let mut current = end;
        while let Some((_, prev)) = self.predecessors(current).next() {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}
