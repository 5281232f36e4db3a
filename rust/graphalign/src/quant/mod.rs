//! Dual-path abundance quantification.
//!
//! Two paths through the backtracking DAG are searched jointly
//! ([`pair_graph`]). For each point of a percent grid both path intensities
//! are fixed relative to the DAG's maximum intensity and the minimum
//! residual is computed over the pair graph ([`grid`]). The grid point with
//! the lowest residual at the root pair wins; ties keep the first point.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod grid;
pub mod pair_graph;

use crate::backtrack::{
    BacktrackGraph,
    VertexId,
};
use crate::config::AbundanceGrid;
use crate::errors::DataProcessingError;
use crate::results::{
    DualPathReport,
    DualPathReportBuilder,
    PathStep,
};
use grid::PairErrors;
use pair_graph::PairGraph;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Quantification {
    Dual(DualPathReport),
    /// Every reachable pair has identical vertices; the two paths cannot
    /// diverge.
    Identical,
}

/// Scratch space reused across spectra by one worker.
#[derive(Debug, Default, Clone)]
pub struct QuantBuffers {
    current: PairErrors,
    best: PairErrors,
}

#[derive(Debug, Clone, Copy)]
pub struct DualPathQuantifier {
    pub max_head_diff: usize,
    pub grid: AbundanceGrid,
}

impl DualPathQuantifier {
    pub fn quantify(&self, dag: &BacktrackGraph) -> Result<Quantification, DataProcessingError> {
        self.quantify_with(dag, &mut QuantBuffers::default())
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn quantify_with(
        &self,
        dag: &BacktrackGraph,
        buffers: &mut QuantBuffers,
    ) -> Result<Quantification, DataProcessingError> {
        let pairs = PairGraph::build(dag, self.max_head_diff);
        if pairs.is_diagonal_only() {
            debug!("Pair graph has no divergent pair");
            return Ok(Quantification::Identical);
        }

        let max_intensity = dag.max_intensity();
        let QuantBuffers { current, best } = buffers;
        let mut best_point: Option<(u32, u32)> = None;
        let mut best_error = f64::INFINITY;

        for a in self.grid.percents() {
            let q1 = a as f64 / 100.0 * max_intensity;
            for b in self.grid.percents() {
                let q2 = b as f64 / 100.0 * max_intensity;
                let error = grid::solve(dag, &pairs, q1, q2, current);
                if error < best_error {
                    best_error = error;
                    best_point = Some((a, b));
                    std::mem::swap(current, best);
                }
            }
        }

        let Some((a, b)) = best_point else {
            return Ok(Quantification::Identical);
        };
        let walk = best.best_walk(&pairs);
        let first: Vec<VertexId> = walk.iter().map(|&id| pairs.pair(id).first).collect();
        let second: Vec<VertexId> = walk.iter().map(|&id| pairs.pair(id).second).collect();
        if dedup_consecutive(first.clone()) == dedup_consecutive(second.clone()) {
            return Ok(Quantification::Identical);
        }

        debug!(
            "Best grid point {}% / {}% with error {:.3}",
            a, b, best_error
        );
        let report = DualPathReportBuilder::default()
            .with_min_error(best_error)
            .with_paths(path_steps(dag, &first), path_steps(dag, &second))
            .with_grid_point(a, b)
            .with_max_intensity(max_intensity)
            .finalize()?;
        Ok(Quantification::Dual(report))
    }
}

fn dedup_consecutive(mut vertices: Vec<VertexId>) -> Vec<VertexId> {
    vertices.dedup();
    vertices
}

/// Steps of one path, annotated with the modifications of each entering edge.
pub fn path_steps(dag: &BacktrackGraph, vertices: &[VertexId]) -> Vec<PathStep> {
    let vertices = dedup_consecutive(vertices.to_vec());
    let mut steps = Vec::with_capacity(vertices.len());
    let mut previous: Option<VertexId> = None;
    for &v in vertices.iter() {
        let vertex = dag.vertex(v);
        let mods = previous
            .and_then(|p| dag.edge_between(p, v))
            .map(|e| e.mods.clone())
            .unwrap_or_default();
        steps.push(PathStep {
            protein_vertex: vertex.state.i,
            spectrum_vertex: vertex.state.j,
            shift: vertex.shift,
            mods,
        });
        previous = Some(v);
    }
    steps
}
