//! Small backtracking DAGs shared by the quantifier tests.

use crate::alignment::{
    AlignmentTable,
    StateKey,
};
use crate::backtrack::{
    BacktrackGraph,
    EndCriteria,
    VertexId,
};
use crate::config::PairSearch;
use crate::consistent_pairs::ConsistentPairIndex;
use crate::tolerance_window::ToleranceWindows;
use massgraph::{
    MassScale,
    ProteinGraphBuilder,
    SpectrumGraph,
    SpectrumPeak,
};

/// Two tied branches that sit on different protein positions.
///
/// Residues `[100, 100, 100]` with `+50` allowed on residues 0 and 2, and
/// peaks `[0, 100, 250, 350]` with intensities `[0, 6, 4, 10]`:
///
/// * `root -> (1, 1) -> (3, 3)` skips protein vertex 2;
/// * `root -> (2, 2) -> (3, 3)` skips protein vertex 1.
pub(crate) fn staggered_dag() -> BacktrackGraph {
    let protein = ProteinGraphBuilder::new(MassScale::try_new(1.0).unwrap())
        .residues(&[100.0, 100.0, 100.0])
        .variable_mod(0, 1, 50.0)
        .variable_mod(2, 1, 50.0)
        .build()
        .unwrap();
    let peaks = [(0, 0.0), (100, 6.0), (250, 4.0), (350, 10.0)]
        .into_iter()
        .map(|(mass, intensity)| SpectrumPeak {
            mass,
            intensity,
            delta: 0,
        })
        .collect();
    let spectrum = SpectrumGraph::new(peaks).unwrap();
    let windows = ToleranceWindows::resolve(&spectrum.masses(), &spectrum.deltas()).unwrap();
    let index = ConsistentPairIndex::build(
        &protein.distance_buckets(1, None),
        &spectrum.distance_buckets(1, i32::MAX),
        &windows,
        protein.num_vertices(),
        1,
        PairSearch::Exact,
    );
    let table = AlignmentTable::compute(&index, &windows);
    BacktrackGraph::build(
        &table,
        &windows,
        &protein,
        &spectrum,
        EndCriteria {
            threshold: 3,
            terminal_span: 0,
        },
    )
    .unwrap()
}

pub(crate) fn vertex(dag: &BacktrackGraph, i: usize, j: usize) -> VertexId {
    dag.vertex_of(&StateKey::new(i, j, 0)).unwrap()
}
