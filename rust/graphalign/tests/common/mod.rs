#![allow(dead_code)]

pub mod mixture;

use graphalign::AlignConfig;
use graphalign::config::PairSearch;
use graphalign::consistent_pairs::ConsistentPairIndex;
use graphalign::tolerance_window::ToleranceWindows;
use massgraph::{
    MassScale,
    ProteinGraph,
    ProteinGraphBuilder,
    SpectrumGraph,
    SpectrumPeak,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_test_writer()
        .try_init();
}

/// One scaled unit per dalton, so fixtures can be written in plain integers.
pub fn unit_scale() -> MassScale {
    MassScale::try_new(1.0).unwrap()
}

pub fn unit_config() -> AlignConfig {
    AlignConfig {
        convert_ratio: 1.0,
        min_consistent_dist: 1.0,
        ..Default::default()
    }
}

pub fn protein(residues: &[i32]) -> ProteinGraph {
    ProteinGraph::from_scaled_residues(residues).unwrap()
}

/// Protein with variable modifications given as `(position, ptm, shift)`.
pub fn modified_protein(residues: &[f64], mods: &[(usize, u16, f64)]) -> ProteinGraph {
    let mut builder = ProteinGraphBuilder::new(unit_scale()).residues(residues);
    for &(position, ptm, shift) in mods {
        builder = builder.variable_mod(position, ptm, shift);
    }
    builder.build().unwrap()
}

/// Spectrum from scaled masses; the root peak always gets delta 0.
pub fn spectrum(masses: &[i32], intensities: &[f64], delta: i32) -> SpectrumGraph {
    assert_eq!(masses.len(), intensities.len());
    let peaks = masses
        .iter()
        .zip(intensities)
        .enumerate()
        .map(|(j, (&mass, &intensity))| SpectrumPeak {
            mass,
            intensity,
            delta: if j == 0 { 0 } else { delta },
        })
        .collect();
    SpectrumGraph::new(peaks).unwrap()
}

pub fn flat_spectrum(masses: &[i32], delta: i32) -> SpectrumGraph {
    spectrum(masses, &vec![1.0; masses.len()], delta)
}

pub fn windows_for(spectrum: &SpectrumGraph) -> ToleranceWindows {
    ToleranceWindows::resolve(&spectrum.masses(), &spectrum.deltas()).unwrap()
}

/// Consistent pair index with no distance pruning.
pub fn pair_index(
    protein: &ProteinGraph,
    spectrum: &SpectrumGraph,
    windows: &ToleranceWindows,
    max_mods: usize,
    search: PairSearch,
) -> ConsistentPairIndex {
    ConsistentPairIndex::build(
        &protein.distance_buckets(max_mods, None),
        &spectrum.distance_buckets(1, i32::MAX),
        windows,
        protein.num_vertices(),
        1,
        search,
    )
}
