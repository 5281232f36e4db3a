//! Alignment of spectrum graphs against protein (proteoform) graphs.
//!
//! The dual-path mode resolves per-peak tolerance windows, indexes
//! consistent pairs, runs a tie-preserving DP, keeps every best chain in a
//! backtracking DAG and splits it into two abundance-weighted paths. The
//! single-path mode is the simpler global-tolerance alignment.
//!
//! ```
//! use graphalign::{AlignConfig, AlignmentCase, AlignmentOutcome, AlignmentPipeline};
//! use massgraph::{ProteinGraph, SpectrumGraph, SpectrumPeak};
//!
//! let protein = ProteinGraph::from_scaled_residues(&[100, 100, 100]).unwrap();
//! let peaks = [0, 100, 200, 300]
//!     .iter()
//!     .map(|&mass| SpectrumPeak { mass, intensity: 10.0, delta: 0 })
//!     .collect();
//! let spectrum = SpectrumGraph::new(peaks).unwrap();
//!
//! let config = AlignConfig {
//!     convert_ratio: 1.0,
//!     min_consistent_dist: 1.0,
//!     ..Default::default()
//! };
//! let pipeline = AlignmentPipeline::new(config).unwrap();
//! let outcome = pipeline.align(&AlignmentCase { protein, spectrum }).unwrap();
//! assert!(matches!(outcome, AlignmentOutcome::SinglePath(_)));
//! ```

pub(crate) mod accumulator;
pub mod alignment;
pub mod backtrack;
pub mod config;
pub mod consistent_pairs;
pub mod errors;
pub mod legacy;
pub mod pipeline;
pub mod quant;
pub mod results;
pub mod timings;
pub mod tolerance_window;

pub use alignment::{
    AlignmentTable,
    StateKey,
};
pub use backtrack::BacktrackGraph;
pub use config::{
    AlignConfig,
    AlignMode,
    PairSearch,
};
pub use errors::AlignError;
pub use pipeline::{
    AlignmentCase,
    AlignmentOutcome,
    AlignmentPipeline,
    CaseResult,
};
pub use results::{
    DualPathReport,
    SinglePathReport,
};
pub use timings::AlignTimings;
pub use tolerance_window::ToleranceWindows;
