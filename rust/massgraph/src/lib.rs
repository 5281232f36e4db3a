//! Mass graphs consumed by the alignment engine.
//!
//! Protein and spectrum graphs are stored on a common scaled integer mass
//! axis ([`MassScale`]), together with the distance buckets used to find
//! consistent pairs.

pub mod errors;
pub mod models;
pub mod utils;

pub use crate::errors::GraphInputError;
pub use crate::models::{
    DistanceBucket,
    MassScale,
    ModSite,
    PeakKind,
    PeakTolerance,
    PrmPeak,
    ProteinDistanceBuckets,
    ProteinGraph,
    ProteinGraphBuilder,
    ProteinPair,
    ResidueEdge,
    SpectrumGraph,
    SpectrumPair,
    SpectrumPeak,
};
pub use crate::utils::MassWindow;
