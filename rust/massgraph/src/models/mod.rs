pub mod distance;
pub mod mass;
pub mod protein;
pub mod spectrum;
pub mod tolerance;

pub use distance::{
    DistanceBucket,
    ProteinDistanceBuckets,
    ProteinPair,
    SpectrumPair,
};
pub use mass::MassScale;
pub use protein::{
    ModSite,
    ProteinGraph,
    ProteinGraphBuilder,
    ResidueEdge,
};
pub use spectrum::{
    PrmPeak,
    SpectrumGraph,
    SpectrumPeak,
};
pub use tolerance::{
    PeakKind,
    PeakTolerance,
};
