use std::fmt::Display;

/// Input invariant violations found while building or checking the
/// protein and spectrum graphs.
///
/// These are data errors from upstream producers. Every downstream index
/// assumes sorted, non-empty and consistent inputs, so construction fails
/// instead of silently repairing the data.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphInputError {
    EmptySpectrum,
    MissingRootPeak {
        first_mass: i32,
    },
    UnsortedPeaks {
        index: usize,
        previous: i32,
        current: i32,
    },
    NegativeTolerance {
        index: usize,
        delta: i32,
    },
    InvalidTolerance(f64),
    NonFiniteValue {
        context: &'static str,
        value: f64,
    },
    NonPositiveResidueMass {
        position: usize,
        mass: i32,
    },
    EmptyProtein,
    /// The first edge of a residue must be its unmodified mass.
    MissingUnmodifiedEdge {
        position: usize,
    },
    ModificationOutOfBounds {
        position: usize,
        num_positions: usize,
    },
    InvalidScale(f64),
}

impl Display for GraphInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for GraphInputError {}

pub type Result<T> = std::result::Result<T, GraphInputError>;
