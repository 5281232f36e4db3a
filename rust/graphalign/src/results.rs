//! Result records handed to the caller.
//!
//! Writing them anywhere is the caller's job; every record is `Serialize`.

use crate::errors::DataProcessingError;
use massgraph::ModSite;
use serde::Serialize;

/// How a matched node was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    /// First node of the alignment.
    Start,
    /// Consistent pair, possibly carrying known modifications.
    Variable,
    /// Unknown mass shift.
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedNode {
    pub protein_vertex: u32,
    pub spectrum_vertex: u32,
    /// Unknown shifts used up to and including this node.
    pub shift_count: usize,
    /// Known modifications used up to and including this node.
    pub mod_count: usize,
    pub kind: EdgeKind,
    /// Modifications on the edge entering this node.
    pub mods: Vec<ModSite>,
}

/// Terminal flags and mass shift of one diagonal, in daltons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagonalHeader {
    /// Spectrum mass minus protein prefix mass along the diagonal.
    pub shift: f64,
    pub n_strict: bool,
    pub c_strict: bool,
    pub prot_n_term: bool,
    pub prot_c_term: bool,
    pub pep_n_term: bool,
    pub pep_c_term: bool,
    /// Set when the precursor mass is known:
    /// `precursor - protein mass - shift`.
    pub c_term_shift: Option<f64>,
    pub match_first_pos: u32,
    pub match_last_pos: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagonal {
    /// Index of the first node of the segment.
    pub first_node: usize,
    /// Index of the last node of the segment (inclusive).
    pub last_node: usize,
    pub header: DiagonalHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinglePathReport {
    pub score: i32,
    pub shift_count: usize,
    pub mod_count: usize,
    pub nodes: Vec<MatchedNode>,
    pub diagonals: Vec<Diagonal>,
    /// Diagonal indices grouped by unknown shift: a new group starts at
    /// every diagonal entered through an unexpected edge.
    pub header_groups: Vec<Vec<usize>>,
    /// False when an unexpected shift exceeds the configured maximum.
    pub valid: bool,
    /// Precursor mass after refinement, when the spectrum carries one.
    pub refined_precursor_mass: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub protein_vertex: u32,
    pub spectrum_vertex: u32,
    /// Offset of the matched mass from the peak, in scaled units.
    pub shift: i32,
    /// Modifications on the edge entering this step.
    pub mods: Vec<ModSite>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantifiedPath {
    pub steps: Vec<PathStep>,
    pub abundance: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualPathReport {
    pub min_error: f64,
    pub first: QuantifiedPath,
    pub second: QuantifiedPath,
}

#[derive(Debug, Clone, Default)]
pub enum SetField<T> {
    Some(T),
    #[default]
    None,
}

impl<T> SetField<T> {
    pub fn is_some(&self) -> bool {
        matches!(self, Self::Some(_))
    }

    pub fn expect_some(self, field_name: &'static str) -> Result<T, DataProcessingError> {
        match self {
            Self::Some(v) => Ok(v),
            Self::None => Err(DataProcessingError::ExpectedSetField {
                field: field_name,
                context: "dual path report",
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct DualPathReportBuilder {
    min_error: SetField<f64>,
    first_steps: SetField<Vec<PathStep>>,
    second_steps: SetField<Vec<PathStep>>,
    percents: SetField<(u32, u32)>,
    max_intensity: SetField<f64>,
}

impl DualPathReportBuilder {
    pub fn with_min_error(mut self, min_error: f64) -> Self {
        self.min_error = SetField::Some(min_error);
        self
    }

    pub fn with_paths(mut self, first: Vec<PathStep>, second: Vec<PathStep>) -> Self {
        self.first_steps = SetField::Some(first);
        self.second_steps = SetField::Some(second);
        self
    }

    pub fn with_grid_point(mut self, first_percent: u32, second_percent: u32) -> Self {
        self.percents = SetField::Some((first_percent, second_percent));
        self
    }

    pub fn with_max_intensity(mut self, max_intensity: f64) -> Self {
        self.max_intensity = SetField::Some(max_intensity);
        self
    }

    pub fn finalize(self) -> Result<DualPathReport, DataProcessingError> {
        let (a, b) = self.percents.expect_some("grid_point")?;
        let max_intensity = self.max_intensity.expect_some("max_intensity")?;
        let total = (a + b) as f64;
        let path = |steps, percent: u32| QuantifiedPath {
            steps,
            abundance: percent as f64 / total,
            intensity: percent as f64 / 100.0 * max_intensity,
        };
        Ok(DualPathReport {
            min_error: self.min_error.expect_some("min_error")?,
            first: path(self.first_steps.expect_some("first_steps")?, a),
            second: path(self.second_steps.expect_some("second_steps")?, b),
        })
    }
}
