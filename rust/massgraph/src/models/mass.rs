use crate::errors::{
    GraphInputError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Default number of scaled integer units per dalton.
pub const DEFAULT_CONVERT_RATIO: f64 = 274.335215;

/// Conversion between dalton masses and the scaled integers every
/// alignment stage works with.
///
/// Tolerance comparisons happen on integers only, so there is no
/// floating point drift between stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassScale {
    convert_ratio: f64,
}

impl Default for MassScale {
    fn default() -> Self {
        Self {
            convert_ratio: DEFAULT_CONVERT_RATIO,
        }
    }
}

impl MassScale {
    pub fn try_new(convert_ratio: f64) -> Result<Self> {
        if !convert_ratio.is_finite() || convert_ratio <= 0.0 {
            return Err(GraphInputError::InvalidScale(convert_ratio));
        }
        Ok(Self { convert_ratio })
    }

    pub fn convert_ratio(&self) -> f64 {
        self.convert_ratio
    }

    pub fn to_scaled(&self, mass: f64) -> i32 {
        (mass * self.convert_ratio).round() as i32
    }

    pub fn try_to_scaled(&self, mass: f64, context: &'static str) -> Result<i32> {
        if !mass.is_finite() {
            return Err(GraphInputError::NonFiniteValue {
                context,
                value: mass,
            });
        }
        Ok(self.to_scaled(mass))
    }

    pub fn to_mass(&self, scaled: i32) -> f64 {
        scaled as f64 / self.convert_ratio
    }
}
