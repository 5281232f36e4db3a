use super::mass::MassScale;
use serde::{
    Deserialize,
    Serialize,
};

/// Nominal symmetric mass tolerance for fragment (PRM) peaks.
///
/// Convention: the value is the half width of the window, so a tolerance
/// of 10 ppm on 1000 Da covers roughly 999.99 to 1000.01 Da before the
/// window resolver makes neighbouring peaks disjoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PeakTolerance {
    #[serde(rename = "ppm")]
    Ppm(f64),
    #[serde(rename = "da")]
    Absolute(f64),
}

impl Default for PeakTolerance {
    fn default() -> Self {
        PeakTolerance::Ppm(15.0)
    }
}

/// Which terminus a PRM peak was derived from.
///
/// Reversed peaks are complements of the precursor mass, so their error
/// grows with the precursor and not only with the peak mass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PeakKind {
    #[default]
    Original,
    Reversed,
}

/// Constant extra allowance, in daltons, added to ppm tolerances.
const PPM_FLOOR_DA: f64 = 0.1;

impl PeakTolerance {
    /// Nominal scaled delta for a peak.
    ///
    /// * ppm, original peak: `round(mass * ppo * r + 0.1 * r)`
    /// * ppm, reversed peak: `round((mass + precursor) * ppo * r + 0.1 * r)`
    /// * absolute: `round(da * r)`
    ///
    /// where `ppo = ppm * 1e-6` and `r` is the convert ratio.
    ///
    /// ```
    /// use massgraph::{MassScale, PeakKind, PeakTolerance};
    ///
    /// let scale = MassScale::try_new(1.0).unwrap();
    /// let tol = PeakTolerance::Absolute(3.0);
    /// assert_eq!(tol.scaled_delta(500.0, PeakKind::Original, 0.0, &scale), 3);
    /// ```
    pub fn scaled_delta(
        &self,
        mass: f64,
        kind: PeakKind,
        precursor_mass: f64,
        scale: &MassScale,
    ) -> i32 {
        let ratio = scale.convert_ratio();
        match *self {
            PeakTolerance::Absolute(da) => (da * ratio).round() as i32,
            PeakTolerance::Ppm(ppm) => {
                let ppo = ppm * 1e-6;
                let base = match kind {
                    PeakKind::Original => mass,
                    PeakKind::Reversed => mass + precursor_mass,
                };
                (base * ppo * ratio + PPM_FLOOR_DA * ratio).round() as i32
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            PeakTolerance::Absolute(x) | PeakTolerance::Ppm(x) => x.is_finite() && x >= 0.0,
        }
    }
}
