//! Spectrum (PRM peak) graph.
//!
//! Vertex `j` is the `j`-th peak by increasing scaled mass. Vertex 0 is a
//! zero-mass root with no tolerance, anchoring every alignment.

use super::distance::{
    DistanceBucket,
    SpectrumPair,
    group_by_distance,
};
use super::mass::MassScale;
use super::tolerance::{
    PeakKind,
    PeakTolerance,
};
use crate::errors::{
    GraphInputError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPeak {
    pub mass: i32,
    pub intensity: f64,
    /// Nominal symmetric tolerance, already scaled.
    pub delta: i32,
}

/// Deconvoluted PRM peak in daltons, before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrmPeak {
    pub mass: f64,
    pub intensity: f64,
    #[serde(default)]
    pub kind: PeakKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumGraph {
    peaks: Vec<SpectrumPeak>,
    precursor_mass: Option<f64>,
}

impl SpectrumGraph {
    /// Validates already scaled peaks.
    ///
    /// The first peak must be the zero-mass root and masses must be
    /// strictly increasing.
    pub fn new(peaks: Vec<SpectrumPeak>) -> Result<Self> {
        let first = peaks.first().ok_or(GraphInputError::EmptySpectrum)?;
        if first.mass != 0 {
            return Err(GraphInputError::MissingRootPeak {
                first_mass: first.mass,
            });
        }
        for (index, pair) in peaks.windows(2).enumerate() {
            if pair[1].mass <= pair[0].mass {
                return Err(GraphInputError::UnsortedPeaks {
                    index: index + 1,
                    previous: pair[0].mass,
                    current: pair[1].mass,
                });
            }
        }
        for (index, peak) in peaks.iter().enumerate() {
            if peak.delta < 0 {
                return Err(GraphInputError::NegativeTolerance {
                    index,
                    delta: peak.delta,
                });
            }
            if !peak.intensity.is_finite() {
                return Err(GraphInputError::NonFiniteValue {
                    context: "peak intensity",
                    value: peak.intensity,
                });
            }
        }
        Ok(Self {
            peaks,
            precursor_mass: None,
        })
    }

    /// Builds the graph from raw PRM peaks.
    ///
    /// Adds the root, sorts by mass and derives every nominal delta from
    /// `tolerance`. Peaks that collapse onto the same scaled mass are merged,
    /// keeping the more intense one.
    pub fn from_prm_peaks(
        raw: &[PrmPeak],
        precursor_mass: f64,
        tolerance: &PeakTolerance,
        scale: &MassScale,
    ) -> Result<Self> {
        if !tolerance.is_valid() {
            let value = match *tolerance {
                PeakTolerance::Ppm(x) | PeakTolerance::Absolute(x) => x,
            };
            return Err(GraphInputError::InvalidTolerance(value));
        }
        if !precursor_mass.is_finite() {
            return Err(GraphInputError::NonFiniteValue {
                context: "precursor mass",
                value: precursor_mass,
            });
        }

        let mut peaks = Vec::with_capacity(raw.len() + 1);
        peaks.push(SpectrumPeak {
            mass: 0,
            intensity: 0.0,
            delta: 0,
        });
        for peak in raw {
            let mass = scale.try_to_scaled(peak.mass, "peak mass")?;
            if mass <= 0 {
                continue;
            }
            peaks.push(SpectrumPeak {
                mass,
                intensity: peak.intensity,
                delta: tolerance.scaled_delta(peak.mass, peak.kind, precursor_mass, scale),
            });
        }
        peaks.sort_by_key(|p| p.mass);

        let mut merged: Vec<SpectrumPeak> = Vec::with_capacity(peaks.len());
        let mut num_merged = 0;
        for peak in peaks {
            match merged.last_mut() {
                Some(last) if last.mass == peak.mass => {
                    num_merged += 1;
                    // The root always stays as it is.
                    if last.mass != 0 && peak.intensity > last.intensity {
                        *last = peak;
                    }
                }
                _ => merged.push(peak),
            }
        }
        if num_merged > 0 {
            warn!("Merged {} peaks sharing a scaled mass", num_merged);
        }

        let mut out = Self::new(merged)?;
        out.precursor_mass = Some(precursor_mass);
        debug!("Built spectrum graph with {} vertices", out.len());
        Ok(out)
    }

    pub fn with_precursor_mass(mut self, precursor_mass: f64) -> Self {
        self.precursor_mass = Some(precursor_mass);
        self
    }

    pub fn precursor_mass(&self) -> Option<f64> {
        self.precursor_mass
    }

    pub fn peaks(&self) -> &[SpectrumPeak] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn masses(&self) -> Vec<i32> {
        self.peaks.iter().map(|p| p.mass).collect()
    }

    pub fn deltas(&self) -> Vec<i32> {
        self.peaks.iter().map(|p| p.delta).collect()
    }

    pub fn mass(&self, j: usize) -> i32 {
        self.peaks[j].mass
    }

    pub fn intensity(&self, j: usize) -> f64 {
        self.peaks[j].intensity
    }

    /// Every peak pair `j1 < j2` with `min_dist <= distance <= max_dist`,
    /// bucketed by exact distance.
    pub fn distance_buckets(
        &self,
        min_dist: i32,
        max_dist: i32,
    ) -> Vec<DistanceBucket<SpectrumPair>> {
        let mut items = Vec::new();
        for (start, first) in self.peaks.iter().enumerate() {
            for (offset, second) in self.peaks[start + 1..].iter().enumerate() {
                let dist = second.mass - first.mass;
                if dist > max_dist {
                    break;
                }
                if dist < min_dist {
                    continue;
                }
                items.push((
                    dist,
                    SpectrumPair {
                        start: start as u32,
                        end: (start + 1 + offset) as u32,
                    },
                ));
            }
        }
        group_by_distance(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(mass: i32, delta: i32) -> SpectrumPeak {
        SpectrumPeak {
            mass,
            intensity: 1.0,
            delta,
        }
    }

    #[test]
    fn test_validation() {
        assert_eq!(SpectrumGraph::new(vec![]), Err(GraphInputError::EmptySpectrum));
        assert!(matches!(
            SpectrumGraph::new(vec![peak(5, 0)]),
            Err(GraphInputError::MissingRootPeak { first_mass: 5 })
        ));
        assert!(matches!(
            SpectrumGraph::new(vec![peak(0, 0), peak(10, 1), peak(10, 1)]),
            Err(GraphInputError::UnsortedPeaks { index: 2, .. })
        ));
        assert!(matches!(
            SpectrumGraph::new(vec![peak(0, 0), peak(10, -1)]),
            Err(GraphInputError::NegativeTolerance { index: 1, .. })
        ));
    }

    #[test]
    fn test_from_prm_peaks_sorts_and_merges() {
        let scale = MassScale::try_new(1.0).unwrap();
        let raw = vec![
            PrmPeak {
                mass: 200.0,
                intensity: 3.0,
                kind: PeakKind::Original,
            },
            PrmPeak {
                mass: 100.2,
                intensity: 1.0,
                kind: PeakKind::Original,
            },
            PrmPeak {
                mass: 99.9,
                intensity: 5.0,
                kind: PeakKind::Reversed,
            },
        ];
        let graph =
            SpectrumGraph::from_prm_peaks(&raw, 1000.0, &PeakTolerance::Absolute(2.0), &scale)
                .unwrap();
        assert_eq!(graph.masses(), vec![0, 100, 200]);
        assert_eq!(graph.intensity(1), 5.0);
        assert_eq!(graph.deltas(), vec![0, 2, 2]);
        assert_eq!(graph.precursor_mass(), Some(1000.0));
    }

    #[test]
    fn test_spectrum_buckets() {
        let graph =
            SpectrumGraph::new(vec![peak(0, 0), peak(100, 1), peak(200, 1), peak(310, 1)]).unwrap();
        let buckets = graph.distance_buckets(50, 250);
        let dists: Vec<i32> = buckets.iter().map(|b| b.dist).collect();
        assert_eq!(dists, vec![100, 110, 200, 210]);
        assert_eq!(buckets[0].pairs.len(), 2);
        assert_eq!(buckets[3].pairs, vec![SpectrumPair { start: 1, end: 3 }]);
    }
}
