//! Resolution of nominal peak tolerances into disjoint windows.
//!
//! Every spectrum vertex `j` starts with a symmetric nominal delta. The
//! resolver turns those into asymmetric bounds `delta_l[j]`, `delta_r[j]`
//! such that `mass[j] + delta_r[j] < mass[j + 1] - delta_l[j + 1]`, so any
//! scaled mass belongs to at most one peak.
//!
//! Peaks are processed left to right:
//!
//! 1. No overlap with the previous window: keep the nominal delta on both sides.
//! 2. Overlap, but the peak itself lies right of the previous window: trim
//!    this peak's left bound to start just after the previous window.
//! 3. The peak lies inside the previous window: trim the previous right bound
//!    to end just before this peak, and let this peak inherit the remainder.
//!
//! In cases 2 and 3, if the nominal lower bound reaches past the start of the
//! previous window, the walk goes back to the first earlier window that ends
//! below it. The gap after that window is then attributed to the next peak.

use crate::errors::DataProcessingError;
use massgraph::MassWindow;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToleranceWindows {
    masses: Vec<i32>,
    delta_l: Vec<i32>,
    delta_r: Vec<i32>,
}

impl ToleranceWindows {
    /// Resolves nominal deltas for peaks sorted by strictly increasing mass.
    ///
    /// Peak 0 is the alignment root and always gets a zero-width window.
    pub fn resolve(masses: &[i32], deltas: &[i32]) -> Result<Self, DataProcessingError> {
        if masses.is_empty() {
            return Err(DataProcessingError::ExpectedNonEmptyData {
                context: "tolerance windows need at least the root peak",
            });
        }
        if masses.len() != deltas.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: masses.len(),
                other: deltas.len(),
                context: "masses and nominal deltas",
            });
        }
        for (index, pair) in masses.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(DataProcessingError::ExpectedSortedData {
                    index: index + 1,
                    context: "peak masses must strictly increase",
                });
            }
        }
        if let Some((index, &value)) = deltas.iter().enumerate().find(|(_, d)| **d < 0) {
            return Err(DataProcessingError::ExpectedNonNegative {
                index,
                value,
                context: "nominal delta",
            });
        }

        let n = masses.len();
        let mut delta_l = vec![0; n];
        let mut delta_r = vec![0; n];
        let end = |dr: &[i32], j: usize| masses[j] + dr[j];
        let start = |dl: &[i32], j: usize| masses[j] - dl[j];

        for i in 1..n {
            let lower = masses[i] - deltas[i];
            let prev_end = end(&delta_r, i - 1);
            if prev_end < lower {
                delta_l[i] = deltas[i];
                delta_r[i] = deltas[i];
                continue;
            }

            if lower < start(&delta_l, i - 1) {
                fill_gap_below(masses, &mut delta_l, &delta_r, i - 1, lower);
            }

            if masses[i] > prev_end {
                delta_l[i] = (masses[i] - (prev_end + 1)).max(0);
                delta_r[i] = deltas[i];
            } else {
                delta_r[i - 1] = (masses[i] - 1 - masses[i - 1]).max(0);
                delta_l[i] = 0;
                delta_r[i] = deltas[i].max(prev_end - masses[i]);
            }
        }

        let out = Self {
            masses: masses.to_vec(),
            delta_l,
            delta_r,
        };
        debug!(
            "Resolved {} tolerance windows covering {} shift states",
            n,
            out.total_width()
        );
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn mass(&self, j: usize) -> i32 {
        self.masses[j]
    }

    pub fn delta_l(&self, j: usize) -> i32 {
        self.delta_l[j]
    }

    pub fn delta_r(&self, j: usize) -> i32 {
        self.delta_r[j]
    }

    pub fn window(&self, j: usize) -> MassWindow {
        // Bounds are never negative.
        MassWindow::around(self.masses[j], self.delta_l[j], self.delta_r[j])
            .unwrap_or_else(|| unreachable!("resolved tolerance bounds are non-negative"))
    }

    /// Number of shift states `k` of vertex `j`.
    pub fn width(&self, j: usize) -> usize {
        (self.delta_l[j] + self.delta_r[j]) as usize + 1
    }

    pub fn total_width(&self) -> usize {
        (0..self.len()).map(|j| self.width(j)).sum()
    }

    pub fn max_delta_l(&self) -> i32 {
        self.delta_l.iter().copied().max().unwrap_or(0)
    }

    pub fn max_delta_r(&self) -> i32 {
        self.delta_r.iter().copied().max().unwrap_or(0)
    }

    /// Shift of state `k` of vertex `j`, relative to the peak mass.
    pub fn shift(&self, j: usize, k: usize) -> i32 {
        k as i32 - self.delta_l[j]
    }

    /// State index of an absolute mass inside the window of `j`.
    pub fn state_of(&self, j: usize, mass: i32) -> Option<usize> {
        let window = self.window(j);
        if window.contains(mass) {
            Some((mass - window.lo()) as usize)
        } else {
            None
        }
    }
}

/// Walks back from `from` to the first window ending below `lower`, then
/// extends the left bound of the peak after it down to `lower`, without
/// crossing that window. Bounds only grow.
fn fill_gap_below(masses: &[i32], delta_l: &mut [i32], delta_r: &[i32], from: usize, lower: i32) {
    let mut iter = from;
    while iter > 0 && masses[iter] + delta_r[iter] > lower {
        iter -= 1;
    }
    if iter >= from {
        return;
    }
    let next = iter + 1;
    let new_start = lower.max(masses[iter] + delta_r[iter] + 1);
    delta_l[next] = delta_l[next].max(masses[next] - new_start);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(w: &ToleranceWindows) {
        for j in 0..w.len() {
            assert!(w.delta_l(j) >= 0 && w.delta_r(j) >= 0);
        }
        for j in 1..w.len() {
            assert!(
                w.window(j - 1).hi() < w.window(j).lo(),
                "windows {} and {} overlap: {:?} {:?}",
                j - 1,
                j,
                w.window(j - 1),
                w.window(j)
            );
        }
    }

    #[test]
    fn test_no_overlap_keeps_nominal() {
        let w = ToleranceWindows::resolve(&[0, 100, 200], &[0, 5, 5]).unwrap();
        assert_eq!((w.delta_l(0), w.delta_r(0)), (0, 0));
        assert_eq!((w.delta_l(1), w.delta_r(1)), (5, 5));
        assert_eq!((w.delta_l(2), w.delta_r(2)), (5, 5));
        assert_eq!(w.width(1), 11);
        assert_disjoint(&w);
    }

    #[test]
    fn test_overlap_outside_trims_left() {
        // Windows [95,105] and [101,111]: second starts after 105.
        let w = ToleranceWindows::resolve(&[0, 100, 106], &[0, 5, 5]).unwrap();
        assert_eq!((w.delta_l(1), w.delta_r(1)), (5, 5));
        assert_eq!((w.delta_l(2), w.delta_r(2)), (0, 5));
        assert_disjoint(&w);
    }

    #[test]
    fn test_overlap_inside_splits() {
        // Peak 103 lies inside [95,105].
        let w = ToleranceWindows::resolve(&[0, 100, 103], &[0, 5, 1]).unwrap();
        assert_eq!(w.delta_r(1), 2);
        assert_eq!(w.delta_l(2), 0);
        assert_eq!(w.delta_r(2), 2);
        assert_disjoint(&w);
    }

    #[test]
    fn test_wide_peak_fills_gap_behind() {
        // Third peak reaches back to 90, past the second window [99,101].
        let w = ToleranceWindows::resolve(&[0, 50, 100, 104], &[0, 2, 1, 14]).unwrap();
        // Masses 90..98 lie in the nominal range of peak 3 and in the gap
        // before peak 2; they are attributed to peak 2.
        assert_eq!(w.delta_l(2), 10);
        assert_disjoint(&w);
    }

    #[test]
    fn test_root_is_never_widened() {
        let w = ToleranceWindows::resolve(&[0, 3, 6], &[10, 10, 10]).unwrap();
        assert_eq!((w.delta_l(0), w.delta_r(0)), (0, 0));
        assert_disjoint(&w);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ToleranceWindows::resolve(&[], &[]).is_err());
        assert!(matches!(
            ToleranceWindows::resolve(&[0, 10], &[0]),
            Err(DataProcessingError::ExpectedSlicesSameLength { .. })
        ));
        assert!(matches!(
            ToleranceWindows::resolve(&[0, 10, 10], &[0, 1, 1]),
            Err(DataProcessingError::ExpectedSortedData { index: 2, .. })
        ));
        assert!(matches!(
            ToleranceWindows::resolve(&[0, 10], &[0, -1]),
            Err(DataProcessingError::ExpectedNonNegative { index: 1, .. })
        ));
    }

    #[test]
    fn test_state_lookup() {
        let w = ToleranceWindows::resolve(&[0, 100], &[0, 5]).unwrap();
        assert_eq!(w.state_of(1, 95), Some(0));
        assert_eq!(w.state_of(1, 105), Some(10));
        assert_eq!(w.state_of(1, 106), None);
        assert_eq!(w.shift(1, 0), -5);
    }
}
