//! Per-stage timings of the alignment pipeline.
//!
//! Timings are summed over every case of a batch, across threads.

use serde::Serialize;
use std::time::Duration;

/// Accumulated wall time spent in each stage.
///
/// ```ignore
/// let (outcomes, timings) = pipeline.process_batch(&cases);
/// println!("DP: {}ms", timings.dp.as_millis());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct AlignTimings {
    /// Resolving the per-peak tolerance windows.
    pub tolerance: Duration,
    /// Distance buckets and the consistent pair index.
    pub pairs: Duration,
    /// Filling the score table and its predecessor sets.
    pub dp: Duration,
    /// Building the backtracking graph.
    pub backtrack: Duration,
    /// Dual-path grid search.
    pub quantify: Duration,
    /// Single-path alignment and report assembly.
    pub legacy: Duration,
}

impl AlignTimings {
    pub fn total(&self) -> Duration {
        self.tolerance + self.pairs + self.dp + self.backtrack + self.quantify + self.legacy
    }
}

impl Serialize for AlignTimings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AlignTimings", 6)?;
        state.serialize_field("tolerance_ms", &self.tolerance.as_millis())?;
        state.serialize_field("pairs_ms", &self.pairs.as_millis())?;
        state.serialize_field("dp_ms", &self.dp.as_millis())?;
        state.serialize_field("backtrack_ms", &self.backtrack.as_millis())?;
        state.serialize_field("quantify_ms", &self.quantify.as_millis())?;
        state.serialize_field("legacy_ms", &self.legacy.as_millis())?;
        state.end()
    }
}

impl std::ops::AddAssign for AlignTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.tolerance += rhs.tolerance;
        self.pairs += rhs.pairs;
        self.dp += rhs.dp;
        self.backtrack += rhs.backtrack;
        self.quantify += rhs.quantify;
        self.legacy += rhs.legacy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_serialize() {
        let mut a = AlignTimings {
            dp: Duration::from_millis(5),
            ..Default::default()
        };
        a += AlignTimings {
            dp: Duration::from_millis(7),
            legacy: Duration::from_millis(2),
            ..Default::default()
        };
        assert_eq!(a.total(), Duration::from_millis(14));
        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["dp_ms"], 12);
        assert_eq!(json["legacy_ms"], 2);
        assert_eq!(json["pairs_ms"], 0);
    }
}
