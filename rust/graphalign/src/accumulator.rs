//! Collects per-case outcomes and timings from (parallel) iterators.

use crate::pipeline::CaseResult;
use crate::timings::AlignTimings;
use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};

/// Fold-reduce target for a batch of alignment cases.
///
/// Each worker folds into its own accumulator; accumulators are merged
/// pairwise afterwards. Results are put back in case order by
/// [`AlignmentAccumulator::into_sorted`].
#[derive(Default)]
pub(crate) struct AlignmentAccumulator {
    pub(crate) res: Vec<CaseResult>,
    pub(crate) timings: AlignTimings,
}

impl AlignmentAccumulator {
    pub(crate) fn reduce(mut self, other: Self) -> Self {
        self.res.extend(other.res);
        self.timings += other.timings;
        self
    }

    pub(crate) fn fold(mut self, item: (CaseResult, AlignTimings)) -> Self {
        self.res.push(item.0);
        self.timings += item.1;
        self
    }

    pub(crate) fn into_sorted(mut self) -> (Vec<CaseResult>, AlignTimings) {
        self.res.sort_by_key(|r| r.case_index);
        (self.res, self.timings)
    }
}

impl FromIterator<(CaseResult, AlignTimings)> for AlignmentAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (CaseResult, AlignTimings)>,
    {
        iter.into_iter()
            .fold(AlignmentAccumulator::default(), AlignmentAccumulator::fold)
    }
}

impl FromParallelIterator<(CaseResult, AlignTimings)> for AlignmentAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (CaseResult, AlignTimings)>,
    {
        par_iter
            .into_par_iter()
            .fold(AlignmentAccumulator::default, AlignmentAccumulator::fold)
            .reduce(AlignmentAccumulator::default, AlignmentAccumulator::reduce)
    }
}
