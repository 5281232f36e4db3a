use serde::{
    Deserialize,
    Serialize,
};
use std::ops::RangeInclusive;

/// Index range of the elements of a sorted slice whose key lies inside
/// `key_range` (both ends inclusive).
///
/// The slice must be sorted by `key_fn`; the result is meaningless otherwise.
///
/// ```
/// use massgraph::utils::sorted_range_by_key;
///
/// let dists = [90, 98, 100, 102, 110];
/// let range = sorted_range_by_key(&dists, 95..=105, |&d| d);
/// assert_eq!(&dists[range], &[98, 100, 102]);
///
/// let empty = sorted_range_by_key(&dists, 111..=120, |&d| d);
/// assert!(empty.is_empty());
/// ```
pub fn sorted_range_by_key<T, K, F>(
    slice: &[T],
    key_range: RangeInclusive<K>,
    key_fn: F,
) -> std::ops::Range<usize>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    let (low, high) = key_range.into_inner();
    if low > high {
        return 0..0;
    }
    let start_idx = slice.partition_point(|x| key_fn(x) < low);
    let end_idx = start_idx + slice[start_idx..].partition_point(|x| key_fn(x) <= high);
    start_idx..end_idx
}

/// Closed-closed window of scaled masses `[lo, hi]`.
///
/// Construction guarantees `lo <= hi`, so an empty window can never be
/// propagated further down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MassWindow {
    lo: i32,
    hi: i32,
}

impl MassWindow {
    pub fn try_new(lo: i32, hi: i32) -> Option<Self> {
        if lo > hi { None } else { Some(Self { lo, hi }) }
    }

    /// Window `[center - left, center + right]`.
    pub fn around(center: i32, left: i32, right: i32) -> Option<Self> {
        if left < 0 || right < 0 {
            return None;
        }
        Self::try_new(center - left, center + right)
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    /// Number of integer masses covered.
    pub fn width(&self) -> usize {
        (self.hi - self.lo) as usize + 1
    }

    pub fn contains(&self, x: i32) -> bool {
        self.lo <= x && x <= self.hi
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !(self.hi < other.lo || other.hi < self.lo)
    }

    pub fn as_inclusive_range(&self) -> RangeInclusive<i32> {
        self.lo..=self.hi
    }
}
