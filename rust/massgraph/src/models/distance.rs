//! Distance buckets shared by the protein and spectrum graphs.
//!
//! A bucket collects every endpoint pair whose scaled distance is exactly
//! `dist`. Bucket lists are always sorted by ascending distance.

use super::protein::ModSite;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceBucket<P> {
    pub dist: i32,
    pub pairs: Vec<P>,
}

/// Endpoints of a protein sub-path together with the modifications its
/// edges carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProteinPair {
    pub start: u32,
    pub end: u32,
    pub mods: Vec<ModSite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpectrumPair {
    pub start: u32,
    pub end: u32,
}

/// Protein buckets split by the number of known modifications on the
/// sub-path. `by_mod_count[m]` is sorted by distance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProteinDistanceBuckets {
    pub by_mod_count: Vec<Vec<DistanceBucket<ProteinPair>>>,
}

impl ProteinDistanceBuckets {
    pub fn max_mods(&self) -> usize {
        self.by_mod_count.len().saturating_sub(1)
    }

    pub fn buckets(&self, mod_count: usize) -> &[DistanceBucket<ProteinPair>] {
        self.by_mod_count
            .get(mod_count)
            .map(|x| x.as_slice())
            .unwrap_or(&[])
    }

    /// Largest distance over every modification count.
    pub fn max_dist(&self) -> Option<i32> {
        self.by_mod_count
            .iter()
            .filter_map(|b| b.last().map(|x| x.dist))
            .max()
    }

    pub fn num_pairs(&self) -> usize {
        self.by_mod_count
            .iter()
            .flat_map(|b| b.iter())
            .map(|b| b.pairs.len())
            .sum()
    }
}

/// Groups `(dist, pair)` items into ascending distance buckets.
///
/// Insertion order inside a bucket is preserved.
pub fn group_by_distance<P>(mut items: Vec<(i32, P)>) -> Vec<DistanceBucket<P>> {
    items.sort_by_key(|x| x.0);
    let mut out: Vec<DistanceBucket<P>> = Vec::new();
    for (dist, pair) in items {
        match out.last_mut() {
            Some(last) if last.dist == dist => last.pairs.push(pair),
            _ => out.push(DistanceBucket {
                dist,
                pairs: vec![pair],
            }),
        }
    }
    out
}
