//! Consistent pair index.
//!
//! A protein sub-path `(pr_v1, pr_v2)` of mass `M` and a peak pair
//! `(sp_v1, sp_v2)` are consistent when some mass inside the window of
//! `sp_v2`, minus `M`, lands inside the window of `sp_v1`. Writing
//! `d = mass[sp_v2] - mass[sp_v1]` this is
//!
//! ```text
//! M - d <= delta_l[sp_v1] + delta_r[sp_v2]
//! d - M <= delta_r[sp_v1] + delta_l[sp_v2]
//! ```
//!
//! Matches are stored at their end vertices `(pr_v2, sp_v2)` and grouped
//! by the exact protein mass `M`, so the DP can walk every group once.

use crate::config::PairSearch;
use crate::tolerance_window::ToleranceWindows;
use massgraph::utils::sorted_range_by_key;
use massgraph::{
    DistanceBucket,
    ModSite,
    ProteinDistanceBuckets,
    ProteinPair,
    SpectrumPair,
};
use serde::Serialize;
use tracing::debug;

/// Start of a consistent pair, seen from its end vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairStart {
    pub protein: u32,
    pub spectrum: u32,
    pub mods: Vec<ModSite>,
}

/// All consistent pairs ending at one `(i, j)` and sharing a protein mass.
///
/// `starts` is sorted by start spectrum vertex, then protein vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MassGroup {
    pub mass: i32,
    pub starts: Vec<PairStart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistentPairIndex {
    num_protein_vertices: usize,
    num_spectrum_vertices: usize,
    groups: Vec<Vec<MassGroup>>,
}

/// Exact per-endpoint membership test.
pub fn is_consistent(windows: &ToleranceWindows, protein_mass: i32, pair: &SpectrumPair) -> bool {
    let (v1, v2) = (pair.start as usize, pair.end as usize);
    let spec_mass = windows.mass(v2) - windows.mass(v1);
    protein_mass - spec_mass <= windows.delta_l(v1) + windows.delta_r(v2)
        && spec_mass - protein_mass <= windows.delta_r(v1) + windows.delta_l(v2)
}

impl ConsistentPairIndex {
    /// Builds the index.
    ///
    /// Protein distances below `min_dist` are ignored. `spectrum_buckets`
    /// must be sorted by distance.
    pub fn build(
        protein_buckets: &ProteinDistanceBuckets,
        spectrum_buckets: &[DistanceBucket<SpectrumPair>],
        windows: &ToleranceWindows,
        num_protein_vertices: usize,
        min_dist: i32,
        search: PairSearch,
    ) -> Self {
        let mut out = Self {
            num_protein_vertices,
            num_spectrum_vertices: windows.len(),
            groups: vec![Vec::new(); num_protein_vertices * windows.len()],
        };

        for buckets in protein_buckets.by_mod_count.iter() {
            match search {
                PairSearch::Exact => {
                    out.scan_exact(buckets, spectrum_buckets, windows, min_dist)
                }
                PairSearch::Lookahead { lookahead } => out.scan_lookahead(
                    buckets,
                    spectrum_buckets,
                    windows,
                    min_dist,
                    lookahead,
                ),
            }
        }

        for group in out.groups.iter_mut().flat_map(|g| g.iter_mut()) {
            group.starts.sort_by_key(|s| (s.spectrum, s.protein));
        }
        debug!(
            "Consistent pair index: {} starts in {} groups",
            out.num_starts(),
            out.num_groups()
        );
        out
    }

    fn scan_exact(
        &mut self,
        protein: &[DistanceBucket<ProteinPair>],
        spectrum: &[DistanceBucket<SpectrumPair>],
        windows: &ToleranceWindows,
        min_dist: i32,
    ) {
        let reach = windows.max_delta_l() + windows.max_delta_r();
        for pr_bucket in protein.iter().filter(|b| b.dist >= min_dist) {
            let range = sorted_range_by_key(
                spectrum,
                (pr_bucket.dist - reach)..=(pr_bucket.dist + reach),
                |b| b.dist,
            );
            for sp_bucket in spectrum[range].iter() {
                self.add_matches(pr_bucket, sp_bucket, windows);
            }
        }
    }

    /// Sliding scan with an adaptive cutoff.
    ///
    /// Protein distances ascend, so the first bucket matching one distance
    /// is a safe start for the next. Past the protein distance, the scan stops
    /// `lookahead` buckets after the first bucket that fails, and each later
    /// match pushes the cutoff one bucket further.
    fn scan_lookahead(
        &mut self,
        protein: &[DistanceBucket<ProteinPair>],
        spectrum: &[DistanceBucket<SpectrumPair>],
        windows: &ToleranceWindows,
        min_dist: i32,
        lookahead: usize,
    ) {
        let mut spec_idx_min = 0;
        for pr_bucket in protein.iter().filter(|b| b.dist >= min_dist) {
            let pr_dist = pr_bucket.dist;
            let mut first_match = true;
            let mut cutoff_open = true;
            let mut max_idx = spectrum.len();
            let mut idx = spec_idx_min;

            while idx < spectrum.len() && idx < max_idx {
                let sp_bucket = &spectrum[idx];
                let (below, above) = bucket_reach(sp_bucket, windows);
                if sp_bucket.dist <= pr_dist {
                    if sp_bucket.dist + below >= pr_dist {
                        if first_match {
                            spec_idx_min = idx;
                            first_match = false;
                        }
                        self.add_matches(pr_bucket, sp_bucket, windows);
                    }
                } else if sp_bucket.dist - above > pr_dist {
                    if cutoff_open {
                        max_idx = idx + lookahead;
                        cutoff_open = false;
                    }
                } else {
                    self.add_matches(pr_bucket, sp_bucket, windows);
                    cutoff_open = true;
                    max_idx += 1;
                }
                idx += 1;
            }
        }
    }

    fn add_matches(
        &mut self,
        pr_bucket: &DistanceBucket<ProteinPair>,
        sp_bucket: &DistanceBucket<SpectrumPair>,
        windows: &ToleranceWindows,
    ) {
        let mass = pr_bucket.dist;
        for pr_pair in pr_bucket.pairs.iter() {
            for sp_pair in sp_bucket.pairs.iter() {
                if !is_consistent(windows, mass, sp_pair) {
                    continue;
                }
                let slot = self.slot(pr_pair.end as usize, sp_pair.end as usize);
                let groups = &mut self.groups[slot];
                let group_idx = match groups.binary_search_by_key(&mass, |g| g.mass) {
                    Ok(x) => x,
                    Err(x) => {
                        groups.insert(
                            x,
                            MassGroup {
                                mass,
                                starts: Vec::new(),
                            },
                        );
                        x
                    }
                };
                let starts = &mut groups[group_idx].starts;
                let seen = starts
                    .iter()
                    .any(|s| s.protein == pr_pair.start && s.spectrum == sp_pair.start);
                if !seen {
                    starts.push(PairStart {
                        protein: pr_pair.start,
                        spectrum: sp_pair.start,
                        mods: pr_pair.mods.clone(),
                    });
                }
            }
        }
    }

    fn slot(&self, i: usize, j: usize) -> usize {
        i * self.num_spectrum_vertices + j
    }

    /// Groups ending at protein vertex `i` and spectrum vertex `j`, sorted by mass.
    pub fn groups(&self, i: usize, j: usize) -> &[MassGroup] {
        &self.groups[self.slot(i, j)]
    }

    pub fn num_protein_vertices(&self) -> usize {
        self.num_protein_vertices
    }

    pub fn num_spectrum_vertices(&self) -> usize {
        self.num_spectrum_vertices
    }

    pub fn num_groups(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    pub fn num_starts(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.iter())
            .map(|g| g.starts.len())
            .sum()
    }

    /// Every `(i, j, group)` triple in `(i, j)` order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &MassGroup)> + '_ {
        let width = self.num_spectrum_vertices.max(1);
        self.groups.iter().enumerate().flat_map(move |(slot, groups)| {
            groups.iter().map(move |g| (slot / width, slot % width, g))
        })
    }
}

/// Widest tolerance reach of any pair in a spectrum bucket, below and above
/// its distance.
fn bucket_reach(bucket: &DistanceBucket<SpectrumPair>, windows: &ToleranceWindows) -> (i32, i32) {
    bucket.pairs.iter().fold((0, 0), |(below, above), p| {
        let (v1, v2) = (p.start as usize, p.end as usize);
        (
            below.max(windows.delta_l(v1) + windows.delta_r(v2)),
            above.max(windows.delta_r(v1) + windows.delta_l(v2)),
        )
    })
}
