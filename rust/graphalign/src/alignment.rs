//! Alignment DP with tie-preserving predecessor sets.
//!
//! A state `(i, j, k)` pairs protein vertex `i` with spectrum vertex `j`;
//! `k` picks one mass inside the tolerance window of `j`, `k = 0` being
//! `mass[j] - delta_l[j]`. `T` holds the longest chain of consistent pairs
//! ending at a state, counting the root `(0, 0, 0)` as 1. `E` keeps every
//! predecessor reaching that maximum.
//!
//! States live in one flat arena. Row `i` is the concatenation of the
//! windows of every spectrum vertex, so `(i, j, k)` sits at
//! `i * row_width + offsets[j] + k`.

use crate::consistent_pairs::{
    ConsistentPairIndex,
    MassGroup,
};
use crate::tolerance_window::ToleranceWindows;
use massgraph::ModSite;
use serde::Serialize;
use tracing::debug;

/// Sentinel for states no chain reaches.
pub const UNREACHED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateKey {
    pub i: u32,
    pub j: u32,
    pub k: u32,
}

impl StateKey {
    pub const ROOT: StateKey = StateKey { i: 0, j: 0, k: 0 };

    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self {
            i: i as u32,
            j: j as u32,
            k: k as u32,
        }
    }
}

/// One optimal incoming transition of a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predecessor {
    pub state: StateKey,
    /// Offset of the predecessor's mass from its peak (`k' - delta_l[j']`).
    pub shift: i32,
    /// Exact protein mass of the transition.
    pub mass: i32,
    pub mods: Vec<ModSite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentTable {
    num_protein_vertices: usize,
    offsets: Vec<usize>,
    scores: Vec<i32>,
    preds: Vec<Vec<Predecessor>>,
}

impl AlignmentTable {
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn compute(index: &ConsistentPairIndex, windows: &ToleranceWindows) -> Self {
        let num_spectrum = windows.len();
        let mut offsets = Vec::with_capacity(num_spectrum + 1);
        offsets.push(0);
        for j in 0..num_spectrum {
            let last = offsets[j];
            offsets.push(last + windows.width(j));
        }
        let num_protein = index.num_protein_vertices();
        let num_states = num_protein * offsets[num_spectrum];

        let mut table = Self {
            num_protein_vertices: num_protein,
            offsets,
            scores: vec![UNREACHED; num_states],
            preds: vec![Vec::new(); num_states],
        };
        if num_states == 0 {
            return table;
        }
        let root = table.flat(StateKey::ROOT);
        table.scores[root] = 1;

        for i in 0..num_protein {
            for j in 0..num_spectrum {
                for group in index.groups(i, j) {
                    table.relax_group(i, j, group, windows);
                }
            }
        }

        debug!(
            "Alignment table: {} states, {} reached, best chain {}",
            num_states,
            table.scores.iter().filter(|&&t| t > 0).count(),
            table.best_score()
        );
        table
    }

    /// Relaxes every shift state of `(i, j)` through one mass group.
    ///
    /// Targets grow with `k` and the starts are sorted by spectrum vertex
    /// whose windows are disjoint and ascending, so a single cursor walks
    /// the starts once.
    fn relax_group(&mut self, i: usize, j: usize, group: &MassGroup, windows: &ToleranceWindows) {
        let starts = &group.starts;
        let base = windows.mass(j) - windows.delta_l(j) - group.mass;
        let mut cursor = 0;
        for k in 0..windows.width(j) {
            let target = base + k as i32;
            while cursor < starts.len()
                && windows.window(starts[cursor].spectrum as usize).hi() < target
            {
                cursor += 1;
            }
            if cursor == starts.len() {
                break;
            }
            let prev_j = starts[cursor].spectrum as usize;
            let Some(prev_k) = windows.state_of(prev_j, target) else {
                continue;
            };
            let here = self.flat(StateKey::new(i, j, k));
            for start in starts[cursor..]
                .iter()
                .take_while(|s| s.spectrum as usize == prev_j)
            {
                let prev = StateKey::new(start.protein as usize, prev_j, prev_k);
                let prev_score = self.scores[self.flat(prev)];
                if prev_score <= 0 {
                    continue;
                }
                let candidate = prev_score + 1;
                if candidate < self.scores[here] {
                    continue;
                }
                if candidate > self.scores[here] {
                    self.scores[here] = candidate;
                    self.preds[here].clear();
                }
                self.preds[here].push(Predecessor {
                    state: prev,
                    shift: windows.shift(prev_j, prev_k),
                    mass: group.mass,
                    mods: start.mods.clone(),
                });
            }
        }
    }

    fn flat(&self, state: StateKey) -> usize {
        state.i as usize * self.row_width() + self.offsets[state.j as usize] + state.k as usize
    }

    fn row_width(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn num_protein_vertices(&self) -> usize {
        self.num_protein_vertices
    }

    pub fn num_spectrum_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of shift states of spectrum vertex `j`.
    pub fn width(&self, j: usize) -> usize {
        self.offsets[j + 1] - self.offsets[j]
    }

    pub fn contains(&self, state: StateKey) -> bool {
        (state.i as usize) < self.num_protein_vertices
            && (state.j as usize) < self.num_spectrum_vertices()
            && (state.k as usize) < self.width(state.j as usize)
    }

    /// `T` of a state, [`UNREACHED`] if no chain ends there.
    pub fn score(&self, state: StateKey) -> i32 {
        self.scores[self.flat(state)]
    }

    pub fn predecessors(&self, state: StateKey) -> &[Predecessor] {
        &self.preds[self.flat(state)]
    }

    pub fn best_score(&self) -> i32 {
        self.scores.iter().copied().max().unwrap_or(UNREACHED)
    }

    /// Every state in `(i, j, k)` order.
    pub fn states(&self) -> impl Iterator<Item = StateKey> + '_ {
        (0..self.num_protein_vertices).flat_map(move |i| {
            (0..self.num_spectrum_vertices())
                .flat_map(move |j| (0..self.width(j)).map(move |k| StateKey::new(i, j, k)))
        })
    }

    /// States of `(i, j)` reaching at least `min_score`.
    pub fn states_at(
        &self,
        i: usize,
        j: usize,
        min_score: i32,
    ) -> impl Iterator<Item = StateKey> + '_ {
        (0..self.width(j))
            .map(move |k| StateKey::new(i, j, k))
            .filter(move |s| self.score(*s) >= min_score)
    }
}
