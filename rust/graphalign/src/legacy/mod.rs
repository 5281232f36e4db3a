//! Single-path alignment with a global mass tolerance.
//!
//! Cells are indexed by protein vertex, spectrum vertex, unknown shift count
//! and known modification count. A cell is entered either through a
//! consistent pair (protein sub-path mass within the tolerance of the peak
//! distance) or through an unknown shift from any strictly earlier cell of
//! the previous shift layer. Every match scores one.

pub mod diagonal;

use crate::backtrack::{
    BacktrackGraph,
    VertexId,
};
use crate::results::{
    EdgeKind,
    MatchedNode,
    SinglePathReport,
};
use diagonal::{
    HeaderContext,
    build_diagonals,
    header_groups,
    max_unexpected_shift,
    refine_headers,
};
use massgraph::utils::sorted_range_by_key;
use massgraph::{
    MassScale,
    ModSite,
    ProteinGraph,
    SpectrumGraph,
};
use tracing::debug;

const NO_PREV: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct SinglePathSettings {
    pub max_known_mods: usize,
    pub max_unknown_shifts: usize,
    /// Global tolerance in daltons.
    pub tolerance: f64,
    /// Smallest spectrum distance, scaled, a consistent pair may span.
    pub min_dist: i32,
    /// Largest unknown shift, in daltons, a valid alignment may use.
    pub max_ptm_mass: f64,
    pub whole_protein_only: bool,
    pub threshold: i32,
}

#[derive(Debug, Clone)]
struct LegacyPair {
    protein: u32,
    spectrum: u32,
    mods: Vec<ModSite>,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    score: i32,
    prev: u32,
    kind: EdgeKind,
    /// Index of the consistent pair entering this cell, if any.
    pair: u32,
}

impl Cell {
    const UNREACHED: Cell = Cell {
        score: -1,
        prev: NO_PREV,
        kind: EdgeKind::Start,
        pair: NO_PREV,
    };
}

/// Best reached cell over every `(i', j')` with `i' <= i` and `j' <= j`.
#[derive(Debug, Clone, Copy)]
struct PrefixBest {
    score: i32,
    cell: u32,
}

struct Dims {
    nj: usize,
    ns: usize,
    nm: usize,
}

impl Dims {
    fn cell(&self, i: usize, j: usize, s: usize, m: usize) -> usize {
        ((i * self.nj + j) * self.ns + s) * self.nm + m
    }

    fn pair_slot(&self, i: usize, j: usize, m: usize) -> usize {
        (i * self.nj + j) * self.nm + m
    }

    fn decode(&self, cell: usize) -> (usize, usize, usize, usize) {
        let m = cell % self.nm;
        let rest = cell / self.nm;
        let s = rest % self.ns;
        let rest = rest / self.ns;
        (rest / self.nj, rest % self.nj, s, m)
    }
}

pub struct SinglePathAligner<'a> {
    protein: &'a ProteinGraph,
    spectrum: &'a SpectrumGraph,
    scale: MassScale,
    settings: SinglePathSettings,
}

impl<'a> SinglePathAligner<'a> {
    pub fn new(
        protein: &'a ProteinGraph,
        spectrum: &'a SpectrumGraph,
        scale: MassScale,
        settings: SinglePathSettings,
    ) -> Self {
        Self {
            protein,
            spectrum,
            scale,
            settings,
        }
    }

    fn dims(&self) -> Dims {
        Dims {
            nj: self.spectrum.len(),
            ns: self.settings.max_unknown_shifts + 1,
            nm: self.settings.max_known_mods + 1,
        }
    }

    /// Consistent pairs, grouped by end vertices and modification count.
    fn consistent_pairs(&self, dims: &Dims) -> (Vec<LegacyPair>, Vec<Vec<u32>>) {
        let tol = self.scale.to_scaled(self.settings.tolerance);
        let spec_max = self.spectrum.masses().last().copied().unwrap_or(0);
        let prot_buckets = self
            .protein
            .distance_buckets(self.settings.max_known_mods, Some(spec_max + tol));
        let prot_max = prot_buckets.max_dist().unwrap_or(0);
        let spec_buckets = self.spectrum
            .distance_buckets(self.settings.min_dist.max(1), prot_max + tol);

        let mut pairs = Vec::new();
        let mut slots: Vec<Vec<u32>> =
            vec![Vec::new(); self.protein.num_vertices() * dims.nj * dims.nm];
        for m in 0..dims.nm {
            for pb in prot_buckets.buckets(m) {
                let window = (pb.dist - tol)..=(pb.dist + tol);
                let range = sorted_range_by_key(&spec_buckets, window, |b| b.dist);
                for sb in spec_buckets[range].iter() {
                    for pp in pb.pairs.iter() {
                        for sp in sb.pairs.iter() {
                            let slot = dims.pair_slot(pp.end as usize, sp.end as usize, m);
                            slots[slot].push(pairs.len() as u32);
                            pairs.push(LegacyPair {
                                protein: pp.start,
                                spectrum: sp.start,
                                mods: pp.mods.clone(),
                            });
                        }
                    }
                }
            }
        }
        // Deterministic order inside a slot.
        for slot in slots.iter_mut() {
            slot.sort_by_key(|&p| (pairs[p as usize].protein, pairs[p as usize].spectrum, p));
        }
        (pairs, slots)
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn align(&self) -> Option<SinglePathReport> {
        let dims = self.dims();
        let ni = self.protein.num_vertices();
        let (pairs, slots) = self.consistent_pairs(&dims);
        debug!("Single path alignment with {} consistent pairs", pairs.len());

        let num_cells = ni * dims.nj * dims.ns * dims.nm;
        let mut cells = vec![Cell::UNREACHED; num_cells];
        let mut best = vec![
            PrefixBest {
                score: -1,
                cell: NO_PREV,
            };
            num_cells
        ];

        for i in 0..ni {
            for j in 0..dims.nj {
                for s in 0..dims.ns {
                    for m in 0..dims.nm {
                        let idx = dims.cell(i, j, s, m);
                        if j == 0 {
                            if s == 0 && m == 0 && (!self.settings.whole_protein_only || i <= 1) {
                                cells[idx].score = 1;
                            }
                        } else {
                            cells[idx] =
                                self.relax(&dims, &cells, &best, &pairs, &slots, (i, j, s, m));
                        }

                        let mut prefix = PrefixBest {
                            score: -1,
                            cell: NO_PREV,
                        };
                        let neighbours = [
                            (i > 0, (i.wrapping_sub(1), j)),
                            (j > 0, (i, j.wrapping_sub(1))),
                        ];
                        for (ok, neighbour) in neighbours {
                            if ok {
                                let candidate = best[dims.cell(neighbour.0, neighbour.1, s, m)];
                                if candidate.score > prefix.score {
                                    prefix = candidate;
                                }
                            }
                        }
                        if cells[idx].score > prefix.score {
                            prefix = PrefixBest {
                                score: cells[idx].score,
                                cell: idx as u32,
                            };
                        }
                        best[idx] = prefix;
                    }
                }
            }
        }

        self.best_report(&dims, &cells, &pairs)
    }

    fn relax(
        &self,
        dims: &Dims,
        cells: &[Cell],
        best: &[PrefixBest],
        pairs: &[LegacyPair],
        slots: &[Vec<u32>],
        (i, j, s, m): (usize, usize, usize, usize),
    ) -> Cell {
        let mut out = Cell::UNREACHED;
        for p in 0..=m {
            for &pair_idx in slots[dims.pair_slot(i, j, p)].iter() {
                let pair = &pairs[pair_idx as usize];
                let prev = dims.cell(pair.protein as usize, pair.spectrum as usize, s, m - p);
                let score = cells[prev].score;
                if score >= 0 && score + 1 > out.score {
                    out = Cell {
                        score: score + 1,
                        prev: prev as u32,
                        kind: EdgeKind::Variable,
                        pair: pair_idx,
                    };
                }
            }
        }
        if s > 0 && i > 0 {
            let shifted = best[dims.cell(i - 1, j - 1, s - 1, m)];
            if shifted.score >= 0 && shifted.score + 1 > out.score {
                out = Cell {
                    score: shifted.score + 1,
                    prev: shifted.cell,
                    kind: EdgeKind::Unexpected,
                    pair: NO_PREV,
                };
            }
        }
        out
    }

    fn best_report(
        &self,
        dims: &Dims,
        cells: &[Cell],
        pairs: &[LegacyPair],
    ) -> Option<SinglePathReport> {
        // Best end cell for every (shift count, mod count) layer.
        let mut candidates: Vec<(i32, usize)> = Vec::new();
        for s in 0..dims.ns {
            for m in 0..dims.nm {
                let mut layer_best: Option<(i32, usize)> = None;
                for i in 0..self.protein.num_vertices() {
                    for j in 0..dims.nj {
                        let idx = dims.cell(i, j, s, m);
                        let score = cells[idx].score;
                        if score >= 0 && layer_best.is_none_or(|(b, _)| score > b) {
                            layer_best = Some((score, idx));
                        }
                    }
                }
                candidates.extend(layer_best);
            }
        }
        candidates.sort_by_key(|&(score, _)| std::cmp::Reverse(score));
        let &(top_score, _) = candidates.first()?;
        if top_score < self.settings.threshold {
            debug!("Best single path score {} below threshold", top_score);
            return None;
        }

        let mut first_report = None;
        for &(score, idx) in candidates.iter() {
            if score < self.settings.threshold {
                break;
            }
            let report = self.report_from_cell(dims, cells, pairs, idx);
            if report.valid {
                return Some(report);
            }
            if first_report.is_none() {
                first_report = Some(report);
            }
        }
        first_report
    }

    fn report_from_cell(
        &self,
        dims: &Dims,
        cells: &[Cell],
        pairs: &[LegacyPair],
        end: usize,
    ) -> SinglePathReport {
        let mut nodes = Vec::new();
        let mut current = end as u32;
        while current != NO_PREV {
            let cell = cells[current as usize];
            let (i, j, s, m) = dims.decode(current as usize);
            let mods = if cell.pair == NO_PREV {
                Vec::new()
            } else {
                pairs[cell.pair as usize].mods.clone()
            };
            nodes.push(MatchedNode {
                protein_vertex: i as u32,
                spectrum_vertex: j as u32,
                shift_count: s,
                mod_count: m,
                kind: cell.kind,
                mods,
            });
            current = cell.prev;
        }
        nodes.reverse();
        let end_cell = cells[end];
        let (_, _, shift_count, mod_count) = dims.decode(end);
        finish_report(
            nodes,
            end_cell.score,
            shift_count,
            mod_count,
            &self.header_context(),
            self.settings.max_ptm_mass,
        )
    }

    fn header_context(&self) -> HeaderContext<'a> {
        HeaderContext {
            protein: self.protein,
            spectrum: self.spectrum,
            scale: self.scale,
            met_excision: self.settings.whole_protein_only,
            tolerance: self.settings.tolerance,
        }
    }
}

fn finish_report(
    nodes: Vec<MatchedNode>,
    score: i32,
    shift_count: usize,
    mod_count: usize,
    ctx: &HeaderContext<'_>,
    max_ptm_mass: f64,
) -> SinglePathReport {
    let mut diagonals = build_diagonals(&nodes, ctx);
    let refined_precursor_mass = refine_headers(&mut diagonals, ctx);
    let header_groups = header_groups(&nodes, &diagonals);
    let valid = max_unexpected_shift(&nodes, &diagonals) <= max_ptm_mass;
    SinglePathReport {
        score,
        shift_count,
        mod_count,
        nodes,
        diagonals,
        header_groups,
        valid,
        refined_precursor_mass,
    }
}

/// Single-path report along one root-to-end path of the backtracking DAG.
pub fn report_from_dag_path(
    dag: &BacktrackGraph,
    path: &[VertexId],
    ctx: &HeaderContext<'_>,
) -> SinglePathReport {
    let mut nodes = Vec::with_capacity(path.len());
    let mut mod_count = 0;
    let mut previous: Option<VertexId> = None;
    for &v in path.iter() {
        let vertex = dag.vertex(v);
        let mods = previous
            .and_then(|p| dag.edge_between(p, v))
            .map(|e| e.mods.clone())
            .unwrap_or_default();
        mod_count += mods.len();
        nodes.push(MatchedNode {
            protein_vertex: vertex.state.i,
            spectrum_vertex: vertex.state.j,
            shift_count: 0,
            mod_count,
            kind: if previous.is_none() {
                EdgeKind::Start
            } else {
                EdgeKind::Variable
            },
            mods,
        });
        previous = Some(v);
    }
    let score = path.last().map(|&v| dag.vertex(v).layer).unwrap_or(0);
    finish_report(nodes, score, 0, mod_count, ctx, f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use massgraph::{
        ProteinGraphBuilder,
        SpectrumPeak,
    };

    fn spectrum(masses: &[i32]) -> SpectrumGraph {
        let peaks = masses
            .iter()
            .map(|&mass| SpectrumPeak {
                mass,
                intensity: 1.0,
                delta: 0,
            })
            .collect();
        SpectrumGraph::new(peaks).unwrap()
    }

    fn settings(max_unknown_shifts: usize) -> SinglePathSettings {
        SinglePathSettings {
            max_known_mods: 1,
            max_unknown_shifts,
            tolerance: 0.0,
            min_dist: 1,
            max_ptm_mass: 500.0,
            whole_protein_only: false,
            threshold: 3,
        }
    }

    fn unit_scale() -> MassScale {
        MassScale::try_new(1.0).unwrap()
    }

    #[test]
    fn test_exact_chain() {
        let protein = ProteinGraph::from_scaled_residues(&[100, 110, 120]).unwrap();
        let spec = spectrum(&[0, 100, 210, 330]);
        let report = SinglePathAligner::new(&protein, &spec, unit_scale(), settings(0))
            .align()
            .unwrap();
        assert_eq!(report.score, 4);
        assert!(report.valid);
        assert_eq!(report.nodes.len(), 4);
        assert_eq!(report.nodes[0].kind, EdgeKind::Start);
        assert_eq!(report.diagonals.len(), 1);
        let h = &report.diagonals[0].header;
        assert!(h.prot_n_term && h.prot_c_term);
        assert_eq!(h.shift, 0.0);
    }

    #[test]
    fn test_known_mod_is_counted() {
        let protein = ProteinGraphBuilder::new(unit_scale())
            .residues(&[100.0, 110.0, 120.0])
            .variable_mod(1, 7, 80.0)
            .build()
            .unwrap();
        let spec = spectrum(&[0, 100, 290, 410]);
        let report = SinglePathAligner::new(&protein, &spec, unit_scale(), settings(0))
            .align()
            .unwrap();
        assert_eq!(report.score, 4);
        assert_eq!(report.mod_count, 1);
        assert_eq!(report.nodes[2].mods, vec![ModSite {
            ptm: 7,
            position: 1
        }]);
        assert_eq!(report.nodes[2].mod_count, 1);
    }

    #[test]
    fn test_unknown_shift_splits_diagonals() {
        let protein = ProteinGraph::from_scaled_residues(&[100, 100, 100, 100]).unwrap();
        // Residue 1 carries an unknown +40.
        let spec = spectrum(&[0, 100, 240, 340, 440]);
        let none = SinglePathAligner::new(&protein, &spec, unit_scale(), settings(0)).align();
        let with_shift = SinglePathAligner::new(&protein, &spec, unit_scale(), settings(1))
            .align()
            .unwrap();
        assert_eq!(with_shift.score, 5);
        assert_eq!(with_shift.shift_count, 1);
        assert_eq!(with_shift.diagonals.len(), 2);
        assert_eq!(with_shift.nodes[2].kind, EdgeKind::Unexpected);
        assert_eq!(with_shift.header_groups, vec![vec![0], vec![1]]);
        assert_eq!(with_shift.diagonals[1].header.shift, 40.0);
        // Without a shift only the first residue matches.
        assert!(none.is_none_or(|r| r.score < with_shift.score));
    }

    #[test]
    fn test_large_shift_is_invalid() {
        let protein = ProteinGraph::from_scaled_residues(&[100, 100, 100, 100]).unwrap();
        let spec = spectrum(&[0, 100, 240, 340, 440]);
        let mut s = settings(1);
        s.max_ptm_mass = 10.0;
        let report = SinglePathAligner::new(&protein, &spec, unit_scale(), s)
            .align()
            .unwrap();
        assert!(!report.valid);
    }

    #[test]
    fn test_below_threshold() {
        let protein = ProteinGraph::from_scaled_residues(&[100, 100]).unwrap();
        let spec = spectrum(&[0, 57]);
        assert!(
            SinglePathAligner::new(&protein, &spec, unit_scale(), settings(1))
                .align()
                .is_none()
        );
    }
}
