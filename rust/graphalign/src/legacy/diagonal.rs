//! Diagonal segments of a single alignment path and their headers.

use crate::results::{
    Diagonal,
    DiagonalHeader,
    EdgeKind,
    MatchedNode,
};
use massgraph::utils::sorted_range_by_key;
use massgraph::{
    MassScale,
    ProteinGraph,
    SpectrumGraph,
};

/// Splits nodes into maximal runs sharing the same shift and mod counts.
///
/// Returns inclusive `(first, last)` node index ranges.
pub fn segment(nodes: &[MatchedNode]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut first = 0;
    for idx in 1..=nodes.len() {
        let split = idx == nodes.len()
            || nodes[idx].shift_count != nodes[first].shift_count
            || nodes[idx].mod_count != nodes[first].mod_count;
        if split && first < nodes.len() {
            out.push((first, idx - 1));
            first = idx;
        }
    }
    out
}

/// Context needed to place headers on the protein and spectrum.
pub struct HeaderContext<'a> {
    pub protein: &'a ProteinGraph,
    pub spectrum: &'a SpectrumGraph,
    pub scale: MassScale,
    /// Treat protein vertex 1 as an N-terminus too (initial methionine removed).
    pub met_excision: bool,
    /// Peak matching tolerance of the refinement pass, in daltons.
    pub tolerance: f64,
}

impl HeaderContext<'_> {
    fn prm_mass(&self, protein_vertex: u32) -> f64 {
        self.scale
            .to_mass(self.protein.prefix_mass(protein_vertex as usize))
    }

    fn spec_mass(&self, spectrum_vertex: u32) -> f64 {
        self.scale.to_mass(self.spectrum.mass(spectrum_vertex as usize))
    }

    fn is_protein_end(&self, protein_vertex: u32) -> bool {
        protein_vertex as usize == self.protein.last_vertex()
    }

    fn protein_mass(&self) -> f64 {
        self.scale.to_mass(self.protein.total_mass())
    }

    fn c_term_shift(&self, n_shift: f64) -> Option<f64> {
        self.spectrum
            .precursor_mass()
            .map(|precursor| precursor - self.protein_mass() - n_shift)
    }

    /// Signed error of the spectrum peak closest to `mass`, if one lies
    /// within the tolerance. Ties keep the lighter peak.
    fn peak_error(&self, mass: f64) -> Option<f64> {
        let lo = self.scale.to_scaled(mass - self.tolerance);
        let hi = self.scale.to_scaled(mass + self.tolerance);
        let peaks = self.spectrum.peaks();
        let range = sorted_range_by_key(peaks, lo..=hi, |p| p.mass);
        let mut best: Option<f64> = None;
        for peak in peaks[range].iter() {
            let error = self.scale.to_mass(peak.mass) - mass;
            if error.abs() > self.tolerance {
                continue;
            }
            if best.is_none_or(|b| error.abs() < b.abs()) {
                best = Some(error);
            }
        }
        best
    }
}

fn blank_header(shift: f64, first: &MatchedNode, last: &MatchedNode) -> DiagonalHeader {
    DiagonalHeader {
        shift,
        n_strict: false,
        c_strict: false,
        prot_n_term: false,
        prot_c_term: false,
        pep_n_term: false,
        pep_c_term: false,
        c_term_shift: None,
        match_first_pos: first.protein_vertex,
        match_last_pos: last.protein_vertex,
    }
}

/// Builds the diagonals of a path.
///
/// * first: shift of the root match, N-terminal flags (and C-terminal
///   flags when it is the only diagonal);
/// * internal: mean of `spectrum mass - protein mass` over the segment;
/// * last: shift of the final match and C-terminal flags.
pub fn build_diagonals(nodes: &[MatchedNode], ctx: &HeaderContext<'_>) -> Vec<Diagonal> {
    let segments = segment(nodes);
    let num = segments.len();
    let mut out = Vec::with_capacity(num);
    for (seg_idx, &(first, last)) in segments.iter().enumerate() {
        let (first_node, last_node) = (&nodes[first], &nodes[last]);
        let mut header = if seg_idx == 0 {
            let shift = ctx.spec_mass(first_node.spectrum_vertex)
                - ctx.prm_mass(first_node.protein_vertex);
            let mut h = blank_header(shift, first_node, last_node);
            h.n_strict = true;
            let at_n_term = first_node.protein_vertex == 0
                || (ctx.met_excision && first_node.protein_vertex == 1);
            h.prot_n_term = at_n_term;
            h.pep_n_term = !at_n_term;
            if num == 1 {
                h.prot_c_term = ctx.is_protein_end(last_node.protein_vertex);
                h.pep_c_term = !h.prot_c_term;
            }
            h
        } else if seg_idx + 1 == num {
            let shift =
                ctx.spec_mass(last_node.spectrum_vertex) - ctx.prm_mass(last_node.protein_vertex);
            let mut h = blank_header(shift, first_node, last_node);
            h.c_strict = true;
            h.prot_c_term = ctx.is_protein_end(last_node.protein_vertex);
            h.pep_c_term = !h.prot_c_term;
            h
        } else {
            let seg = &nodes[first..=last];
            let total: f64 = seg
                .iter()
                .map(|n| ctx.spec_mass(n.spectrum_vertex) - ctx.prm_mass(n.protein_vertex))
                .sum();
            let mut h = blank_header(total / seg.len() as f64, first_node, last_node);
            h.n_strict = true;
            h
        };
        header.c_term_shift = ctx.c_term_shift(header.shift);
        out.push(Diagonal {
            first_node: first,
            last_node: last,
            header,
        });
    }
    out
}

/// Refines headers against the spectrum peaks.
///
/// 1. Each shift moves by the mean error of the peaks matched by its
///    predicted prefix masses over `[match_first_pos, match_last_pos]`.
/// 2. Match bounds grow outwards to the farthest matched position that stays
///    clear of the neighbouring diagonals.
/// 3. A precursor within tolerance of `protein mass + last shift` snaps
///    onto it, and every C-terminal shift is recomputed from it.
///
/// Returns the refined precursor mass.
pub fn refine_headers(diagonals: &mut [Diagonal], ctx: &HeaderContext<'_>) -> Option<f64> {
    for diag in diagonals.iter_mut() {
        let header = &mut diag.header;
        let errors: Vec<f64> = (header.match_first_pos..=header.match_last_pos)
            .filter_map(|pos| ctx.peak_error(ctx.prm_mass(pos) + header.shift))
            .collect();
        if !errors.is_empty() {
            header.shift += errors.iter().sum::<f64>() / errors.len() as f64;
        }
    }

    let last_vertex = ctx.protein.last_vertex() as u32;
    for idx in 0..diagonals.len() {
        let lo = match idx {
            0 => 0,
            _ => diagonals[idx - 1].header.match_last_pos + 1,
        };
        let hi = diagonals.get(idx + 1).map_or(last_vertex, |next| {
            next.header.match_first_pos.saturating_sub(1)
        });
        let header = &mut diagonals[idx].header;
        let shift = header.shift;
        let matches = |pos: &u32| ctx.peak_error(ctx.prm_mass(*pos) + shift).is_some();
        if let Some(first) = (lo..header.match_first_pos).find(matches) {
            header.match_first_pos = first;
        }
        if let Some(last) = (header.match_last_pos + 1..=hi).rev().find(matches) {
            header.match_last_pos = last;
        }
    }

    let precursor = ctx.spectrum.precursor_mass()?;
    let refined = match diagonals.last() {
        Some(last) => {
            let theoretical = ctx.protein_mass() + last.header.shift;
            if (precursor - theoretical).abs() <= ctx.tolerance {
                theoretical
            } else {
                precursor
            }
        }
        None => precursor,
    };
    for diag in diagonals.iter_mut() {
        diag.header.c_term_shift = Some(refined - ctx.protein_mass() - diag.header.shift);
    }
    Some(refined)
}

/// Groups diagonal indices; a group starts at each diagonal entered through
/// an unexpected shift.
pub fn header_groups(nodes: &[MatchedNode], diagonals: &[Diagonal]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current = Vec::new();
    for (idx, diag) in diagonals.iter().enumerate() {
        if nodes[diag.first_node].kind == EdgeKind::Unexpected && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(idx);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Largest jump of the diagonal shift across an unexpected edge.
pub fn max_unexpected_shift(nodes: &[MatchedNode], diagonals: &[Diagonal]) -> f64 {
    diagonals
        .windows(2)
        .filter(|w| nodes[w[1].first_node].kind == EdgeKind::Unexpected)
        .map(|w| (w[1].header.shift - w[0].header.shift).abs())
        .fold(0.0, f64::max)
}
