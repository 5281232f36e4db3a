//! Protein (proteoform) graph.
//!
//! Vertex `i` sits between residue `i - 1` and residue `i`, so a protein of
//! `n` residues has `n + 1` vertices. Every residue position owns a list of
//! parallel edges: the unmodified ("black") edge first, then one edge per
//! known variable modification at that position.

use super::distance::{
    DistanceBucket,
    ProteinDistanceBuckets,
    ProteinPair,
    group_by_distance,
};
use super::mass::MassScale;
use crate::errors::{
    GraphInputError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;
use tracing::debug;

/// A known modification placed on a residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModSite {
    /// Identifier of the modification in the caller's table.
    pub ptm: u16,
    /// Residue position (0 based).
    pub position: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidueEdge {
    pub mass: i32,
    pub mods: Vec<ModSite>,
}

impl ResidueEdge {
    pub fn unmodified(mass: i32) -> Self {
        Self {
            mass,
            mods: Vec::new(),
        }
    }

    pub fn is_modified(&self) -> bool {
        !self.mods.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProteinGraph {
    positions: Vec<Vec<ResidueEdge>>,
    prefix_masses: Vec<i32>,
}

impl ProteinGraph {
    /// Builds a graph from already scaled edges.
    ///
    /// `positions[p][0]` must be the unmodified edge of residue `p`.
    pub fn try_new(positions: Vec<Vec<ResidueEdge>>) -> Result<Self> {
        if positions.is_empty() {
            return Err(GraphInputError::EmptyProtein);
        }
        let mut prefix_masses = Vec::with_capacity(positions.len() + 1);
        prefix_masses.push(0);
        for (position, edges) in positions.iter().enumerate() {
            let black = match edges.first() {
                Some(e) if !e.is_modified() => e,
                _ => return Err(GraphInputError::MissingUnmodifiedEdge { position }),
            };
            for edge in edges {
                if edge.mass <= 0 {
                    return Err(GraphInputError::NonPositiveResidueMass {
                        position,
                        mass: edge.mass,
                    });
                }
            }
            let last = prefix_masses[position];
            prefix_masses.push(last + black.mass);
        }
        Ok(Self {
            positions,
            prefix_masses,
        })
    }

    /// Unmodified protein from scaled residue masses.
    pub fn from_scaled_residues(masses: &[i32]) -> Result<Self> {
        Self::try_new(
            masses
                .iter()
                .map(|&m| vec![ResidueEdge::unmodified(m)])
                .collect(),
        )
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len() + 1
    }

    pub fn num_residues(&self) -> usize {
        self.positions.len()
    }

    pub fn last_vertex(&self) -> usize {
        self.positions.len()
    }

    pub fn edges(&self, position: usize) -> &[ResidueEdge] {
        &self.positions[position]
    }

    /// Unmodified mass from vertex 0 to vertex `i`.
    pub fn prefix_mass(&self, vertex: usize) -> i32 {
        self.prefix_masses[vertex]
    }

    pub fn prefix_masses(&self) -> &[i32] {
        &self.prefix_masses
    }

    /// Unmodified mass of the residues between two vertices.
    pub fn black_mass(&self, from: usize, to: usize) -> i32 {
        self.prefix_masses[to] - self.prefix_masses[from]
    }

    pub fn total_mass(&self) -> i32 {
        self.prefix_masses[self.positions.len()]
    }

    /// Enumerates every sub-path `v1 < v2` carrying at most `max_mods`
    /// modifications and buckets them by modification count and exact mass.
    ///
    /// Sub-paths heavier than `max_dist` are dropped; residue masses are
    /// positive, so extension stops as soon as every partial path exceeds it.
    pub fn distance_buckets(
        &self,
        max_mods: usize,
        max_dist: Option<i32>,
    ) -> ProteinDistanceBuckets {
        let limit = max_dist.unwrap_or(i32::MAX);
        let mut grouped: HashMap<usize, Vec<(i32, ProteinPair)>> = HashMap::new();

        for start in 0..self.positions.len() {
            let mut partial: Vec<(i32, Vec<ModSite>)> = vec![(0, Vec::new())];
            for end in (start + 1)..=self.positions.len() {
                let mut next = Vec::with_capacity(partial.len());
                for (mass, mods) in partial.iter() {
                    for edge in self.positions[end - 1].iter() {
                        let new_mass = mass + edge.mass;
                        if new_mass > limit || mods.len() + edge.mods.len() > max_mods {
                            continue;
                        }
                        let mut new_mods = mods.clone();
                        new_mods.extend_from_slice(&edge.mods);
                        next.push((new_mass, new_mods));
                    }
                }
                if next.is_empty() {
                    break;
                }
                for (mass, mods) in next.iter() {
                    grouped.entry(mods.len()).or_default().push((
                        *mass,
                        ProteinPair {
                            start: start as u32,
                            end: end as u32,
                            mods: mods.clone(),
                        },
                    ));
                }
                partial = next;
            }
        }

        let mut by_mod_count: Vec<Vec<DistanceBucket<ProteinPair>>> =
            vec![Vec::new(); max_mods + 1];
        for (mod_count, items) in grouped {
            by_mod_count[mod_count] = group_by_distance(items);
        }
        let out = ProteinDistanceBuckets { by_mod_count };
        debug!(
            "Protein distance buckets: {} pairs up to {} mods",
            out.num_pairs(),
            max_mods
        );
        out
    }
}

/// Builds a [`ProteinGraph`] from dalton residue masses and optional
/// variable modifications.
///
/// ```
/// use massgraph::{MassScale, ProteinGraphBuilder};
///
/// let scale = MassScale::try_new(1.0).unwrap();
/// let graph = ProteinGraphBuilder::new(scale)
///     .residues(&[100.0, 100.0, 100.0])
///     .variable_mod(1, 21, 80.0)
///     .build()
///     .unwrap();
/// assert_eq!(graph.num_vertices(), 4);
/// assert_eq!(graph.edges(1).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ProteinGraphBuilder {
    scale: MassScale,
    residues: Vec<f64>,
    mods: Vec<(usize, u16, f64)>,
}

impl ProteinGraphBuilder {
    pub fn new(scale: MassScale) -> Self {
        Self {
            scale,
            residues: Vec::new(),
            mods: Vec::new(),
        }
    }

    pub fn residues(mut self, masses: &[f64]) -> Self {
        self.residues.extend_from_slice(masses);
        self
    }

    pub fn variable_mod(mut self, position: usize, ptm: u16, mass_shift: f64) -> Self {
        self.mods.push((position, ptm, mass_shift));
        self
    }

    pub fn build(self) -> Result<ProteinGraph> {
        let mut positions = Vec::with_capacity(self.residues.len());
        for &mass in self.residues.iter() {
            let scaled = self.scale.try_to_scaled(mass, "residue mass")?;
            positions.push(vec![ResidueEdge::unmodified(scaled)]);
        }
        for (position, ptm, shift) in self.mods {
            if position >= positions.len() {
                return Err(GraphInputError::ModificationOutOfBounds {
                    position,
                    num_positions: positions.len(),
                });
            }
            let mass = self
                .scale
                .try_to_scaled(self.residues[position] + shift, "modified residue mass")?;
            positions[position].push(ResidueEdge {
                mass,
                mods: vec![ModSite {
                    ptm,
                    position: position as u16,
                }],
            });
        }
        ProteinGraph::try_new(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_black_mass() {
        let graph = ProteinGraph::from_scaled_residues(&[100, 120, 80]).unwrap();
        assert_eq!(graph.num_vertices(), 4);
        assert_eq!(graph.prefix_masses(), &[0, 100, 220, 300]);
        assert_eq!(graph.black_mass(1, 3), 200);
        assert_eq!(graph.total_mass(), 300);
    }

    #[test]
    fn test_unmodified_buckets() {
        let graph = ProteinGraph::from_scaled_residues(&[100, 100, 100]).unwrap();
        let buckets = graph.distance_buckets(0, None);
        let zero = buckets.buckets(0);
        let dists: Vec<i32> = zero.iter().map(|b| b.dist).collect();
        assert_eq!(dists, vec![100, 200, 300]);
        assert_eq!(zero[0].pairs.len(), 3);
        assert_eq!(zero[2].pairs.len(), 1);
    }

    #[test]
    fn test_modified_buckets_respect_limits() {
        let graph = ProteinGraphBuilder::new(MassScale::try_new(1.0).unwrap())
            .residues(&[100.0, 100.0])
            .variable_mod(0, 7, 10.0)
            .variable_mod(1, 7, 10.0)
            .build()
            .unwrap();

        let one = graph.distance_buckets(1, None);
        // Two mods on the same path exceed the limit.
        assert!(one.buckets(1).iter().all(|b| b.dist != 220));
        let mod_dists: Vec<i32> = one.buckets(1).iter().map(|b| b.dist).collect();
        assert_eq!(mod_dists, vec![110, 210]);
        assert_eq!(one.buckets(1)[1].pairs.len(), 2);

        let two = graph.distance_buckets(2, Some(205));
        assert!(two.buckets(2).is_empty());
        assert_eq!(two.max_dist(), Some(200));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            ProteinGraph::from_scaled_residues(&[]),
            Err(GraphInputError::EmptyProtein)
        );
        assert!(matches!(
            ProteinGraph::from_scaled_residues(&[100, 0]),
            Err(GraphInputError::NonPositiveResidueMass { position: 1, .. })
        ));
        let err = ProteinGraphBuilder::new(MassScale::default())
            .residues(&[100.0])
            .variable_mod(3, 1, 1.0)
            .build();
        assert!(matches!(
            err,
            Err(GraphInputError::ModificationOutOfBounds { position: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_position_without_unmodified_edge() {
        let modified_first = vec![
            vec![ResidueEdge::unmodified(100)],
            vec![ResidueEdge {
                mass: 130,
                mods: vec![ModSite {
                    ptm: 1,
                    position: 1,
                }],
            }],
        ];
        assert_eq!(
            ProteinGraph::try_new(modified_first),
            Err(GraphInputError::MissingUnmodifiedEdge { position: 1 })
        );
        assert_eq!(
            ProteinGraph::try_new(vec![vec![ResidueEdge::unmodified(100)], Vec::new()]),
            Err(GraphInputError::MissingUnmodifiedEdge { position: 1 })
        );
    }
}
