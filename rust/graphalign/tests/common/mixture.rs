//! Two-proteoform mixture spectra.
//!
//! Each proteoform contributes its prefix-mass ladder at its own intensity;
//! a mass both ladders share carries the sum of both.

use super::spectrum;
use massgraph::SpectrumGraph;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Prefix masses (root excluded) of scaled residues carrying `(position, shift)`.
pub fn prefix_masses(residues: &[i32], shifts: &[(usize, i32)]) -> Vec<i32> {
    let mut out = Vec::with_capacity(residues.len());
    let mut total = 0;
    for (position, &mass) in residues.iter().enumerate() {
        total += mass;
        total += shifts
            .iter()
            .filter(|(p, _)| *p == position)
            .map(|(_, shift)| shift)
            .sum::<i32>();
        out.push(total);
    }
    out
}

#[derive(Debug, Clone)]
pub struct Mixture {
    peaks: BTreeMap<i32, f64>,
}

impl Mixture {
    pub fn new(first: &[i32], second: &[i32], q1: f64, q2: f64) -> Self {
        let mut peaks = BTreeMap::new();
        for &mass in first {
            *peaks.entry(mass).or_insert(0.0) += q1;
        }
        for &mass in second {
            *peaks.entry(mass).or_insert(0.0) += q2;
        }
        Self { peaks }
    }

    /// Drops every peak but the heaviest with probability `prob`.
    pub fn drop_random(mut self, rng: &mut ChaCha8Rng, prob: f64) -> Self {
        let heaviest = self.peaks.keys().next_back().copied();
        self.peaks
            .retain(|mass, _| Some(*mass) == heaviest || !rng.gen_bool(prob));
        self
    }

    pub fn without(mut self, mass: i32) -> Self {
        self.peaks.remove(&mass);
        self
    }

    /// Scales every intensity by a factor drawn from `[1 - rel, 1 + rel]`.
    pub fn jitter(mut self, rng: &mut ChaCha8Rng, rel: f64) -> Self {
        for intensity in self.peaks.values_mut() {
            *intensity *= 1.0 + rng.gen_range(-rel..=rel);
        }
        self
    }

    pub fn masses(&self) -> Vec<i32> {
        self.peaks.keys().copied().collect()
    }

    /// Spectrum with a zero-intensity root and exact (zero width) tolerances.
    pub fn spectrum(&self) -> SpectrumGraph {
        let mut masses = vec![0];
        let mut intensities = vec![0.0];
        for (&mass, &intensity) in self.peaks.iter() {
            masses.push(mass);
            intensities.push(intensity);
        }
        spectrum(&masses, &intensities, 0)
    }
}
