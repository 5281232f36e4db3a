use crate::errors::{
    AlignError,
    ConfigError,
};
use massgraph::{
    MassScale,
    models::mass::DEFAULT_CONVERT_RATIO,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::path::Path;

/// Engine configuration.
///
/// Every field has a default, so a JSON file only needs the values that
/// differ:
///
/// ```
/// use graphalign::config::{AlignConfig, AlignMode};
///
/// let config = AlignConfig::from_json_str(
///     r#"{"mode": {"type": "single_path"}, "max_head_diff": 4}"#,
/// ).unwrap();
/// assert_eq!(config.mode, AlignMode::SinglePath);
/// assert_eq!(config.max_head_diff, 4);
/// assert_eq!(config.max_known_mods, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignConfig {
    pub mode: AlignMode,
    pub max_known_mods: usize,
    /// Only used by the single-path mode.
    pub max_unknown_shifts: usize,
    /// In daltons.
    pub min_consistent_dist: f64,
    /// Minimum chain length an end state needs to count as an alignment.
    pub alignment_threshold: i32,
    /// Extra spectrum vertices, counted down from the last one, that may
    /// also terminate an alignment.
    pub terminal_span: usize,
    /// Maximum protein position divergence between the two paths while
    /// they sit on the same spectrum vertex.
    pub max_head_diff: usize,
    pub convert_ratio: f64,
    pub pair_search: PairSearch,
    pub abundance_grid: AbundanceGrid,
    pub legacy: LegacyConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum AlignMode {
    #[default]
    #[serde(rename = "dual_path")]
    DualPath,
    #[serde(rename = "single_path")]
    SinglePath,
}

/// How spectrum distances are scanned for every protein distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum PairSearch {
    /// Scans the full window implied by the widest tolerance windows.
    #[default]
    #[serde(rename = "exact")]
    Exact,
    /// Sliding pointer with an adaptive cutoff of `lookahead` buckets past
    /// the last tentative match.
    #[serde(rename = "lookahead")]
    Lookahead {
        #[serde(default = "default_lookahead")]
        lookahead: usize,
    },
}

fn default_lookahead() -> usize {
    5
}

/// Percent grid swept for both abundances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbundanceGrid {
    pub min_percent: u32,
    pub max_percent: u32,
    pub step_percent: u32,
}

impl Default for AbundanceGrid {
    fn default() -> Self {
        Self {
            min_percent: 1,
            max_percent: 99,
            step_percent: 1,
        }
    }
}

impl AbundanceGrid {
    pub fn percents(&self) -> impl Iterator<Item = u32> + Clone + '_ {
        (self.min_percent..=self.max_percent).step_by(self.step_percent.max(1) as usize)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LegacyConfig {
    /// Global pair tolerance in daltons.
    pub tolerance: f64,
    /// Largest unexpected shift, in daltons, accepted between diagonals.
    pub max_ptm_mass: f64,
    /// Only start alignments at the protein N-terminus (or after a removed
    /// initial methionine).
    pub whole_protein_only: bool,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_ptm_mass: 500.0,
            whole_protein_only: false,
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            mode: AlignMode::default(),
            max_known_mods: 2,
            max_unknown_shifts: 1,
            min_consistent_dist: 50.0,
            alignment_threshold: 3,
            terminal_span: 0,
            max_head_diff: 3,
            convert_ratio: DEFAULT_CONVERT_RATIO,
            pair_search: PairSearch::default(),
            abundance_grid: AbundanceGrid::default(),
            legacy: LegacyConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> AlignError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
    .into()
}

impl AlignConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AlignError> {
        let config: AlignConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parsing { source: e })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AlignError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReading {
            source: e,
            path: path.to_path_buf(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        self.scale()?;
        if !self.min_consistent_dist.is_finite() || self.min_consistent_dist < 0.0 {
            return Err(invalid("min_consistent_dist", "must be a finite, non-negative mass"));
        }
        if self.alignment_threshold < 1 {
            return Err(invalid("alignment_threshold", "must be at least 1"));
        }
        let grid = &self.abundance_grid;
        if grid.min_percent == 0 || grid.min_percent > grid.max_percent || grid.max_percent >= 100 {
            return Err(invalid(
                "abundance_grid",
                format!("expected 1 <= min <= max <= 99, got {:?}", grid),
            ));
        }
        if grid.step_percent == 0 {
            return Err(invalid("abundance_grid", "step must be positive"));
        }
        if let PairSearch::Lookahead { lookahead } = self.pair_search {
            if lookahead == 0 {
                return Err(invalid("pair_search", "lookahead must be positive"));
            }
        }
        if !self.legacy.tolerance.is_finite() || self.legacy.tolerance < 0.0 {
            return Err(invalid("legacy.tolerance", "must be a finite, non-negative mass"));
        }
        if !self.legacy.max_ptm_mass.is_finite() || self.legacy.max_ptm_mass < 0.0 {
            return Err(invalid("legacy.max_ptm_mass", "must be a finite, non-negative mass"));
        }
        Ok(())
    }

    pub fn scale(&self) -> Result<MassScale, AlignError> {
        Ok(MassScale::try_new(self.convert_ratio)?)
    }

    pub fn scaled_min_consistent_dist(&self, scale: &MassScale) -> i32 {
        scale.to_scaled(self.min_consistent_dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let config = AlignConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = AlignConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_pair_search_variants() {
        let config = AlignConfig::from_json_str(
            r#"{"pair_search": {"type": "lookahead", "lookahead": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.pair_search, PairSearch::Lookahead { lookahead: 5 });
    }

    #[test]
    fn test_rejects_bad_grid() {
        let res = AlignConfig::from_json_str(
            r#"{"abundance_grid": {"min_percent": 0, "max_percent": 99, "step_percent": 1}}"#,
        );
        assert!(matches!(
            res,
            Err(AlignError::Config(ConfigError::Invalid {
                field: "abundance_grid",
                ..
            }))
        ));
        let res = AlignConfig::from_json_str(r#"{"convert_ratio": -1.0}"#);
        assert!(matches!(res, Err(AlignError::GraphInput(_))));
    }

    #[test]
    fn test_grid_percents() {
        let grid = AbundanceGrid {
            min_percent: 10,
            max_percent: 30,
            step_percent: 10,
        };
        assert_eq!(grid.percents().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(AbundanceGrid::default().percents().count(), 99);
    }
}
