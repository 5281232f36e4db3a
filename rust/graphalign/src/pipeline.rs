//! Per-spectrum alignment pipeline and its batch driver.
//!
//! # Stages
//!
//! Dual-path mode runs, for one protein/spectrum pair:
//!
//! 1. **Tolerance**: resolve disjoint per-peak windows.
//! 2. **Pairs**: bucket protein and spectrum distances and index consistent
//!    pairs by their end vertices.
//! 3. **DP**: fill the score table with tie-preserving predecessor sets.
//! 4. **Backtrack**: materialize the DAG of best chains ending at the last
//!    protein vertex, or report "not found".
//! 5. **Quantify**: split the DAG into two abundance-weighted paths.
//!
//! Single-path mode replaces stages 2 to 5 with the global-tolerance
//! alignment of [`crate::legacy`].
//!
//! Each stage's inputs are dropped as soon as the next stage has consumed
//! them, so only one large table is alive at a time.
//!
//! # Buffer reuse
//!
//! [`AlignmentPipeline::process_case`] takes a `&mut QuantBuffers`; the batch
//! driver creates one per worker thread with `map_init`.

use crate::accumulator::AlignmentAccumulator;
use crate::alignment::AlignmentTable;
use crate::backtrack::{
    BacktrackGraph,
    EndCriteria,
};
use crate::config::{
    AlignConfig,
    AlignMode,
};
use crate::consistent_pairs::ConsistentPairIndex;
use crate::errors::{
    AlignError,
    Result,
};
use crate::legacy::diagonal::HeaderContext;
use crate::legacy::{
    SinglePathAligner,
    SinglePathSettings,
    report_from_dag_path,
};
use crate::quant::{
    DualPathQuantifier,
    QuantBuffers,
    Quantification,
};
use crate::results::{
    DualPathReport,
    SinglePathReport,
};
use crate::timings::AlignTimings;
use crate::tolerance_window::ToleranceWindows;
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use massgraph::{
    MassScale,
    ProteinGraph,
    SpectrumGraph,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

#[cfg(not(feature = "serial"))]
use indicatif::ParallelProgressIterator;
#[cfg(not(feature = "serial"))]
use rayon::prelude::*;

#[cfg(feature = "serial")]
use indicatif::ProgressIterator;

/// One protein/spectrum pair to align.
#[derive(Debug, Clone)]
pub struct AlignmentCase {
    pub protein: ProteinGraph,
    pub spectrum: SpectrumGraph,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AlignmentOutcome {
    /// No end state reached the alignment threshold.
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "single_path")]
    SinglePath(SinglePathReport),
    #[serde(rename = "dual_path")]
    DualPath(DualPathReport),
}

impl AlignmentOutcome {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Outcome of one case of a batch, tagged with its position in the input.
#[derive(Debug)]
pub struct CaseResult {
    pub case_index: usize,
    pub outcome: Result<AlignmentOutcome>,
}

#[derive(Debug, Clone)]
pub struct AlignmentPipeline {
    config: AlignConfig,
    scale: MassScale,
}

impl AlignmentPipeline {
    pub fn new(config: AlignConfig) -> std::result::Result<Self, AlignError> {
        config.validate()?;
        let scale = config.scale()?;
        Ok(Self { config, scale })
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    pub fn scale(&self) -> MassScale {
        self.scale
    }

    /// Aligns a single case with fresh buffers.
    pub fn align(&self, case: &AlignmentCase) -> Result<AlignmentOutcome> {
        let mut timings = AlignTimings::default();
        self.process_case(case, &mut QuantBuffers::default(), &mut timings)
    }

    fn header_context<'a>(&self, case: &'a AlignmentCase) -> HeaderContext<'a> {
        HeaderContext {
            protein: &case.protein,
            spectrum: &case.spectrum,
            scale: self.scale,
            met_excision: self.config.legacy.whole_protein_only,
            tolerance: self.config.legacy.tolerance,
        }
    }

    fn single_path_settings(&self) -> SinglePathSettings {
        SinglePathSettings {
            max_known_mods: self.config.max_known_mods,
            max_unknown_shifts: self.config.max_unknown_shifts,
            tolerance: self.config.legacy.tolerance,
            min_dist: self.config.scaled_min_consistent_dist(&self.scale),
            max_ptm_mass: self.config.legacy.max_ptm_mass,
            whole_protein_only: self.config.legacy.whole_protein_only,
            threshold: self.config.alignment_threshold,
        }
    }

    pub fn process_case(
        &self,
        case: &AlignmentCase,
        buffers: &mut QuantBuffers,
        timings: &mut AlignTimings,
    ) -> Result<AlignmentOutcome> {
        if self.config.mode == AlignMode::SinglePath {
            let st = Instant::now();
            let aligner = SinglePathAligner::new(
                &case.protein,
                &case.spectrum,
                self.scale,
                self.single_path_settings(),
            );
            let out = match aligner.align() {
                Some(report) => AlignmentOutcome::SinglePath(report),
                None => AlignmentOutcome::NotFound,
            };
            timings.legacy += st.elapsed();
            return Ok(out);
        }

        let st = Instant::now();
        let windows = ToleranceWindows::resolve(&case.spectrum.masses(), &case.spectrum.deltas())?;
        timings.tolerance += st.elapsed();

        let st = Instant::now();
        let index = self.consistent_pairs(case, &windows);
        timings.pairs += st.elapsed();

        let st = Instant::now();
        let table = AlignmentTable::compute(&index, &windows);
        drop(index);
        timings.dp += st.elapsed();
        debug!("Best chain length {}", table.best_score());

        let st = Instant::now();
        let criteria = EndCriteria {
            threshold: self.config.alignment_threshold,
            terminal_span: self.config.terminal_span,
        };
        let dag = BacktrackGraph::build(&table, &windows, &case.protein, &case.spectrum, criteria);
        drop(table);
        timings.backtrack += st.elapsed();
        let Some(dag) = dag else {
            return Ok(AlignmentOutcome::NotFound);
        };

        let st = Instant::now();
        let quantifier = DualPathQuantifier {
            max_head_diff: self.config.max_head_diff,
            grid: self.config.abundance_grid,
        };
        let out = match quantifier.quantify_with(&dag, buffers)? {
            Quantification::Dual(report) => AlignmentOutcome::DualPath(report),
            Quantification::Identical => {
                debug!("Paths cannot diverge, reporting the best single path");
                let report =
                    report_from_dag_path(&dag, &dag.best_path(), &self.header_context(case));
                AlignmentOutcome::SinglePath(report)
            }
        };
        timings.quantify += st.elapsed();
        Ok(out)
    }

    fn consistent_pairs(
        &self,
        case: &AlignmentCase,
        windows: &ToleranceWindows,
    ) -> ConsistentPairIndex {
        let reach = windows.max_delta_l() + windows.max_delta_r();
        let min_dist = self.config.scaled_min_consistent_dist(&self.scale);
        let spec_max = windows.mass(windows.len() - 1);
        let protein_buckets = case
            .protein
            .distance_buckets(self.config.max_known_mods, Some(spec_max + reach));
        let prot_max = protein_buckets.max_dist().unwrap_or(0);
        let spectrum_buckets = case
            .spectrum
            .distance_buckets((min_dist - reach).max(1), prot_max + reach);
        ConsistentPairIndex::build(
            &protein_buckets,
            &spectrum_buckets,
            windows,
            case.protein.num_vertices(),
            min_dist,
            self.config.pair_search,
        )
    }

    /// Aligns every case; results come back in input order.
    ///
    /// Failed cases are logged and kept as errors, they never abort the batch.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip(self, cases), level = "trace")
    )]
    pub fn process_batch(&self, cases: &[AlignmentCase]) -> (Vec<CaseResult>, AlignTimings) {
        let num_cases = cases.len();
        let start = Instant::now();
        let bar = progress_bar(num_cases);

        let run = |(case_index, case): (usize, &AlignmentCase), buffers: &mut QuantBuffers| {
            let mut timings = AlignTimings::default();
            let outcome = self.process_case(case, buffers, &mut timings);
            if let Err(e) = &outcome {
                warn!("Case {} failed: {}", case_index, e);
            }
            (CaseResult { case_index, outcome }, timings)
        };

        #[cfg(not(feature = "serial"))]
        let results: AlignmentAccumulator = cases
            .par_iter()
            .enumerate()
            .progress_with(bar)
            .map_init(QuantBuffers::default, |buffers, item| run(item, buffers))
            .collect();

        #[cfg(feature = "serial")]
        let results: AlignmentAccumulator = {
            let mut buffers = QuantBuffers::default();
            cases
                .iter()
                .enumerate()
                .progress_with(bar)
                .map(|item| run(item, &mut buffers))
                .collect()
        };

        let (results, timings) = results.into_sorted();
        let elapsed = start.elapsed();
        let throughput = num_cases as f64 / elapsed.as_secs_f64();
        let found = results
            .iter()
            .filter(|r| r.outcome.as_ref().is_ok_and(|o| o.is_found()))
            .count();
        info!(
            "Aligning {} cases took: {:?} throughput: {:#.1}/s, found: {}",
            num_cases, elapsed, throughput, found
        );
        info!("{:?}", timings);
        (results, timings)
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    match ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    ) {
        Ok(style) => bar.with_style(style),
        Err(_) => bar,
    }
}
