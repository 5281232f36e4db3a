mod common;

use common::*;
use graphalign::alignment::{
    AlignmentTable,
    StateKey,
};
use graphalign::backtrack::{
    BacktrackGraph,
    EndCriteria,
    VertexId,
};
use graphalign::config::PairSearch;
use graphalign::consistent_pairs::is_consistent;
use graphalign::tolerance_window::ToleranceWindows;
use graphalign::{
    AlignmentCase,
    AlignmentPipeline,
};
use massgraph::{
    ProteinGraph,
    SpectrumGraph,
    SpectrumPair,
    SpectrumPeak,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{
    BTreeSet,
    HashMap,
    HashSet,
};

const NUM_CASES: usize = 40;
const MAX_MODS: usize = 1;

fn random_case(rng: &mut ChaCha8Rng) -> (ProteinGraph, SpectrumGraph) {
    let num_residues = rng.gen_range(3..7);
    let residues: Vec<f64> = (0..num_residues)
        .map(|_| rng.gen_range(57..190) as f64)
        .collect();
    let mut mods = Vec::new();
    for position in 0..num_residues {
        if rng.gen_bool(0.3) {
            mods.push((position, position as u16, rng.gen_range(1..40) as f64));
        }
    }
    let protein = modified_protein(&residues, &mods);

    let mut masses = BTreeSet::from([0]);
    let mut prefix = 0;
    for &r in residues.iter() {
        prefix += r as i32;
        if rng.gen_bool(0.8) {
            masses.insert(prefix + rng.gen_range(-2..=2));
        }
    }
    for _ in 0..rng.gen_range(0..3) {
        masses.insert(rng.gen_range(1..prefix + 50));
    }
    let peaks = masses
        .into_iter()
        .map(|mass| SpectrumPeak {
            mass,
            intensity: rng.gen_range(1.0..100.0),
            delta: if mass == 0 { 0 } else { rng.gen_range(0..=3) },
        })
        .collect();
    (protein, SpectrumGraph::new(peaks).unwrap())
}

/// Every protein sub-path mass with at most `MAX_MODS` modifications.
fn sub_path_masses(protein: &ProteinGraph) -> HashMap<(u32, u32), HashSet<i32>> {
    let mut out: HashMap<(u32, u32), HashSet<i32>> = HashMap::new();
    let buckets = protein.distance_buckets(MAX_MODS, None);
    for bucket in buckets.by_mod_count.iter().flat_map(|b| b.iter()) {
        for pair in bucket.pairs.iter() {
            out.entry((pair.start, pair.end)).or_default().insert(bucket.dist);
        }
    }
    out
}

fn state_mass(windows: &ToleranceWindows, state: StateKey) -> i32 {
    windows.window(state.j as usize).lo() + state.k as i32
}

fn all_states(protein: &ProteinGraph, windows: &ToleranceWindows) -> Vec<StateKey> {
    let mut out = Vec::new();
    for i in 0..protein.num_vertices() {
        for j in 0..windows.len() {
            for k in 0..windows.width(j) {
                out.push(StateKey::new(i, j, k));
            }
        }
    }
    out
}

#[test]
fn test_resolved_windows_never_overlap() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..200 {
        let n = rng.gen_range(1..30);
        let mut masses = vec![0];
        let mut deltas = vec![0];
        for _ in 1..n {
            let last = *masses.last().unwrap();
            masses.push(last + rng.gen_range(1..40));
            deltas.push(rng.gen_range(0..25));
        }
        let windows = ToleranceWindows::resolve(&masses, &deltas).unwrap();
        for j in 0..n {
            assert!(windows.delta_l(j) >= 0 && windows.delta_r(j) >= 0);
            assert!(windows.mass(j) - windows.delta_l(j) >= 0);
        }
        for j in 1..n {
            assert!(
                windows.mass(j - 1) + windows.delta_r(j - 1) < windows.mass(j) - windows.delta_l(j),
                "overlap at {} for {:?} / {:?}",
                j,
                masses,
                deltas
            );
        }
    }
}

#[test]
fn test_pair_index_matches_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..NUM_CASES {
        let (protein, spec) = random_case(&mut rng);
        let windows = windows_for(&spec);
        let masses = sub_path_masses(&protein);

        let mut expected = BTreeSet::new();
        for (&(p1, p2), path_masses) in masses.iter() {
            for &mass in path_masses {
                for j1 in 0..spec.len() {
                    for j2 in (j1 + 1)..spec.len() {
                        let pair = SpectrumPair {
                            start: j1 as u32,
                            end: j2 as u32,
                        };
                        if is_consistent(&windows, mass, &pair) {
                            expected.insert((p2 as usize, j2, mass, p1, j1 as u32));
                        }
                    }
                }
            }
        }

        let collect = |search| {
            let index = pair_index(&protein, &spec, &windows, MAX_MODS, search);
            let mut found = BTreeSet::new();
            for (i, j, group) in index.iter() {
                for start in group.starts.iter() {
                    found.insert((i, j, group.mass, start.protein, start.spectrum));
                }
            }
            found
        };
        let exact = collect(PairSearch::Exact);
        assert_eq!(exact, expected);
        let lookahead = collect(PairSearch::Lookahead { lookahead: 5 });
        assert!(lookahead.is_subset(&exact));
    }
}

#[test]
fn test_table_matches_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..NUM_CASES {
        let (protein, spec) = random_case(&mut rng);
        let windows = windows_for(&spec);
        let masses = sub_path_masses(&protein);
        let index = pair_index(&protein, &spec, &windows, MAX_MODS, PairSearch::Exact);
        let table = AlignmentTable::compute(&index, &windows);

        // States in (i, j, k) order: predecessors always come first.
        let states = all_states(&protein, &windows);
        let mut scores: HashMap<StateKey, i32> = HashMap::new();
        for &state in states.iter() {
            if state == StateKey::ROOT {
                scores.insert(state, 1);
                continue;
            }
            let mut best = -1;
            let mut preds = Vec::new();
            for &prev in states.iter() {
                if prev.i >= state.i || prev.j >= state.j {
                    continue;
                }
                let prev_score = scores.get(&prev).copied().unwrap_or(-1);
                if prev_score <= 0 {
                    continue;
                }
                let mass = state_mass(&windows, state) - state_mass(&windows, prev);
                let pair = SpectrumPair {
                    start: prev.j,
                    end: state.j,
                };
                let reachable = masses
                    .get(&(prev.i, state.i))
                    .is_some_and(|m| m.contains(&mass));
                if !reachable || !is_consistent(&windows, mass, &pair) {
                    continue;
                }
                if prev_score + 1 > best {
                    best = prev_score + 1;
                    preds.clear();
                }
                if prev_score + 1 == best {
                    preds.push(prev);
                }
            }
            scores.insert(state, best);

            assert_eq!(table.score(state), best, "score of {:?}", state);
            let mut got: Vec<StateKey> =
                table.predecessors(state).iter().map(|p| p.state).collect();
            got.sort();
            preds.sort();
            assert_eq!(got, preds, "predecessors of {:?}", state);
            for p in table.predecessors(state) {
                assert_eq!(table.score(p.state) + 1, table.score(state));
            }
        }
    }
}

#[test]
fn test_backtrack_graph_is_sound() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut num_built = 0;
    for _ in 0..NUM_CASES {
        let (protein, spec) = random_case(&mut rng);
        let windows = windows_for(&spec);
        let index = pair_index(&protein, &spec, &windows, MAX_MODS, PairSearch::Exact);
        let table = AlignmentTable::compute(&index, &windows);
        let criteria = EndCriteria {
            threshold: 2,
            terminal_span: 1,
        };
        let Some(dag) = BacktrackGraph::build(&table, &windows, &protein, &spec, criteria) else {
            continue;
        };
        num_built += 1;

        let mut seen: HashSet<VertexId> = dag.ends().iter().copied().collect();
        let mut stack: Vec<VertexId> = dag.ends().to_vec();
        while let Some(v) = stack.pop() {
            for (_, prev) in dag.predecessors(v) {
                if seen.insert(prev) {
                    stack.push(prev);
                }
            }
        }
        assert_eq!(seen.len(), dag.num_vertices());
        assert_eq!(dag.vertex(dag.root()).state, StateKey::ROOT);

        for edge in dag.edges() {
            let source = dag.vertex(edge.source);
            let target = dag.vertex(edge.target);
            assert_eq!(source.layer + 1, target.layer);
            assert!(
                table
                    .predecessors(target.state)
                    .iter()
                    .any(|p| p.state == source.state && p.mass == edge.exact_mass)
            );
        }
    }
    assert!(num_built > 0);
}

#[test]
fn test_pipeline_is_idempotent() {
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let config = graphalign::AlignConfig {
        alignment_threshold: 2,
        terminal_span: 1,
        ..unit_config()
    };
    let pipeline = AlignmentPipeline::new(config).unwrap();
    for _ in 0..NUM_CASES {
        let (protein, spectrum) = random_case(&mut rng);
        let case = AlignmentCase { protein, spectrum };
        let first = pipeline.align(&case).unwrap();
        let second = pipeline.align(&case).unwrap();
        assert_eq!(first, second);
    }
}
