//! Genetic optimizer: one generation of evaluation, elite retention,
//! roulette crossover, and pair-swap mutation, plus the per-slice driver.

use crate::score::{entrywise_norm, quality_absdiff, ranks_descending};
use crate::solution::ClusterSolution;
use faultline_core::{Matrix, PolarizationResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Parameters of a genetic run, fixed per slice.
#[derive(Debug, Clone, Copy)]
pub struct GeneticParams {
    pub num_parents: usize,
    pub num_clusters: usize,
    pub num_iterations: usize,
    pub elite_share: f64,
    pub mutation_share: f64,
    pub normalize: bool,
}

/// Number of iterations a rounded quality triple must stay flat before the
/// driver declares convergence.
const CONVERGENCE_WINDOW: usize = 10;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One generation: evaluates the parents, carries the elites into the child
/// list, fills it up by hybrid-roulette crossover, and mutates the
/// non-elite children in place.
///
/// Returns the children and the quality vector of the parent generation.
pub fn genetic_iteration(
    parents: &[ClusterSolution],
    congruence: &[Vec<f64>],
    conflict: &[Vec<f64>],
    params: &GeneticParams,
    rng: &mut StdRng,
) -> (Vec<ClusterSolution>, Vec<f64>) {
    let num_parents = parents.len();
    let n = congruence.len();
    let num_elites = ((params.elite_share * num_parents as f64).round() as usize).max(1);
    let num_mutations = (params.mutation_share * n as f64 / 2.0).round() as usize;

    let q: Vec<f64> = parents
        .iter()
        .map(|p| {
            quality_absdiff(
                p.memberships(),
                congruence,
                conflict,
                params.normalize,
                params.num_clusters,
            )
        })
        .collect();

    let mut children = elite_retention(parents, &q, num_elites);
    crossover_step(parents, &q, &mut children, num_parents, params, rng);
    mutation_step(&mut children, num_elites, num_mutations, rng);

    (children, q)
}

/// Clones the `num_elites` best parents into a fresh child list.
fn elite_retention(
    parents: &[ClusterSolution],
    q: &[f64],
    num_elites: usize,
) -> Vec<ClusterSolution> {
    let ranks = ranks_descending(q);
    parents
        .iter()
        .zip(ranks)
        .filter(|(_, rank)| *rank < num_elites)
        .map(|(parent, _)| parent.clone())
        .collect()
}

/// Fills the child list up to `num_parents` by crossover. The first parent
/// is drawn by roulette over the shifted quality scores; the second by a
/// fair coin between another roulette draw and a uniform draw, rerolled
/// until it differs from the first.
fn crossover_step(
    parents: &[ClusterSolution],
    q: &[f64],
    children: &mut Vec<ClusterSolution>,
    num_parents: usize,
    params: &GeneticParams,
    rng: &mut StdRng,
) {
    // shift scores to a non-negative wheel with positive total
    let mut wheel: Vec<f64> = q.to_vec();
    let minimum = wheel.iter().cloned().fold(f64::INFINITY, f64::min);
    if minimum < 0.0 {
        for w in &mut wheel {
            *w -= minimum;
        }
    }
    let mut total: f64 = wheel.iter().sum();
    if total == 0.0 {
        wheel.iter_mut().for_each(|w| *w = 1.0);
        total = wheel.len() as f64;
    }

    let spin = |rng: &mut StdRng| -> usize {
        let r = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (i, &w) in wheel.iter().enumerate() {
            cumulative += w;
            if r <= cumulative {
                return i;
            }
        }
        wheel.len() - 1
    };

    while children.len() < num_parents {
        let first = spin(rng);
        let mut second = first;
        while second == first {
            second = if rng.gen_bool(0.5) {
                spin(rng)
            } else {
                rng.gen_range(0..parents.len())
            };
        }

        let n = parents[first].num_nodes();
        let memberships = parents[first].crossover(parents[second].memberships(), rng);
        match ClusterSolution::from_memberships(n, params.num_clusters, memberships) {
            Ok(child) => children.push(child),
            Err(e) => {
                log::error!("Discarding invalid crossover offspring: {}", e);
                children.push(ClusterSolution::random(n, params.num_clusters, rng));
            }
        }
    }
}

/// Swaps `num_mutations` unique cross-cluster membership pairs in every
/// non-elite child. Swapping members of different clusters preserves the
/// balanced partition.
fn mutation_step(
    children: &mut [ClusterSolution],
    num_elites: usize,
    num_mutations: usize,
    rng: &mut StdRng,
) {
    if num_mutations == 0 {
        return;
    }

    for child in children.iter_mut().skip(num_elites) {
        let n = child.num_nodes();
        let counts = child.counts();
        // number of unordered cross-cluster pairs bounds the unique draws
        let cross_pairs =
            (n * n - counts.iter().map(|&s| s * s).sum::<usize>()) / 2;
        let target = num_mutations.min(cross_pairs);

        let mut pairs: HashSet<(usize, usize)> = HashSet::with_capacity(target);
        {
            let memberships = child.memberships();
            while pairs.len() < target {
                let first = rng.gen_range(0..n);
                let second = rng.gen_range(0..n);
                if first != second && memberships[first] != memberships[second] {
                    pairs.insert((first.min(second), first.max(second)));
                }
            }
        }

        let memberships = child.memberships_mut();
        for (first, second) in pairs {
            memberships.swap(first, second);
        }
    }
}

/// Runs the genetic algorithm for a single time slice.
///
/// Slices that are too small or empty (`N <= K` or both matrix norms zero)
/// yield the degenerate result. The per-iteration spread statistic follows
/// the published series: `sdQ = Σ_p sqrt((q_p - avgQ)² / P)`, which is not
/// the sample standard deviation (the outer square root is missing).
pub fn genetic_time_step(
    congruence: &Matrix,
    conflict: &Matrix,
    params: &GeneticParams,
    seed: u64,
) -> PolarizationResult {
    let n = congruence.dim();
    if conflict.dim() != n {
        log::error!(
            "Congruence and conflict matrices disagree in dimension ({} vs {}); skipping slice",
            n,
            conflict.dim()
        );
        return PolarizationResult::degenerate(
            congruence.start,
            congruence.stop,
            congruence.midpoint,
        );
    }

    let combined_norm = entrywise_norm(&congruence.values) + entrywise_norm(&conflict.values);
    if n <= params.num_clusters || combined_norm == 0.0 {
        return PolarizationResult::degenerate(
            congruence.start,
            congruence.stop,
            congruence.midpoint,
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let num_parents = params.num_parents;

    let mut parents: Vec<ClusterSolution> = (0..num_parents)
        .map(|_| ClusterSolution::random(n, params.num_clusters, &mut rng))
        .collect();

    let mut max_q_series = Vec::with_capacity(params.num_iterations);
    let mut avg_q_series = Vec::with_capacity(params.num_iterations);
    let mut sd_q_series = Vec::with_capacity(params.num_iterations);
    let mut best_memberships: Vec<usize> = Vec::new();
    let mut early_convergence = false;

    for i in 0..params.num_iterations {
        let (children, q) = genetic_iteration(
            &parents,
            &congruence.values,
            &conflict.values,
            params,
            &mut rng,
        );

        let mut max_q = f64::NEG_INFINITY;
        let mut max_index = 0;
        let mut avg_q = 0.0;
        for (j, &score) in q.iter().enumerate() {
            avg_q += score;
            if score > max_q {
                max_q = score;
                max_index = j;
            }
        }
        avg_q /= num_parents as f64;

        let sd_q: f64 = q
            .iter()
            .map(|&score| ((score - avg_q) * (score - avg_q) / num_parents as f64).sqrt())
            .sum();

        best_memberships = parents[max_index].memberships().to_vec();
        max_q_series.push(max_q);
        avg_q_series.push(avg_q);
        sd_q_series.push(sd_q);

        parents = children;

        // converged once the rounded quality triple has been flat for a
        // full window
        if i >= CONVERGENCE_WINDOW
            && round2(sd_q) == 0.0
            && round2(max_q) == round2(avg_q)
        {
            let flat = (i - CONVERGENCE_WINDOW..i).all(|j| {
                round2(max_q_series[j]) == round2(max_q)
                    && round2(avg_q_series[j]) == round2(avg_q)
                    && round2(sd_q_series[j]) == 0.0
            });
            if flat {
                early_convergence = true;
                break;
            }
        }
    }

    // drop the trailing plateau: keep history up to the first iteration
    // that already attained the final best quality
    let last_index = max_q_series.len() - 1;
    let final_max = max_q_series[last_index];
    let mut final_index = last_index;
    while final_index > 0 && max_q_series[final_index - 1] == final_max {
        final_index -= 1;
    }
    max_q_series.truncate(final_index + 1);
    avg_q_series.truncate(final_index + 1);
    sd_q_series.truncate(final_index + 1);

    PolarizationResult {
        max_q: final_max,
        max_q_series,
        avg_q_series,
        sd_q_series,
        memberships: best_memberships,
        row_names: congruence.row_names.clone(),
        early_convergence,
        start: congruence.start,
        stop: congruence.stop,
        midpoint: congruence.midpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn matrix(values: Vec<Vec<f64>>) -> Matrix {
        let n = values.len();
        let row_names = (0..n).map(|i| format!("node {}", i)).collect();
        Matrix {
            values,
            row_names,
            start: ts(1),
            midpoint: ts(5),
            stop: ts(9),
        }
    }

    fn params() -> GeneticParams {
        GeneticParams {
            num_parents: 20,
            num_clusters: 2,
            num_iterations: 200,
            elite_share: 0.1,
            mutation_share: 0.1,
            normalize: true,
        }
    }

    fn block_congruence() -> Matrix {
        matrix(vec![
            vec![0.0, 2.0, 0.0, 0.0, 0.0, 0.0],
            vec![2.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 3.0, 0.0, 0.0],
            vec![0.0, 0.0, 3.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        ])
    }

    fn zeros(n: usize) -> Matrix {
        matrix(vec![vec![0.0; n]; n])
    }

    #[test]
    fn test_iteration_preserves_population_size_and_balance() {
        let g = block_congruence();
        let c = zeros(6);
        let p = params();
        let mut rng = StdRng::seed_from_u64(5);
        let parents: Vec<ClusterSolution> = (0..p.num_parents)
            .map(|_| ClusterSolution::random(6, 2, &mut rng))
            .collect();

        let (children, q) = genetic_iteration(&parents, &g.values, &c.values, &p, &mut rng);
        assert_eq!(children.len(), p.num_parents);
        assert_eq!(q.len(), p.num_parents);
        for child in &children {
            let counts = child.counts();
            assert_eq!(counts.iter().sum::<usize>(), 6);
            assert!(counts.iter().max().unwrap() - counts.iter().min().unwrap() <= 1);
        }
    }

    #[test]
    fn test_elites_survive_unchanged() {
        let g = block_congruence();
        let c = zeros(6);
        let p = params();
        let mut rng = StdRng::seed_from_u64(6);
        let parents: Vec<ClusterSolution> = (0..p.num_parents)
            .map(|_| ClusterSolution::random(6, 2, &mut rng))
            .collect();
        let (children, q) = genetic_iteration(&parents, &g.values, &c.values, &p, &mut rng);

        // numElites = max(1, round(0.1 * 20)) = 2: the two best parents are
        // cloned verbatim to the head of the child list
        let ranks = ranks_descending(&q);
        let elites: Vec<&ClusterSolution> = parents
            .iter()
            .zip(&ranks)
            .filter(|(_, &rank)| rank < 2)
            .map(|(parent, _)| parent)
            .collect();
        assert_eq!(&children[0], elites[0]);
        assert_eq!(&children[1], elites[1]);
    }

    #[test]
    fn test_max_q_is_monotonic() {
        let g = block_congruence();
        let c = zeros(6);
        let result = genetic_time_step(&g, &c, &params(), 42);
        for window in result.max_q_series.windows(2) {
            assert!(
                window[1] >= window[0] - 1e-12,
                "max quality decreased: {:?}",
                window
            );
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let g = block_congruence();
        let c = zeros(6);
        let a = genetic_time_step(&g, &c, &params(), 99);
        let b = genetic_time_step(&g, &c, &params(), 99);
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_when_too_small() {
        let g = zeros(2);
        let c = zeros(2);
        let result = genetic_time_step(&g, &c, &params(), 1);
        assert!(result.is_degenerate());
        assert_eq!(result.max_q_series, vec![0.0]);
    }

    #[test]
    fn test_degenerate_when_norms_zero() {
        let g = zeros(6);
        let c = zeros(6);
        let result = genetic_time_step(&g, &c, &params(), 1);
        assert!(result.is_degenerate());
    }

    #[test]
    fn test_history_trim_removes_trailing_plateau() {
        let g = block_congruence();
        let c = zeros(6);
        let result = genetic_time_step(&g, &c, &params(), 7);
        let last = *result.max_q_series.last().unwrap();
        assert_eq!(result.max_q, last);
        // the value before the trimmed head of the plateau must differ
        if result.max_q_series.len() >= 2 {
            let prev = result.max_q_series[result.max_q_series.len() - 2];
            assert_ne!(prev, last);
        }
        assert_eq!(result.max_q_series.len(), result.avg_q_series.len());
        assert_eq!(result.max_q_series.len(), result.sd_q_series.len());
    }

    #[test]
    fn test_memberships_match_reported_quality() {
        let g = block_congruence();
        let c = zeros(6);
        let p = params();
        let result = genetic_time_step(&g, &c, &p, 3);
        let q = quality_absdiff(&result.memberships, &g.values, &c.values, true, 2);
        assert!((q - result.max_q).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_degrades_slice() {
        let g = block_congruence();
        let c = zeros(4);
        let result = genetic_time_step(&g, &c, &params(), 1);
        assert!(result.is_degenerate());
    }
}
