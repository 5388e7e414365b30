//! Greedy optimizer: repeated membership pair-swap sweeps to a fixed point.

use crate::score::{entrywise_norm, quality_absdiff};
use crate::solution::ClusterSolution;
use faultline_core::{Matrix, PolarizationResult};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Runs the greedy membership swapping algorithm for a single time slice.
///
/// Starting from a random balanced partition, every cross-cluster pair swap
/// that strictly improves the quality is accepted immediately; sweeps repeat
/// until a full pass makes no change. Each accepted swap appends the new
/// quality to the trajectory, so the series is strictly increasing after its
/// first entry.
pub fn greedy_time_step(
    congruence: &Matrix,
    conflict: &Matrix,
    normalize: bool,
    num_clusters: usize,
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
    if n < num_clusters || combined_norm == 0.0 {
        return PolarizationResult::degenerate(
            congruence.start,
            congruence.stop,
            congruence.midpoint,
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let solution = ClusterSolution::random(n, num_clusters, &mut rng);
    let mut memberships = solution.memberships().to_vec();

    let mut current_q = quality_absdiff(
        &memberships,
        &congruence.values,
        &conflict.values,
        normalize,
        num_clusters,
    );
    let mut max_q_series = vec![current_q];
    let mut best_memberships = memberships.clone();

    loop {
        let mut changed = false;
        for i in 0..n {
            for j in (i + 1)..n {
                if memberships[i] == memberships[j] {
                    continue;
                }
                memberships.swap(i, j);
                let candidate_q = quality_absdiff(
                    &memberships,
                    &congruence.values,
                    &conflict.values,
                    normalize,
                    num_clusters,
                );
                if candidate_q > current_q {
                    current_q = candidate_q;
                    max_q_series.push(candidate_q);
                    best_memberships = memberships.clone();
                    changed = true;
                } else {
                    memberships.swap(i, j);
                }
            }
        }
        if !changed {
            break;
        }
    }

    let avg_q_series = max_q_series.clone();
    let sd_q_series = vec![0.0; max_q_series.len()];

    PolarizationResult {
        max_q: current_q,
        max_q_series,
        avg_q_series,
        sd_q_series,
        memberships: best_memberships,
        row_names: congruence.row_names.clone(),
        early_convergence: true,
        start: congruence.start,
        stop: congruence.stop,
        midpoint: congruence.midpoint,
    }
}
