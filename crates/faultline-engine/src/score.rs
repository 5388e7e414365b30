//! Matrix norms, ranking, and the absolute-difference polarization score.

/// Entrywise 1-norm: the sum of absolute values of all cells.
pub fn entrywise_norm(matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .flat_map(|row| row.iter())
        .map(|value| value.abs())
        .sum()
}

/// Descending ranks of a slice of values, starting at 0 for the largest.
/// Ties are broken by original index: the earlier element ranks higher.
pub fn ranks_descending(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut ranks = vec![0; values.len()];
    for (rank, &index) in order.iter().enumerate() {
        ranks[index] = rank;
    }
    ranks
}

/// Absolute-difference polarization quality of a membership vector against
/// a congruence network and a conflict network.
///
/// Within-cluster dyads contribute the deviation of observed congruence
/// from its expected within-cluster level plus the absolute conflict;
/// between-cluster dyads contribute the absolute congruence plus the
/// deviation of observed conflict from its expected between-cluster level.
/// Higher is better.
///
/// With `normalize` the sum is divided by `2 * (||G|| + ||C||)`; otherwise
/// it is halved. Both corrections account for every dyad being visited in
/// both orders.
pub fn quality_absdiff(
    memberships: &[usize],
    congruence: &[Vec<f64>],
    conflict: &[Vec<f64>],
    normalize: bool,
    num_clusters: usize,
) -> f64 {
    let congruence_norm = entrywise_norm(congruence);
    let conflict_norm = entrywise_norm(conflict);
    let n = memberships.len();

    let mut cluster_members = vec![0usize; num_clusters];
    for &m in memberships {
        cluster_members[m] += 1;
    }

    let num_within_dyads: usize = cluster_members.iter().map(|&s| s * s.saturating_sub(1)).sum();
    let num_between_dyads = n * n.saturating_sub(1) - num_within_dyads;

    // Expected congruence per within-cluster dyad, by cluster: the share of
    // within-cluster dyads that fall into the cluster times the congruence
    // mass spread over all within-cluster dyads.
    let mut expected_within = vec![0.0; num_clusters];
    if num_within_dyads > 0 {
        for (k, &s) in cluster_members.iter().enumerate() {
            let cluster_factor = (s * s.saturating_sub(1)) as f64 / num_within_dyads as f64;
            expected_within[k] = cluster_factor * (congruence_norm / num_within_dyads as f64);
        }
    }

    let mut absdiff = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if memberships[i] == memberships[j] {
                absdiff += (congruence[i][j] - expected_within[memberships[i]]).abs();
                absdiff += conflict[i][j].abs();
            } else {
                absdiff += congruence[i][j].abs();
                let expected_between = if num_between_dyads > 0 {
                    let between_factor = (cluster_members[memberships[i]]
                        * cluster_members[memberships[j]])
                        as f64
                        / num_between_dyads as f64;
                    between_factor * (conflict_norm / num_between_dyads as f64)
                } else {
                    0.0
                };
                absdiff += (conflict[i][j] - expected_between).abs();
            }
        }
    }

    if normalize {
        let denominator = 2.0 * (congruence_norm + conflict_norm);
        if denominator > 0.0 {
            absdiff / denominator
        } else {
            0.0
        }
    } else {
        absdiff * 0.5
    }
}
