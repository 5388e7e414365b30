//! Kernel-weighted one-mode aggregation of bucketed statements.

use faultline_core::{
    Aggregator, BucketArray, Kernel, Matrix, QualifierRole, Result, Statement, TimeWindow,
};

/// Aggregates a slice's bucketed statements into a signed one-mode network.
///
/// Every statement carries a kernel weight for its distance from the slice
/// midpoint. For each pair of first-variable actors, their weighted masses
/// per `(variable2, qualifier)` cell are projected against each other:
/// cells with the same qualifier level contribute agreement, cells with
/// different levels contribute disagreement. The two roles then subtract
/// the opposing contribution (`congruence = agreement - disagreement`
/// floored at zero, and vice versa), and the result is averaged by the mean
/// total mass of the two actors so that prolific actors do not dominate.
/// Isolates keep their zero rows.
#[derive(Debug, Clone)]
pub struct KernelAggregator {
    kernel: Kernel,
    time_window: TimeWindow,
    window_size: u32,
}

impl KernelAggregator {
    pub fn new(kernel: Kernel, time_window: TimeWindow, window_size: u32) -> Self {
        Self {
            kernel,
            time_window,
            window_size,
        }
    }

    /// Kernel weight of a statement against the slice midpoint. Without a
    /// time window every statement weighs 1.
    fn weight(&self, statement: &Statement, skeleton: &Matrix) -> f64 {
        if self.time_window == TimeWindow::No || self.window_size == 0 {
            return 1.0;
        }
        let half_window_seconds =
            self.time_window.nominal_seconds() * (self.window_size as f64) / 2.0;
        let offset_seconds = (statement.time - skeleton.midpoint).num_seconds() as f64;
        self.kernel.weight(offset_seconds / half_window_seconds)
    }

    /// Kernel-weighted statement mass per `(variable1, variable2,
    /// qualifier)` cell.
    fn masses(
        &self,
        skeleton: &Matrix,
        buckets: &BucketArray,
        statements: &[Statement],
    ) -> Vec<Vec<Vec<f64>>> {
        let (n1, n2, nq) = buckets.dims();
        let mut masses = vec![vec![vec![0.0; nq]; n2]; n1];
        for i1 in 0..n1 {
            for i2 in 0..n2 {
                for q in 0..nq {
                    masses[i1][i2][q] = buckets
                        .cell(i1, i2, q)
                        .iter()
                        .map(|&s| self.weight(&statements[s], skeleton))
                        .sum();
                }
            }
        }
        masses
    }
}

impl Aggregator for KernelAggregator {
    fn build(
        &self,
        skeleton: &Matrix,
        buckets: &BucketArray,
        statements: &[Statement],
        role: QualifierRole,
    ) -> Result<Matrix> {
        let (n1, n2, nq) = buckets.dims();
        let masses = self.masses(skeleton, buckets, statements);

        let totals: Vec<f64> = masses
            .iter()
            .map(|per_actor| per_actor.iter().flatten().sum())
            .collect();

        let mut matrix = skeleton.clone();
        for i in 0..n1 {
            for j in 0..n1 {
                if i == j {
                    continue;
                }
                let mut agreement = 0.0;
                let mut disagreement = 0.0;
                for i2 in 0..n2 {
                    for qa in 0..nq {
                        for qb in 0..nq {
                            let product = masses[i][i2][qa] * masses[j][i2][qb];
                            if qa == qb {
                                agreement += product;
                            } else {
                                disagreement += product;
                            }
                        }
                    }
                }
                let subtracted = match role {
                    QualifierRole::Congruence => (agreement - disagreement).max(0.0),
                    QualifierRole::Conflict => (disagreement - agreement).max(0.0),
                };
                let mean_mass = (totals[i] + totals[j]) / 2.0;
                matrix.values[i][j] = if mean_mass > 0.0 {
                    subtracted / mean_mass
                } else {
                    0.0
                };
            }
        }

        Ok(matrix)
    }
}
