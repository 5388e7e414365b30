//! Balanced cluster solutions and the relabeling crossover operator.

use crate::score::ranks_descending;
use faultline_core::{FaultlineError, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// A partition of `n` nodes into `k` clusters with near-equal sizes.
///
/// Invariant: every membership is in `[0, k)` and cluster sizes differ by
/// at most one. Random construction, crossover, and pair-swap mutation all
/// preserve this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSolution {
    memberships: Vec<usize>,
    n: usize,
    k: usize,
}

impl ClusterSolution {
    /// Creates a balanced random partition: the pattern `0..k` is repeated
    /// to length `n` and shuffled.
    pub fn random<R: Rng>(n: usize, k: usize, rng: &mut R) -> Self {
        let mut memberships: Vec<usize> = (0..n).map(|i| i % k).collect();
        memberships.shuffle(rng);
        Self { memberships, n, k }
    }

    /// Wraps an existing membership vector, validating length and range.
    pub fn from_memberships(n: usize, k: usize, memberships: Vec<usize>) -> Result<Self> {
        if memberships.len() != n {
            return Err(FaultlineError::invariant(format!(
                "membership vector has length {} but the network has {} nodes",
                memberships.len(),
                n
            )));
        }
        if let Some(&bad) = memberships.iter().find(|&&m| m >= k) {
            return Err(FaultlineError::invariant(format!(
                "membership value {} is outside [0, {})",
                bad, k
            )));
        }
        Ok(Self { memberships, n, k })
    }

    /// The membership vector.
    pub fn memberships(&self) -> &[usize] {
        &self.memberships
    }

    /// Mutable access for pair-swap mutation. Swapping two entries of
    /// different clusters keeps the partition balanced.
    pub fn memberships_mut(&mut self) -> &mut [usize] {
        &mut self.memberships
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.n
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.k
    }

    /// Cluster sizes.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.k];
        for &m in &self.memberships {
            counts[m] += 1;
        }
        counts
    }

    /// Breeds an offspring membership vector from this solution and a
    /// foreign one:
    ///
    /// 1. relabel this solution's clusters onto the foreign labels with
    ///    maximal overlap,
    /// 2. uniform crossover between the two vectors,
    /// 3. rebalance the result to near-equal cluster sizes.
    pub fn crossover<R: Rng>(&self, foreign: &[usize], rng: &mut R) -> Vec<usize> {
        debug_assert_eq!(foreign.len(), self.n);

        let relabeled = self.relabel_onto(foreign);
        let mut child: Vec<usize> = (0..self.n)
            .map(|i| if rng.gen_bool(0.5) { relabeled[i] } else { foreign[i] })
            .collect();
        rebalance(&mut child, self.k);
        child
    }

    /// Applies the overlap-maximizing relabeling of this solution's cluster
    /// ids onto the foreign labeling. Rows are assigned greedily in order,
    /// each taking its best still-unassigned column.
    fn relabel_onto(&self, foreign: &[usize]) -> Vec<usize> {
        let k = self.k;
        let mut overlap = vec![vec![0usize; k]; k];
        for i in 0..self.n {
            overlap[self.memberships[i]][foreign[i]] += 1;
        }

        let mut relabel_map = vec![usize::MAX; k];
        let mut assigned = vec![false; k];
        for row in 0..k {
            let row_values: Vec<f64> = overlap[row].iter().map(|&v| v as f64).collect();
            let ranks = ranks_descending(&row_values);
            // columns ordered best-first: invert the rank permutation
            let mut columns = vec![0usize; k];
            for (col, &rank) in ranks.iter().enumerate() {
                columns[rank] = col;
            }
            for &col in &columns {
                if !assigned[col] {
                    relabel_map[row] = col;
                    assigned[col] = true;
                    break;
                }
            }
        }

        self.memberships.iter().map(|&m| relabel_map[m]).collect()
    }
}

/// Restores near-equal cluster sizes in place. Target sizes are
/// `floor(n / k)`, with the first `n mod k` clusters one larger. While a
/// cluster exceeds its target, its lowest-indexed member moves to the first
/// cluster with spare capacity.
fn rebalance(memberships: &mut [usize], k: usize) {
    let n = memberships.len();
    let mut counts = vec![0usize; k];
    let mut cluster_indices: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &m) in memberships.iter().enumerate() {
        counts[m] += 1;
        cluster_indices[m].push(i);
    }

    let base = n / k;
    let extra = n % k;
    let max_allowed: Vec<usize> = (0..k).map(|i| base + usize::from(i < extra)).collect();

    for i in 0..k {
        while counts[i] > max_allowed[i] {
            for j in 0..k {
                if counts[j] < max_allowed[j] {
                    let idx = cluster_indices[i].remove(0);
                    memberships[idx] = j;
                    counts[i] -= 1;
                    counts[j] += 1;
                    cluster_indices[j].push(idx);
                    break;
                }
            }
        }
    }
}
