//! Per-slice congruence/conflict matrix building.

use crate::slicer::TimeSlice;
use faultline_core::{Aggregator, Matrix, QualifierRole, Statement};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

/// Builds the paired congruence and conflict matrices for every slice, in
/// parallel. Both matrices of a pair share the slice's labels and window;
/// diagonals are zeroed.
///
/// A slice whose aggregation fails keeps its zeroed skeleton pair (and is
/// later reported as degenerate) rather than aborting the series.
pub fn build_matrices(
    slices: &[TimeSlice],
    statements: &[Statement],
    aggregator: &dyn Aggregator,
) -> Vec<(Matrix, Matrix)> {
    let bar = progress_bar(slices.len() as u64, "aggregating networks");

    let pairs: Vec<(Matrix, Matrix)> = slices
        .par_iter()
        .map(|slice| {
            let mut pair = (
                build_one(slice, statements, aggregator, QualifierRole::Congruence),
                build_one(slice, statements, aggregator, QualifierRole::Conflict),
            );
            pair.0.zero_diagonal();
            pair.1.zero_diagonal();
            bar.inc(1);
            pair
        })
        .collect();

    bar.finish_and_clear();
    pairs
}

fn build_one(
    slice: &TimeSlice,
    statements: &[Statement],
    aggregator: &dyn Aggregator,
    role: QualifierRole,
) -> Matrix {
    match aggregator.build(&slice.skeleton, &slice.buckets, statements, role) {
        Ok(matrix) => matrix,
        Err(e) => {
            log::error!(
                "Aggregation failed for the slice at {} ({:?}): {}; keeping an empty network",
                slice.skeleton.midpoint,
                role,
                e
            );
            slice.skeleton.clone()
        }
    }
}

/// A plain counter bar; hidden automatically when not attached to a tty.
pub(crate) fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .expect("static template")
            .progress_chars("=> "),
    );
    bar.set_message(message);
    bar
}
