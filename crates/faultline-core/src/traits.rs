//! Collaborator seams consumed by the engine.

use crate::errors::Result;
use crate::types::{AttributeType, BucketArray, Matrix, QualifierRole, Statement};

/// Provider of the filtered, chronologically sorted statement stream.
///
/// Implementations own loading and filtering; the engine only consumes the
/// resulting stream and the label/type metadata.
pub trait StatementSource: Send + Sync {
    /// Loads and filters the statements, sorted ascending by timestamp.
    fn load_and_filter(&self) -> Result<Vec<Statement>>;

    /// Ordered unique labels of a variable across the given statements.
    fn extract_labels(
        &self,
        statements: &[Statement],
        variable: &str,
        is_document: bool,
    ) -> Vec<String>;

    /// Declared data type of a variable.
    fn data_type(&self, variable: &str) -> AttributeType;

    /// The unfiltered statements, used to compute the integer-qualifier
    /// range fill-in.
    fn original_statements(&self) -> &[Statement];
}

/// Builder of one aggregated network matrix per time slice and role.
///
/// Given a zeroed skeleton (labels and window endpoints) and the slice's
/// bucketed statements, produces the congruence or conflict matrix for that
/// skeleton. The combination and normalization scheme is fixed by the
/// implementation.
pub trait Aggregator: Send + Sync {
    fn build(
        &self,
        skeleton: &Matrix,
        buckets: &BucketArray,
        statements: &[Statement],
        role: QualifierRole,
    ) -> Result<Matrix>;
}
