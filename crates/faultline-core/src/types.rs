//! Core data types for the polarization pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of an aggregated one-mode network.
///
/// The congruence network weights actor pairs that agree on the qualifier,
/// the conflict network weights pairs that disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualifierRole {
    Congruence,
    Conflict,
}

/// Declared data type of a statement attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    ShortText,
    Integer,
    Boolean,
}

/// Value of a named statement attribute: an entity label or an integer
/// category (booleans are stored as 0/1 integers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Entity(String),
    Integer(i32),
}

/// A single coded statement: a timestamp, document metadata, and named
/// statement-level attributes.
///
/// Statements are immutable once loaded; sources hand out sorted lists and
/// the engine never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Statement timestamp
    pub time: NaiveDateTime,

    /// Document-level author
    #[serde(default)]
    pub author: String,

    /// Document-level source
    #[serde(default)]
    pub source: String,

    /// Document-level section
    #[serde(default)]
    pub section: String,

    /// Document-level type
    #[serde(default)]
    pub kind: String,

    /// Document title
    #[serde(default)]
    pub title: String,

    /// Document identifier
    #[serde(default)]
    pub document_id: i64,

    /// Statement-level attributes by variable name
    #[serde(default)]
    pub values: HashMap<String, AttributeValue>,
}

impl Statement {
    /// Returns the label of a variable for this statement, resolving
    /// document-level names (`author`, `source`, `section`, `type`, `id`,
    /// `title`) or statement-level attributes. Integer categories are
    /// stringified.
    pub fn label(&self, variable: &str, is_document: bool) -> Option<String> {
        if is_document {
            match variable {
                "author" => Some(self.author.clone()),
                "source" => Some(self.source.clone()),
                "section" => Some(self.section.clone()),
                "type" => Some(self.kind.clone()),
                "title" => Some(self.title.clone()),
                "id" => Some(self.document_id.to_string()),
                _ => None,
            }
        } else {
            match self.values.get(variable) {
                Some(AttributeValue::Entity(label)) => Some(label.clone()),
                Some(AttributeValue::Integer(value)) => Some(value.to_string()),
                None => None,
            }
        }
    }

    /// Returns the integer value of a statement-level attribute, if it is one.
    pub fn integer(&self, variable: &str) -> Option<i32> {
        match self.values.get(variable) {
            Some(AttributeValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }
}

/// A named one-mode network matrix with row labels and the time window it
/// was aggregated over.
///
/// Invariant: `row_names.len() == dim()`. The diagonal is zero after matrix
/// building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matrix {
    /// Dense cell values, row-major
    pub values: Vec<Vec<f64>>,

    /// Row labels (equal to column labels for one-mode networks)
    pub row_names: Vec<String>,

    /// Window start
    pub start: NaiveDateTime,

    /// Window midpoint (the smoothing midpoint gamma)
    pub midpoint: NaiveDateTime,

    /// Window end
    pub stop: NaiveDateTime,
}

impl Matrix {
    /// Creates a zeroed square skeleton for the given labels and window.
    pub fn skeleton(
        row_names: Vec<String>,
        start: NaiveDateTime,
        midpoint: NaiveDateTime,
        stop: NaiveDateTime,
    ) -> Self {
        let n = row_names.len();
        Self {
            values: vec![vec![0.0; n]; n],
            row_names,
            start,
            midpoint,
            stop,
        }
    }

    /// Number of rows (== number of columns == number of labels).
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Sets the diagonal to zero.
    pub fn zero_diagonal(&mut self) {
        for i in 0..self.values.len() {
            self.values[i][i] = 0.0;
        }
    }
}

/// Statements of one time slice bucketed by `(variable1, variable2,
/// qualifier)` index. Cells hold indices into the slice's statement list.
#[derive(Debug, Clone)]
pub struct BucketArray {
    n1: usize,
    n2: usize,
    nq: usize,
    cells: Vec<Vec<usize>>,
}

impl BucketArray {
    /// Creates an empty bucket array with the given dimensions.
    pub fn new(n1: usize, n2: usize, nq: usize) -> Self {
        Self {
            n1,
            n2,
            nq,
            cells: vec![Vec::new(); n1 * n2 * nq],
        }
    }

    /// Dimensions `(|V1|, |V2|, |Q|)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.n1, self.n2, self.nq)
    }

    fn index(&self, i1: usize, i2: usize, q: usize) -> usize {
        (i1 * self.n2 + i2) * self.nq + q
    }

    /// Statement indices bucketed at `(i1, i2, q)`.
    pub fn cell(&self, i1: usize, i2: usize, q: usize) -> &[usize] {
        &self.cells[self.index(i1, i2, q)]
    }

    /// Appends a statement index to the cell at `(i1, i2, q)`.
    pub fn push(&mut self, i1: usize, i2: usize, q: usize, statement: usize) {
        let idx = self.index(i1, i2, q);
        self.cells[idx].push(statement);
    }

    /// Total number of bucketed statement references.
    pub fn len(&self) -> usize {
        self.cells.iter().map(|c| c.len()).sum()
    }

    /// True if no statement is bucketed.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// Polarization result for a single time slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarizationResult {
    /// Best quality per iteration
    pub max_q_series: Vec<f64>,

    /// Mean quality per iteration
    pub avg_q_series: Vec<f64>,

    /// Quality spread per iteration (see the genetic driver for the exact
    /// formula; zeros for the greedy driver)
    pub sd_q_series: Vec<f64>,

    /// Final best quality
    pub max_q: f64,

    /// Final membership vector (empty for degenerate slices)
    pub memberships: Vec<usize>,

    /// Node labels (empty for degenerate slices)
    pub row_names: Vec<String>,

    /// Whether the optimizer converged before exhausting its iterations
    pub early_convergence: bool,

    /// Window start
    pub start: NaiveDateTime,

    /// Window end
    pub stop: NaiveDateTime,

    /// Window midpoint
    pub midpoint: NaiveDateTime,
}

impl PolarizationResult {
    /// The degenerate result for an empty or too-small slice.
    pub fn degenerate(start: NaiveDateTime, stop: NaiveDateTime, midpoint: NaiveDateTime) -> Self {
        Self {
            max_q_series: vec![0.0],
            avg_q_series: vec![0.0],
            sd_q_series: vec![0.0],
            max_q: 0.0,
            memberships: Vec::new(),
            row_names: Vec::new(),
            early_convergence: true,
            start,
            stop,
            midpoint,
        }
    }

    /// True if this slice produced no partition.
    pub fn is_degenerate(&self) -> bool {
        self.memberships.is_empty()
    }
}

/// Chronologically ordered polarization results, one per time slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarizationResultTimeSeries {
    pub results: Vec<PolarizationResult>,
}

impl PolarizationResultTimeSeries {
    pub fn new(results: Vec<PolarizationResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolarizationResult> {
        self.results.iter()
    }

    /// Final best quality per slice, in chronological order.
    pub fn max_q(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.max_q).collect()
    }

    /// Slice midpoints, in chronological order.
    pub fn midpoints(&self) -> Vec<NaiveDateTime> {
        self.results.iter().map(|r| r.midpoint).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_matrix_skeleton() {
        let m = Matrix::skeleton(
            vec!["a".into(), "b".into(), "c".into()],
            ts(1),
            ts(2),
            ts(3),
        );
        assert_eq!(m.dim(), 3);
        assert_eq!(m.row_names.len(), 3);
        assert!(m.values.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_matrix_zero_diagonal() {
        let mut m = Matrix::skeleton(vec!["a".into(), "b".into()], ts(1), ts(1), ts(2));
        m.values = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        m.zero_diagonal();
        assert_eq!(m.values, vec![vec![0.0, 2.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn test_statement_labels() {
        let mut values = HashMap::new();
        values.insert("organization".to_string(), AttributeValue::Entity("org a".into()));
        values.insert("agreement".to_string(), AttributeValue::Integer(1));
        let s = Statement {
            time: ts(1),
            author: "reporter".into(),
            source: "gazette".into(),
            section: "politics".into(),
            kind: "newspaper".into(),
            title: "headline".into(),
            document_id: 7,
            values,
        };

        assert_eq!(s.label("organization", false).as_deref(), Some("org a"));
        assert_eq!(s.label("agreement", false).as_deref(), Some("1"));
        assert_eq!(s.label("author", true).as_deref(), Some("reporter"));
        assert_eq!(s.label("id", true).as_deref(), Some("7"));
        assert_eq!(s.label("missing", false), None);
        assert_eq!(s.integer("agreement"), Some(1));
        assert_eq!(s.integer("organization"), None);
    }

    #[test]
    fn test_bucket_array() {
        let mut x = BucketArray::new(2, 3, 2);
        assert!(x.is_empty());
        x.push(0, 2, 1, 5);
        x.push(0, 2, 1, 9);
        x.push(1, 0, 0, 3);
        assert_eq!(x.cell(0, 2, 1), &[5, 9]);
        assert_eq!(x.cell(1, 0, 0), &[3]);
        assert_eq!(x.cell(0, 0, 0), &[] as &[usize]);
        assert_eq!(x.len(), 3);
        assert_eq!(x.dims(), (2, 3, 2));
    }

    #[test]
    fn test_degenerate_result() {
        let r = PolarizationResult::degenerate(ts(1), ts(3), ts(2));
        assert!(r.is_degenerate());
        assert_eq!(r.max_q_series, vec![0.0]);
        assert_eq!(r.max_q, 0.0);
        assert!(r.early_convergence);
    }

    #[test]
    fn test_result_serialization_roundtrip() {
        let r = PolarizationResult {
            max_q_series: vec![0.1, 0.4],
            avg_q_series: vec![0.05, 0.3],
            sd_q_series: vec![0.2, 0.0],
            max_q: 0.4,
            memberships: vec![0, 1, 0, 1],
            row_names: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            early_convergence: false,
            start: ts(1),
            stop: ts(5),
            midpoint: ts(3),
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: PolarizationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
