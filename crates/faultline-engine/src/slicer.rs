//! Kernel-smoothed time slicing of a sorted statement stream.
//!
//! A slice is a skeleton matrix (node labels plus `(start, midpoint, end)`)
//! and a 3-D bucket array of the statements feeding the aggregation for that
//! slice. The midpoint advances by one unit of the configured granularity.
//! Bounded kernels (uniform, triangular, epanechnikov) use per-slice label
//! sets from the statements inside the window band; the gaussian kernel has
//! unbounded support, so all slices share the global label sets and the
//! full-range endpoints.

use chrono::NaiveDateTime;
use faultline_core::{
    AttributeType, BucketArray, Kernel, Matrix, PolarizationConfig, Result, Statement,
    StatementSource,
};
use std::collections::HashMap;

/// One time slice: the zeroed skeleton matrix and the bucketed statements.
/// Bucket cells hold indices into the filtered statement list.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    pub skeleton: Matrix,
    pub buckets: BucketArray,
}

/// Generates the sequence of time slices for a configuration.
pub struct TimeSlicer<'a> {
    config: &'a PolarizationConfig,
    source: &'a dyn StatementSource,
}

impl<'a> TimeSlicer<'a> {
    pub fn new(config: &'a PolarizationConfig, source: &'a dyn StatementSource) -> Self {
        Self { config, source }
    }

    /// Builds all slices over the filtered, chronologically sorted
    /// statements.
    pub fn slices(&self, statements: &[Statement]) -> Result<Vec<TimeSlice>> {
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let window = self.config.time_window;
        let w_half = self.config.window_size / 2;

        let first = statements.first().expect("non-empty").time;
        let last = statements.last().expect("non-empty").time;
        let range_start = self.config.start.map_or(first, |s| s.max(first));
        let range_stop = self.config.stop.map_or(last, |s| s.min(last));

        let mut gamma = range_start;
        let mut indented_stop = range_stop;
        if self.config.indent_time {
            gamma = window.advance(gamma, w_half);
            indented_stop = window.retreat(indented_stop, w_half);
        }

        let qualifier_labels = self.qualifier_labels(statements);
        let mut slices = Vec::new();

        if self.config.kernel == Kernel::Gaussian {
            let var1_labels =
                self.source
                    .extract_labels(statements, &self.config.variable1, self.config.variable1_document);
            let var2_labels =
                self.source
                    .extract_labels(statements, &self.config.variable2, self.config.variable2_document);

            while gamma <= indented_stop {
                let skeleton =
                    Matrix::skeleton(var1_labels.clone(), range_start, gamma, range_stop);
                let buckets = self.bucket(
                    statements,
                    0,
                    statements.len(),
                    &var1_labels,
                    &var2_labels,
                    &qualifier_labels,
                );
                slices.push(TimeSlice { skeleton, buckets });
                gamma = window.advance(gamma, 1);
            }
        } else {
            while gamma <= indented_stop {
                let band_start = window.retreat(gamma, w_half).max(range_start);
                let band_stop = window.advance(gamma, w_half).min(range_stop);

                // statements are sorted, so the open band is contiguous
                let lo = statements.partition_point(|s| s.time <= band_start);
                let hi = statements.partition_point(|s| s.time < band_stop);
                let band = &statements[lo..hi];

                let var1_labels = self.source.extract_labels(
                    band,
                    &self.config.variable1,
                    self.config.variable1_document,
                );
                let var2_labels = self.source.extract_labels(
                    band,
                    &self.config.variable2,
                    self.config.variable2_document,
                );

                let skeleton = Matrix::skeleton(var1_labels.clone(), band_start, gamma, band_stop);
                let buckets =
                    self.bucket(statements, lo, hi, &var1_labels, &var2_labels, &qualifier_labels);
                slices.push(TimeSlice { skeleton, buckets });
                gamma = window.advance(gamma, 1);
            }
        }

        log::debug!(
            "Sliced {} statements into {} windows",
            statements.len(),
            slices.len()
        );
        Ok(slices)
    }

    /// A single slice covering the whole statement range, for runs without
    /// a time window.
    pub fn single_slice(&self, statements: &[Statement]) -> Result<TimeSlice> {
        let first = statements.first().map(|s| s.time);
        let last = statements.last().map(|s| s.time);
        let range_start = self
            .config
            .start
            .map_or_else(|| first.unwrap_or(NaiveDateTime::MIN), |s| first.map_or(s, |f| s.max(f)));
        let range_stop = self
            .config
            .stop
            .map_or_else(|| last.unwrap_or(NaiveDateTime::MAX), |s| last.map_or(s, |l| s.min(l)));

        let var1_labels = self.source.extract_labels(
            statements,
            &self.config.variable1,
            self.config.variable1_document,
        );
        let var2_labels = self.source.extract_labels(
            statements,
            &self.config.variable2,
            self.config.variable2_document,
        );
        let qualifier_labels = self.qualifier_labels(statements);

        let skeleton = Matrix::skeleton(var1_labels.clone(), range_start, range_stop, range_stop);
        let buckets = self.bucket(
            statements,
            0,
            statements.len(),
            &var1_labels,
            &var2_labels,
            &qualifier_labels,
        );
        Ok(TimeSlice { skeleton, buckets })
    }

    /// Qualifier level labels shared by all slices. Without a qualifier the
    /// array collapses to a single level. Integer qualifiers with gaps in
    /// their observed values are expanded to the full `[min, max]` range so
    /// that sparse levels still get buckets; booleans are never expanded.
    fn qualifier_labels(&self, statements: &[Statement]) -> Vec<String> {
        let Some(qualifier) = self.config.qualifier.as_deref() else {
            return vec![String::new()];
        };

        let labels =
            self.source
                .extract_labels(statements, qualifier, self.config.qualifier_document);

        if self.source.data_type(qualifier) == AttributeType::Integer {
            let mut observed: Vec<i32> = self
                .source
                .original_statements()
                .iter()
                .filter_map(|s| s.integer(qualifier))
                .collect();
            observed.sort_unstable();
            observed.dedup();
            if let (Some(&min), Some(&max)) = (observed.first(), observed.last()) {
                let range_len = (max - min + 1) as usize;
                if observed.len() < range_len {
                    return (min..=max).map(|v| v.to_string()).collect();
                }
            }
        }

        labels
    }

    /// Buckets the statements `statements[lo..hi]` by their
    /// `(variable1, variable2, qualifier)` label tuple. Cells hold indices
    /// into the full statement list.
    fn bucket(
        &self,
        statements: &[Statement],
        lo: usize,
        hi: usize,
        var1_labels: &[String],
        var2_labels: &[String],
        qualifier_labels: &[String],
    ) -> BucketArray {
        let index_of = |labels: &[String]| -> HashMap<String, usize> {
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| (l.clone(), i))
                .collect()
        };
        let v1_map = index_of(var1_labels);
        let v2_map = index_of(var2_labels);
        let q_map = index_of(qualifier_labels);

        let mut buckets =
            BucketArray::new(var1_labels.len(), var2_labels.len(), qualifier_labels.len());

        for (offset, statement) in statements[lo..hi].iter().enumerate() {
            let index = lo + offset;
            let v1 = statement
                .label(&self.config.variable1, self.config.variable1_document)
                .and_then(|l| v1_map.get(&l).copied());
            let v2 = statement
                .label(&self.config.variable2, self.config.variable2_document)
                .and_then(|l| v2_map.get(&l).copied());
            let q = match self.config.qualifier.as_deref() {
                None => Some(0),
                Some(qualifier) => statement
                    .label(qualifier, self.config.qualifier_document)
                    .and_then(|l| q_map.get(&l).copied()),
            };
            match (v1, v2, q) {
                (Some(i1), Some(i2), Some(iq)) => buckets.push(i1, i2, iq, index),
                _ => log::error!(
                    "Statement at {} has no bucket for its label tuple; dropping it",
                    statement.time
                ),
            }
        }

        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use chrono::{Duration, NaiveDate};
    use faultline_core::{AttributeValue, TimeWindow};
    use std::collections::HashMap;

    fn day(d: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::days(d)
    }

    fn statement(d: i64, actor: &str, concept: &str, agreement: i32) -> Statement {
        let mut values = HashMap::new();
        values.insert("actor".to_string(), AttributeValue::Entity(actor.into()));
        values.insert("concept".to_string(), AttributeValue::Entity(concept.into()));
        values.insert("agreement".to_string(), AttributeValue::Integer(agreement));
        Statement {
            time: day(d),
            author: String::new(),
            source: String::new(),
            section: String::new(),
            kind: String::new(),
            title: String::new(),
            document_id: 0,
            values,
        }
    }

    fn config() -> PolarizationConfig {
        let mut config = PolarizationConfig::new("actor", "concept");
        config.qualifier = Some("agreement".to_string());
        config.time_window = TimeWindow::Days;
        config.window_size = 4;
        config.indent_time = true;
        config
    }

    fn source(statements: Vec<Statement>) -> MemorySource {
        let mut types = HashMap::new();
        types.insert("agreement".to_string(), AttributeType::Integer);
        MemorySource::new(statements, types)
    }

    #[test]
    fn test_slice_count_matches_indented_range() {
        // statements spanning 20 days, window of 4, indented: 17 midpoints
        let statements: Vec<Statement> = (0..=20)
            .map(|d| statement(d, "a", "c", if d % 2 == 0 { 1 } else { 0 }))
            .collect();
        let src = source(statements.clone());
        let cfg = config().sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slices = slicer.slices(&statements).unwrap();
        assert_eq!(slices.len(), 17);
    }

    #[test]
    fn test_slice_windows_straddle_midpoint() {
        let statements: Vec<Statement> = (0..=20)
            .map(|d| statement(d, "a", "c", 1))
            .collect();
        let src = source(statements.clone());
        let cfg = config().sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        for slice in slicer.slices(&statements).unwrap() {
            let m = &slice.skeleton;
            assert_eq!(m.midpoint - m.start, Duration::days(2));
            assert_eq!(m.stop - m.midpoint, Duration::days(2));
        }
    }

    #[test]
    fn test_band_is_open_interval() {
        // statements exactly on the band edges are excluded
        let statements: Vec<Statement> = (0..=8).map(|d| statement(d, "a", "c", 1)).collect();
        let src = source(statements.clone());
        let cfg = config().sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slices = slicer.slices(&statements).unwrap();
        // first midpoint is day 2, band (day 0, day 4): days 1, 2, 3
        let first = &slices[0];
        assert_eq!(first.buckets.len(), 3);
    }

    #[test]
    fn test_gaussian_shares_global_labels_and_range() {
        let statements = vec![
            statement(0, "a", "c1", 1),
            statement(5, "b", "c1", 0),
            statement(10, "c", "c2", 1),
        ];
        let src = source(statements.clone());
        let mut cfg = config();
        cfg.kernel = Kernel::Gaussian;
        let cfg = cfg.sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slices = slicer.slices(&statements).unwrap();
        assert!(!slices.is_empty());
        for slice in &slices {
            assert_eq!(slice.skeleton.row_names, vec!["a", "b", "c"]);
            assert_eq!(slice.skeleton.start, day(0));
            assert_eq!(slice.skeleton.stop, day(10));
            // every slice buckets the full statement set
            assert_eq!(slice.buckets.len(), 3);
        }
    }

    #[test]
    fn test_bounded_kernel_uses_per_slice_labels() {
        let mut statements = vec![
            statement(1, "a", "c", 1),
            statement(2, "a", "c", 0),
            statement(9, "b", "c", 1),
            statement(10, "b", "c", 0),
        ];
        statements.sort_by_key(|s| s.time);
        let src = source(statements.clone());
        let cfg = config().sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slices = slicer.slices(&statements).unwrap();
        // early slices only see actor "a", late slices only "b"
        assert_eq!(slices.first().unwrap().skeleton.row_names, vec!["a"]);
        assert_eq!(slices.last().unwrap().skeleton.row_names, vec!["b"]);
    }

    #[test]
    fn test_integer_qualifier_gap_fill() {
        // observed agreement levels {0, 3}: buckets expand to 0..=3
        let statements = vec![
            statement(0, "a", "c", 0),
            statement(1, "a", "c", 3),
            statement(2, "b", "c", 3),
        ];
        let src = source(statements.clone());
        let mut cfg = config();
        cfg.indent_time = false;
        let cfg = cfg.sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slice = slicer.single_slice(&statements).unwrap();
        assert_eq!(slice.buckets.dims().2, 4);
    }

    #[test]
    fn test_boolean_qualifier_not_expanded() {
        let statements = vec![statement(0, "a", "c", 0), statement(1, "b", "c", 1)];
        let mut types = HashMap::new();
        types.insert("agreement".to_string(), AttributeType::Boolean);
        let src = MemorySource::new(statements.clone(), types);
        let cfg = config().sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slice = slicer.single_slice(&statements).unwrap();
        assert_eq!(slice.buckets.dims().2, 2);
    }

    #[test]
    fn test_no_qualifier_single_level() {
        let statements = vec![statement(0, "a", "c", 1)];
        let src = source(statements.clone());
        let mut cfg = config();
        cfg.qualifier = None;
        let cfg = cfg.sanitize();
        let slicer = TimeSlicer::new(&cfg, &src);
        let slice = slicer.single_slice(&statements).unwrap();
        assert_eq!(slice.buckets.dims().2, 1);
        assert_eq!(slice.buckets.cell(0, 0, 0), &[0]);
    }
}
