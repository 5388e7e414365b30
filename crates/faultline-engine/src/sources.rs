//! In-memory statement source for tests and the CLI.

use chrono::NaiveDateTime;
use faultline_core::{AttributeType, Result, Statement, StatementSource};
use std::collections::{BTreeSet, HashMap};

/// A [`StatementSource`] over an in-memory statement list with declared
/// attribute types and optional date bounds.
///
/// Statement JSON files deserialize straight into the statement list via
/// serde; variables without a declared type default to short text.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    statements: Vec<Statement>,
    data_types: HashMap<String, AttributeType>,
    start: Option<NaiveDateTime>,
    stop: Option<NaiveDateTime>,
}

impl MemorySource {
    pub fn new(statements: Vec<Statement>, data_types: HashMap<String, AttributeType>) -> Self {
        Self {
            statements,
            data_types,
            start: None,
            stop: None,
        }
    }

    /// Restricts loading to statements within `[start, stop]` (inclusive).
    pub fn with_bounds(mut self, start: Option<NaiveDateTime>, stop: Option<NaiveDateTime>) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }
}

impl StatementSource for MemorySource {
    fn load_and_filter(&self) -> Result<Vec<Statement>> {
        let mut filtered: Vec<Statement> = self
            .statements
            .iter()
            .filter(|s| self.start.map_or(true, |b| s.time >= b))
            .filter(|s| self.stop.map_or(true, |e| s.time <= e))
            .cloned()
            .collect();
        filtered.sort_by_key(|s| s.time);
        log::debug!(
            "Loaded {} of {} statements after date filtering",
            filtered.len(),
            self.statements.len()
        );
        Ok(filtered)
    }

    fn extract_labels(
        &self,
        statements: &[Statement],
        variable: &str,
        is_document: bool,
    ) -> Vec<String> {
        let labels: BTreeSet<String> = statements
            .iter()
            .filter_map(|s| s.label(variable, is_document))
            .collect();
        labels.into_iter().collect()
    }

    fn data_type(&self, variable: &str) -> AttributeType {
        self.data_types
            .get(variable)
            .copied()
            .unwrap_or(AttributeType::ShortText)
    }

    fn original_statements(&self) -> &[Statement] {
        &self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use faultline_core::AttributeValue;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn statement(day: u32, actor: &str) -> Statement {
        let mut values = HashMap::new();
        values.insert("actor".to_string(), AttributeValue::Entity(actor.into()));
        Statement {
            time: ts(day),
            author: String::new(),
            source: String::new(),
            section: String::new(),
            kind: String::new(),
            title: String::new(),
            document_id: 0,
            values,
        }
    }

    #[test]
    fn test_load_sorts_and_filters() {
        let source = MemorySource::new(
            vec![statement(5, "b"), statement(1, "a"), statement(9, "c")],
            HashMap::new(),
        )
        .with_bounds(Some(ts(1)), Some(ts(6)));

        let loaded = source.load_and_filter().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].time < loaded[1].time);
    }

    #[test]
    fn test_extract_labels_unique_sorted() {
        let source = MemorySource::new(Vec::new(), HashMap::new());
        let statements = vec![statement(1, "b"), statement(2, "a"), statement(3, "b")];
        assert_eq!(
            source.extract_labels(&statements, "actor", false),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_data_type_defaults_to_short_text() {
        let mut types = HashMap::new();
        types.insert("agreement".to_string(), AttributeType::Boolean);
        let source = MemorySource::new(Vec::new(), types);
        assert_eq!(source.data_type("agreement"), AttributeType::Boolean);
        assert_eq!(source.data_type("actor"), AttributeType::ShortText);
    }
}
