//! Column-map record read model.
//!
//! # Responsibility
//! - Carry one fetched row as ordered column → value pairs.
//! - Carry eager-loaded related rows grouped by relation name.

use rusqlite::types::Value;
use rusqlite::Row;
use std::collections::BTreeMap;

/// One fetched row, keyed by column name.
///
/// Values keep SQLite's native typing (`Null`, `Integer`, `Real`, `Text`,
/// `Blob`); callers that need typed fields convert at the edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Column values from the projection of the producing query, keyed by
    /// column name.
    pub values: BTreeMap<String, Value>,
    /// Eager-loaded related rows, populated only on list paths that asked
    /// for them.
    pub relations: BTreeMap<String, Vec<Record>>,
}

impl Record {
    /// Builds a record from a row using the statement's column names.
    pub(crate) fn from_row(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut values = BTreeMap::new();
        for (index, column) in columns.iter().enumerate() {
            values.insert(column.clone(), row.get::<_, Value>(index)?);
        }
        Ok(Self {
            values,
            relations: BTreeMap::new(),
        })
    }

    /// Returns the value of `column`, if present in this record's projection.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Returns the primary key as an integer, when the `id` column was
    /// selected and holds an integer.
    pub fn id(&self) -> Option<i64> {
        match self.get("id") {
            Some(Value::Integer(id)) => Some(*id),
            _ => None,
        }
    }

    /// Returns the `slug` column as text, when present.
    pub fn slug(&self) -> Option<&str> {
        match self.get("slug") {
            Some(Value::Text(slug)) => Some(slug.as_str()),
            _ => None,
        }
    }

    /// Returns eager-loaded rows for `relation`, empty when none were loaded.
    pub fn related(&self, relation: &str) -> &[Record] {
        self.relations
            .get(relation)
            .map_or(&[], |records| records.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use rusqlite::types::Value;

    fn record_with(values: &[(&str, Value)]) -> Record {
        let mut record = Record::default();
        for (column, value) in values {
            record
                .values
                .insert((*column).to_string(), value.clone());
        }
        record
    }

    #[test]
    fn id_reads_only_integer_ids() {
        let record = record_with(&[("id", Value::Integer(7))]);
        assert_eq!(record.id(), Some(7));

        let text_id = record_with(&[("id", Value::Text("7".to_string()))]);
        assert_eq!(text_id.id(), None);
    }

    #[test]
    fn slug_reads_text_column() {
        let record = record_with(&[("slug", Value::Text("hello-world".to_string()))]);
        assert_eq!(record.slug(), Some("hello-world"));
        assert_eq!(record_with(&[]).slug(), None);
    }

    #[test]
    fn related_is_empty_without_eager_load() {
        let record = record_with(&[]);
        assert!(record.related("author").is_empty());
    }
}
