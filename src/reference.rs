//! Lookup helpers over a resolved reference table.

use crate::{ast::RefValue, ir::ReferenceTable, value::Value};
use rand::Rng;
use std::collections::HashMap;

/// A reference table indexed for fast label/value lookup.
///
/// Lookups are first-occurrence-wins: if a label or value repeats across rows, the earliest row
/// is returned.
#[derive(Debug)]
pub struct ReferenceIndex<'a> {
    table: &'a ReferenceTable,
    by_label: HashMap<&'a str, usize>,
}

impl<'a> ReferenceIndex<'a> {
    /// Builds an index over `table`.
    pub fn new(table: &'a ReferenceTable) -> Self {
        let mut by_label = HashMap::with_capacity(table.rows.len());
        for (i, (label, _)) in table.rows.iter().enumerate() {
            by_label.entry(label.as_str()).or_insert(i);
        }
        Self { table, by_label }
    }

    /// Draws a uniformly random row index.
    pub fn random_row(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(0..self.table.rows.len())
    }

    /// Returns the label/value pair at `row`.
    pub fn row(&self, row: usize) -> (&'a str, &'a RefValue) {
        let (label, value) = &self.table.rows[row];
        (label.as_str(), value)
    }

    /// Finds the first row whose label equals `label`.
    pub fn row_by_label(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    /// Finds the first row whose value equals `value`. Linear, since `RefValue`'s float variant
    /// has no total order to index by; reference tables are small.
    pub fn row_by_value(&self, value: &Value) -> Option<usize> {
        self.table.rows.iter().position(|(_, v)| value_matches(v, value))
    }
}

fn value_matches(ref_value: &RefValue, value: &Value) -> bool {
    match (ref_value, value) {
        (RefValue::Int(a), Value::Int(b)) => a == b,
        (RefValue::Float(a), Value::Float(b)) => a == b,
        (RefValue::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReferenceTable {
        ReferenceTable {
            name: "Q".to_owned(),
            rows: vec![
                ("A".to_owned(), RefValue::Int(1)),
                ("B".to_owned(), RefValue::Int(2)),
                ("A".to_owned(), RefValue::Int(3)),
            ],
        }
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_labels() {
        let table = table();
        let index = ReferenceIndex::new(&table);
        assert_eq!(index.row_by_label("A"), Some(0));
    }

    #[test]
    fn row_returns_label_and_value() {
        let table = table();
        let index = ReferenceIndex::new(&table);
        assert_eq!(index.row(1), ("B", &RefValue::Int(2)));
    }
}
