//! Report row model
//!
//! A row is a flat mapping from column name to string value, optionally
//! tagged with the sheet it belongs to. Schemas are a fixed base column list
//! plus whatever extra keys the fetch phase discovered (tag keys, mostly);
//! the writers collect the union of those keys and pad missing cells with
//! the sentinel.

use std::collections::{BTreeMap, BTreeSet};

/// Rendered value for a cell whose column a row never set.
pub const MISSING: &str = "None";

/// One record of output data, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct Row {
    sheet: Option<String>,
    values: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row bound to a named sheet partition.
    pub fn on_sheet(label: impl Into<String>) -> Self {
        Self {
            sheet: Some(label.into()),
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Builder-style `set`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Cell value for a column, or the sentinel when the row never set it.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or(MISSING)
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Final column order for a set of rows: the base columns first, then the
/// sorted union of every other key the rows carry.
pub fn resolve_columns<'a>(base: &[&str], rows: impl IntoIterator<Item = &'a Row>) -> Vec<String> {
    let mut extra: BTreeSet<String> = BTreeSet::new();
    for row in rows {
        for column in row.columns() {
            if !base.contains(&column) {
                extra.insert(column.to_string());
            }
        }
    }

    base.iter()
        .map(|c| c.to_string())
        .chain(extra)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cell_renders_sentinel() {
        let row = Row::new().with("id", "i-123");
        assert_eq!(row.get("id"), "i-123");
        assert_eq!(row.get("Team"), MISSING);
    }

    #[test]
    fn test_resolve_columns_sorted_union() {
        let rows = vec![
            Row::new().with("id", "1").with("a", "x").with("b", "y"),
            Row::new().with("id", "2").with("a", "x").with("c", "z"),
        ];
        let columns = resolve_columns(&["id"], &rows);
        assert_eq!(columns, vec!["id", "a", "b", "c"]);
    }

    #[test]
    fn test_resolve_columns_base_only() {
        let rows = vec![Row::new().with("Name", "n")];
        let columns = resolve_columns(&["Name", "ARN"], &rows);
        assert_eq!(columns, vec!["Name", "ARN"]);
    }

    #[test]
    fn test_sheet_label() {
        let row = Row::on_sheet("prod_us-east-1").with("id", "1");
        assert_eq!(row.sheet(), Some("prod_us-east-1"));
        assert_eq!(Row::new().sheet(), None);
    }
}
