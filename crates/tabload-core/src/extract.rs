//! In-memory model of one parsed delimited extract.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Best-effort value kind of a column, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Float,
    Timestamp,
    Text,
}

impl ValueKind {
    /// Combine the kinds of two values in the same column: the result
    /// is the most specific kind both satisfy. Integers widen to
    /// floats; any other disagreement degrades to text.
    pub fn unify(self, other: ValueKind) -> ValueKind {
        use ValueKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }
}

/// One untyped scalar inside an extract. Cells are typed column-wise:
/// every non-null cell in a column carries the column's inferred kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// One parsed delimited-text file: ordered raw column names, rows as
/// column-aligned cell envelopes, and one inferred kind per column.
///
/// Created per input file and discarded after the load.
#[derive(Debug, Clone)]
pub struct Extract {
    /// Source file name, for diagnostics and table naming.
    pub file_name: String,
    /// Raw header names in file order. May contain duplicates; the
    /// schema resolver deduplicates.
    pub columns: Vec<String>,
    /// Inferred kind per column, aligned with `columns`.
    pub kinds: Vec<ValueKind>,
    /// Rows aligned with `columns`.
    pub rows: Vec<Vec<Cell>>,
    /// Encoding label that decoded the file.
    pub encoding: &'static str,
    /// Delimiter byte that produced the table.
    pub delimiter: u8,
}

impl Extract {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterate the non-null cells of one column.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[idx]).filter(|c| !c.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_widens_int_to_float() {
        assert_eq!(ValueKind::Integer.unify(ValueKind::Float), ValueKind::Float);
        assert_eq!(ValueKind::Float.unify(ValueKind::Integer), ValueKind::Float);
    }

    #[test]
    fn test_unify_disagreement_is_text() {
        assert_eq!(ValueKind::Integer.unify(ValueKind::Timestamp), ValueKind::Text);
        assert_eq!(ValueKind::Timestamp.unify(ValueKind::Float), ValueKind::Text);
        assert_eq!(ValueKind::Text.unify(ValueKind::Integer), ValueKind::Text);
    }

    #[test]
    fn test_unify_same_kind_is_identity() {
        for kind in [
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::Timestamp,
            ValueKind::Text,
        ] {
            assert_eq!(kind.unify(kind), kind);
        }
    }
}
