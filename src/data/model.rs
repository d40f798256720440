use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ColumnType / SpecialColumn – schema vocabulary
// ---------------------------------------------------------------------------

/// Declared type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    Date,
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Number => write!(f, "number"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::String => write!(f, "string"),
        }
    }
}

/// Domain role a column can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialColumn {
    TransactionDate,
    PricePerUnit,
}

impl fmt::Display for SpecialColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialColumn::TransactionDate => write!(f, "transaction date"),
            SpecialColumn::PricePerUnit => write!(f, "price per unit"),
        }
    }
}

/// Read-only view of one column of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    pub name: String,
    pub column_type: ColumnType,
    pub special_tag: Option<SpecialColumn>,
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of a row
// ---------------------------------------------------------------------------

/// A tagged cell value. String cells either carry their text or point into
/// the dataset's [`SharedStrings`] table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    /// `None` is an empty date cell.
    Date(Option<NaiveDate>),
    StringLiteral(String),
    StringRef(usize),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => *d,
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Date(None) => write!(f, "<null>"),
            CellValue::StringLiteral(s) => write!(f, "{s}"),
            CellValue::StringRef(i) => write!(f, "#{i}"),
        }
    }
}

/// One row: exactly one cell per column.
pub type Row = Vec<CellValue>;

// ---------------------------------------------------------------------------
// SharedStrings – deduplicated string pool
// ---------------------------------------------------------------------------

/// Deduplicated pool of strings referenced by [`CellValue::StringRef`].
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from an existing table, keeping its indices. Duplicate
    /// entries keep their slots; lookups resolve to the first one.
    pub fn from_table(strings: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(strings.len());
        for (i, s) in strings.iter().enumerate() {
            lookup.entry(s.clone()).or_insert(i);
        }
        SharedStrings { strings, lookup }
    }

    /// Return the index of `s`, adding it to the pool when new.
    pub fn intern(&mut self, s: &str) -> usize {
        if let Some(&i) = self.lookup.get(s) {
            return i;
        }
        let i = self.strings.len();
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), i);
        i
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
