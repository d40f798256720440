use std::collections::BTreeMap;

use crate::error::DatasetResult;

use super::model::{ColumnType, Row, SharedStrings, SpecialColumn};

/// Structure discovered by a source's analysis pass.
#[derive(Debug, Clone, Default)]
pub struct SourceDefinition {
    pub header_names: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub shared_strings: SharedStrings,
    pub row_count: usize,
    /// Roles the source could infer on its own (may be empty).
    pub special_columns: BTreeMap<SpecialColumn, usize>,
}

/// A format-specific producer of typed rows.
///
/// A [`TabularDataset`](super::dataset::TabularDataset) drives it in two
/// phases: `analyze` + `sample` for a cheap preview, then `all_rows` for the
/// full load, after which `close` releases format resources.
pub trait TabularSource {
    fn analyze(&mut self) -> DatasetResult<SourceDefinition>;

    /// At most `limit` leading rows, each with one cell per analysed column.
    fn sample(&mut self, limit: usize) -> DatasetResult<Vec<Row>>;

    /// Every row, each with one cell per analysed column.
    fn all_rows(&mut self) -> DatasetResult<Vec<Row>>;

    fn close(&mut self) {}
}

/// Source over rows that are already typed in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    definition: SourceDefinition,
    rows: Vec<Row>,
}

impl MemorySource {
    pub fn new(header_names: Vec<String>, column_types: Vec<ColumnType>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        MemorySource {
            definition: SourceDefinition {
                header_names,
                column_types,
                row_count,
                ..SourceDefinition::default()
            },
            rows,
        }
    }

    pub fn with_shared_strings(mut self, strings: Vec<String>) -> Self {
        self.definition.shared_strings = SharedStrings::from_table(strings);
        self
    }

    pub fn with_special_column(mut self, tag: SpecialColumn, column: usize) -> Self {
        self.definition.special_columns.insert(tag, column);
        self
    }
}

impl TabularSource for MemorySource {
    fn analyze(&mut self) -> DatasetResult<SourceDefinition> {
        Ok(self.definition.clone())
    }

    fn sample(&mut self, limit: usize) -> DatasetResult<Vec<Row>> {
        Ok(self.rows.iter().take(limit).cloned().collect())
    }

    fn all_rows(&mut self) -> DatasetResult<Vec<Row>> {
        Ok(std::mem::take(&mut self.rows))
    }

    fn close(&mut self) {
        self.rows.clear();
    }
}
