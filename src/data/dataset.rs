use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::error::{DatasetError, DatasetResult};

use super::model::{CellValue, Column, ColumnType, Row, SharedStrings, SpecialColumn};
use super::source::TabularSource;

/// Rows kept for preview by [`TabularDataset::initialize`].
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Text substituted for a shared-string reference past the end of the table.
pub const MALFORMED_STRING_DEFAULT: &str = "";

/// Bounds of a DATE column. `min`/`max` are `None` when no cell holds a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
    pub had_nulls: bool,
}

// ---------------------------------------------------------------------------
// TabularDataset – schema, rows and special-column tags
// ---------------------------------------------------------------------------

/// Typed tabular data produced by a [`TabularSource`].
///
/// Lifecycle: [`initialize`](Self::initialize) analyses the source and keeps
/// a small row sample; after the consumer has picked active columns and
/// special columns, [`load_data`](Self::load_data) reads every row, compacts
/// the schema to the active columns and releases the source.
pub struct TabularDataset {
    name: String,
    source: Option<Box<dyn TabularSource>>,
    sample_size: usize,
    valid: bool,

    header_names: Vec<String>,
    column_types: Vec<ColumnType>,
    special_columns: BTreeMap<SpecialColumn, usize>,
    shared_strings: SharedStrings,
    active_columns: Option<Vec<bool>>,

    rows: Vec<Row>,
    row_count: usize,
    sample: Vec<Row>,

    malformed_indices: Cell<usize>,
}

impl TabularDataset {
    /// An empty dataset that will be filled from `source`.
    pub fn new(name: &str, source: impl TabularSource + 'static) -> Self {
        TabularDataset {
            name: name.to_string(),
            source: Some(Box::new(source)),
            sample_size: DEFAULT_SAMPLE_SIZE,
            valid: false,
            header_names: Vec::new(),
            column_types: Vec::new(),
            special_columns: BTreeMap::new(),
            shared_strings: SharedStrings::new(),
            active_columns: None,
            rows: Vec::new(),
            row_count: 0,
            sample: Vec::new(),
            malformed_indices: Cell::new(0),
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `initialize` has succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    /// How many dangling shared-string references were replaced by
    /// [`MALFORMED_STRING_DEFAULT`] so far.
    pub fn malformed_index_count(&self) -> usize {
        self.malformed_indices.get()
    }

    // -- Loading -----------------------------------------------------------

    /// Analyse the source and capture up to `sample_size` preview rows
    /// without loading the full data.
    pub fn initialize(&mut self) -> DatasetResult<()> {
        let source = self.source.as_mut().ok_or(DatasetError::SourceReleased)?;

        let definition = source.analyze()?;
        if definition.header_names.len() != definition.column_types.len() {
            return Err(DatasetError::Source(format!(
                "{} header names for {} column types",
                definition.header_names.len(),
                definition.column_types.len()
            )));
        }
        let column_count = definition.column_types.len();
        for (&tag, &column) in &definition.special_columns {
            if column >= column_count {
                return Err(DatasetError::Source(format!(
                    "{tag} tagged on column {column}, source has {column_count} columns"
                )));
            }
        }

        let sample = source.sample(self.sample_size)?;
        check_row_widths(&sample, column_count)?;

        self.header_names = definition.header_names;
        self.column_types = definition.column_types;
        self.shared_strings = definition.shared_strings;
        self.special_columns = definition.special_columns;
        self.row_count = definition.row_count;
        self.sample = sample;
        self.valid = true;

        info!(
            "Dataset '{}' analysed: {} columns, {} rows, {} shared strings",
            self.name,
            column_count,
            self.row_count,
            self.shared_strings.len()
        );
        Ok(())
    }

    /// Load every row, compact the schema to the active columns and release
    /// the source.
    pub fn load_data(&mut self) -> DatasetResult<()> {
        if !self.valid {
            return Err(DatasetError::NotInitialized);
        }
        let mut source = self.source.take().ok_or(DatasetError::SourceReleased)?;

        let loaded = source.all_rows();
        source.close();
        let rows = loaded?;
        check_row_widths(&rows, self.column_count())?;

        self.row_count = rows.len();
        self.rows = rows;
        self.rebuild_definition_using_active_columns_only();

        info!(
            "Dataset '{}' loaded: {} rows x {} active columns",
            self.name,
            self.row_count,
            self.column_count()
        );
        Ok(())
    }

    /// Move the preview rows out of the dataset. Subsequent calls return an
    /// empty vector.
    pub fn retrieve_sample_data(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.sample)
    }

    /// Replace shared-string references in STRING columns of `rows` by their
    /// text. A reference at or past the end of the table becomes
    /// [`MALFORMED_STRING_DEFAULT`] and is counted.
    pub fn update_sample_data_strings(&self, rows: &mut [Row]) {
        for (column, column_type) in self.column_types.iter().enumerate() {
            if *column_type != ColumnType::String {
                continue;
            }
            for row in rows.iter_mut() {
                let Some(cell) = row.get_mut(column) else {
                    continue;
                };
                if let CellValue::StringRef(index) = *cell {
                    let text = self.shared_string_or_default(index).to_string();
                    *cell = CellValue::StringLiteral(text);
                }
            }
        }
    }

    // -- Schema --------------------------------------------------------------

    pub fn column_format(&self, column: usize) -> DatasetResult<ColumnType> {
        self.column_types
            .get(column)
            .copied()
            .ok_or(DatasetError::ColumnOutOfRange {
                column,
                count: self.column_count(),
            })
    }

    pub fn header_name(&self, column: usize) -> DatasetResult<&str> {
        self.header_names
            .get(column)
            .map(String::as_str)
            .ok_or(DatasetError::ColumnOutOfRange {
                column,
                count: self.column_count(),
            })
    }

    /// Schema view, one entry per column in order.
    pub fn columns(&self) -> Vec<Column> {
        self.header_names
            .iter()
            .zip(&self.column_types)
            .enumerate()
            .map(|(index, (name, column_type))| Column {
                index,
                name: name.clone(),
                column_type: *column_type,
                special_tag: self.tag_of(index),
            })
            .collect()
    }

    /// Index of the column tagged with `tag`, if any.
    pub fn special_column(&self, tag: SpecialColumn) -> Option<usize> {
        self.special_columns.get(&tag).copied()
    }

    /// Tag `column` with `tag`. A tag already on another column moves.
    pub fn set_special_column(&mut self, tag: SpecialColumn, column: usize) -> DatasetResult<()> {
        self.column_format(column)?;
        if let Some(previous) = self.special_columns.insert(tag, column) {
            if previous != column {
                debug!("Special column {tag} moved from {previous} to {column}");
            }
        }
        Ok(())
    }

    /// Record which columns survive the next schema compaction.
    pub fn set_active_columns(&mut self, mask: Vec<bool>) -> DatasetResult<()> {
        if mask.len() != self.column_count() {
            return Err(DatasetError::ActiveMaskLength {
                expected: self.column_count(),
                actual: mask.len(),
            });
        }
        self.active_columns = Some(mask);
        Ok(())
    }

    /// Drop inactive columns from the schema, rows and sample.
    ///
    /// Survivors keep their relative order and are renumbered from 0; each
    /// special tag on a surviving column follows it to its new index, tags on
    /// dropped columns are removed. Without an active mask this is a no-op.
    pub fn rebuild_definition_using_active_columns_only(&mut self) {
        let Some(mask) = self.active_columns.take() else {
            return;
        };

        let mut header_names = Vec::new();
        let mut column_types = Vec::new();
        let mut special_columns = BTreeMap::new();

        for (old_index, _) in mask.iter().enumerate().filter(|(_, active)| **active) {
            let new_index = column_types.len();
            column_types.push(self.column_types[old_index]);
            header_names.push(std::mem::take(&mut self.header_names[old_index]));
            for (&tag, &tagged) in &self.special_columns {
                if tagged == old_index {
                    special_columns.insert(tag, new_index);
                }
            }
        }

        for tag in self.special_columns.keys() {
            if !special_columns.contains_key(tag) {
                debug!("Special column {tag} dropped with its column");
            }
        }

        compact_rows(&mut self.rows, &mask);
        compact_rows(&mut self.sample, &mask);

        debug!(
            "Schema compacted from {} to {} columns",
            self.column_types.len(),
            column_types.len()
        );
        self.header_names = header_names;
        self.column_types = column_types;
        self.special_columns = special_columns;
    }

    // -- Typed column accessors ---------------------------------------------

    /// Minimum and maximum of a NUMBER column; `(0, 0)` when it holds no
    /// numbers.
    pub fn numeric_range(&self, column: usize) -> DatasetResult<(f64, f64)> {
        self.expect_type(column, ColumnType::Number)?;

        let mut range: Option<(f64, f64)> = None;
        for value in self.rows.iter().filter_map(|row| row[column].as_f64()) {
            if value.is_nan() {
                continue;
            }
            range = Some(match range {
                None => (value, value),
                Some((min, max)) => (min.min(value), max.max(value)),
            });
        }
        Ok(range.unwrap_or((0.0, 0.0)))
    }

    /// Earliest and latest date of a DATE column. Empty cells are skipped
    /// but reported through `had_nulls`.
    pub fn date_range(&self, column: usize) -> DatasetResult<DateRange> {
        self.expect_type(column, ColumnType::Date)?;

        let mut range = DateRange::default();
        for row in &self.rows {
            match row[column].as_date() {
                None => range.had_nulls = true,
                Some(date) => {
                    range.min = Some(range.min.map_or(date, |min| min.min(date)));
                    range.max = Some(range.max.map_or(date, |max| max.max(date)));
                }
            }
        }
        Ok(range)
    }

    /// Distinct non-empty values of a STRING column, sorted.
    pub fn string_list(&self, column: usize) -> DatasetResult<Vec<String>> {
        self.expect_type(column, ColumnType::String)?;

        let mut values = BTreeSet::new();
        for row in &self.rows {
            if let Some(text) = self.cell_text(&row[column]) {
                if !text.is_empty() {
                    values.insert(text.to_string());
                }
            }
        }
        Ok(values.into_iter().collect())
    }

    /// Text of a string cell, resolving shared-string references. Dangling
    /// references resolve to [`MALFORMED_STRING_DEFAULT`].
    pub fn cell_text<'a>(&'a self, cell: &'a CellValue) -> Option<&'a str> {
        match cell {
            CellValue::StringLiteral(s) => Some(s),
            CellValue::StringRef(index) => Some(self.shared_string_or_default(*index)),
            _ => None,
        }
    }

    fn shared_string_or_default(&self, index: usize) -> &str {
        match self.shared_strings.get(index) {
            Some(s) => s,
            None => {
                self.malformed_indices.set(self.malformed_indices.get() + 1);
                warn!(
                    "Dataset '{}': shared string index {index} out of range ({} entries)",
                    self.name,
                    self.shared_strings.len()
                );
                MALFORMED_STRING_DEFAULT
            }
        }
    }

    fn expect_type(&self, column: usize, expected: ColumnType) -> DatasetResult<()> {
        let actual = self.column_format(column)?;
        if actual != expected {
            return Err(DatasetError::ColumnTypeMismatch {
                column,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn tag_of(&self, column: usize) -> Option<SpecialColumn> {
        self.special_columns
            .iter()
            .find(|&(_, &tagged)| tagged == column)
            .map(|(&tag, _)| tag)
    }
}

fn check_row_widths(rows: &[Row], column_count: usize) -> DatasetResult<()> {
    match rows.iter().position(|row| row.len() != column_count) {
        Some(i) => Err(DatasetError::Source(format!(
            "row {i} has {} cells, expected {column_count}",
            rows[i].len()
        ))),
        None => Ok(()),
    }
}

fn compact_rows(rows: &mut [Row], mask: &[bool]) {
    for row in rows.iter_mut() {
        let mut column = 0;
        row.retain(|_| {
            let keep = mask.get(column).copied().unwrap_or(false);
            column += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::MemorySource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn three_column_source() -> MemorySource {
        MemorySource::new(
            vec!["Date".into(), "Kind".into(), "Price".into()],
            vec![ColumnType::Date, ColumnType::String, ColumnType::Number],
            vec![
                vec![
                    CellValue::Date(Some(date(2010, 3, 4))),
                    CellValue::StringRef(0),
                    CellValue::Number(10.0),
                ],
                vec![
                    CellValue::Date(None),
                    CellValue::StringLiteral("house".into()),
                    CellValue::Number(-2.5),
                ],
                vec![
                    CellValue::Date(Some(date(2010, 3, 1))),
                    CellValue::StringRef(1),
                    CellValue::Number(7.0),
                ],
                vec![
                    CellValue::Date(Some(date(2011, 1, 9))),
                    CellValue::StringRef(0),
                    CellValue::Number(3.0),
                ],
            ],
        )
        .with_shared_strings(vec!["flat".into(), "house".into()])
    }

    fn loaded(source: MemorySource) -> TabularDataset {
        let mut dataset = TabularDataset::new("test", source);
        dataset.initialize().unwrap();
        dataset.load_data().unwrap();
        dataset
    }

    #[test]
    fn initialize_keeps_bounded_sample() {
        let mut dataset = TabularDataset::new("test", three_column_source()).with_sample_size(2);
        assert!(!dataset.is_valid());
        dataset.initialize().unwrap();
        assert!(dataset.is_valid());
        assert_eq!(dataset.column_count(), 3);
        assert_eq!(dataset.row_count(), 4);
        assert!(dataset.rows().is_empty());
        assert_eq!(dataset.retrieve_sample_data().len(), 2);
        assert!(dataset.retrieve_sample_data().is_empty());
    }

    #[test]
    fn load_before_initialize_fails() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        assert!(matches!(dataset.load_data(), Err(DatasetError::NotInitialized)));
    }

    #[test]
    fn second_load_reports_released_source() {
        let mut dataset = loaded(three_column_source());
        assert!(matches!(dataset.load_data(), Err(DatasetError::SourceReleased)));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let source = MemorySource::new(
            vec!["A".into(), "B".into()],
            vec![ColumnType::Number, ColumnType::Number],
            vec![vec![CellValue::Number(1.0)]],
        );
        let mut dataset = TabularDataset::new("test", source);
        assert!(matches!(dataset.initialize(), Err(DatasetError::Source(_))));
    }

    #[test]
    fn column_format_out_of_range_is_an_error() {
        let dataset = loaded(three_column_source());
        assert_eq!(dataset.column_format(2).unwrap(), ColumnType::Number);
        assert!(matches!(
            dataset.column_format(3),
            Err(DatasetError::ColumnOutOfRange { column: 3, count: 3 })
        ));
        assert!(dataset.header_name(5).is_err());
        assert_eq!(dataset.header_name(1).unwrap(), "Kind");
    }

    #[test]
    fn numeric_range_bounds_are_attained() {
        let dataset = loaded(three_column_source());
        let (min, max) = dataset.numeric_range(2).unwrap();
        assert_eq!((min, max), (-2.5, 10.0));
        assert!(dataset
            .rows()
            .iter()
            .any(|row| row[2].as_f64() == Some(min)));
    }

    #[test]
    fn typed_accessors_reject_other_column_types() {
        let dataset = loaded(three_column_source());
        assert!(matches!(
            dataset.numeric_range(0),
            Err(DatasetError::ColumnTypeMismatch {
                column: 0,
                expected: ColumnType::Number,
                actual: ColumnType::Date,
            })
        ));
        assert!(dataset.date_range(1).is_err());
        assert!(dataset.string_list(2).is_err());
        assert!(dataset.string_list(9).is_err());
    }

    #[test]
    fn empty_dataset_yields_sentinels() {
        let source = MemorySource::new(
            vec!["Date".into(), "Price".into()],
            vec![ColumnType::Date, ColumnType::Number],
            Vec::new(),
        );
        let dataset = loaded(source);
        assert_eq!(dataset.numeric_range(1).unwrap(), (0.0, 0.0));
        assert_eq!(dataset.date_range(0).unwrap(), DateRange::default());
    }

    #[test]
    fn date_range_skips_nulls() {
        let dataset = loaded(three_column_source());
        let range = dataset.date_range(0).unwrap();
        assert_eq!(range.min, Some(date(2010, 3, 1)));
        assert_eq!(range.max, Some(date(2011, 1, 9)));
        assert!(range.had_nulls);
    }

    #[test]
    fn string_list_is_deduplicated() {
        let dataset = loaded(three_column_source());
        assert_eq!(dataset.string_list(1).unwrap(), vec!["flat", "house"]);
        assert_eq!(dataset.malformed_index_count(), 0);
    }

    #[test]
    fn dangling_reference_resolves_to_default_and_is_counted() {
        let source = MemorySource::new(
            vec!["Kind".into()],
            vec![ColumnType::String],
            vec![vec![CellValue::StringRef(0)], vec![CellValue::StringRef(1)]],
        )
        .with_shared_strings(vec!["flat".into()]);
        let dataset = loaded(source);
        assert_eq!(dataset.string_list(0).unwrap(), vec!["flat"]);
        assert_eq!(dataset.malformed_index_count(), 1);
    }

    #[test]
    fn sample_strings_are_resolved() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        dataset.initialize().unwrap();
        let mut sample = dataset.retrieve_sample_data();
        sample.push(vec![
            CellValue::Date(None),
            CellValue::StringRef(2),
            CellValue::Number(0.0),
        ]);
        dataset.update_sample_data_strings(&mut sample);

        assert_eq!(sample[0][1], CellValue::StringLiteral("flat".into()));
        assert_eq!(sample[1][1], CellValue::StringLiteral("house".into()));
        assert_eq!(sample[2][1], CellValue::StringLiteral("house".into()));
        // Index equal to the table size is out of range too.
        assert_eq!(
            sample[4][1],
            CellValue::StringLiteral(MALFORMED_STRING_DEFAULT.into())
        );
        assert_eq!(dataset.malformed_index_count(), 1);
        assert_eq!(sample[0][2], CellValue::Number(10.0));
    }

    #[test]
    fn compaction_preserves_order_and_remaps_tags() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        dataset.initialize().unwrap();
        dataset.set_special_column(SpecialColumn::TransactionDate, 0).unwrap();
        dataset.set_special_column(SpecialColumn::PricePerUnit, 2).unwrap();
        dataset.set_active_columns(vec![true, false, true]).unwrap();
        dataset.load_data().unwrap();

        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.header_name(0).unwrap(), "Date");
        assert_eq!(dataset.header_name(1).unwrap(), "Price");
        assert_eq!(dataset.column_format(1).unwrap(), ColumnType::Number);
        assert_eq!(dataset.special_column(SpecialColumn::TransactionDate), Some(0));
        assert_eq!(dataset.special_column(SpecialColumn::PricePerUnit), Some(1));
        assert!(dataset.rows().iter().all(|row| row.len() == 2));
        assert_eq!(dataset.rows()[0][1], CellValue::Number(10.0));
    }

    #[test]
    fn compaction_drops_tag_of_removed_column() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        dataset.initialize().unwrap();
        dataset.set_special_column(SpecialColumn::PricePerUnit, 1).unwrap();
        dataset.set_active_columns(vec![true, false, true]).unwrap();
        dataset.load_data().unwrap();

        assert_eq!(dataset.special_column(SpecialColumn::PricePerUnit), None);
        assert!(dataset.columns().iter().all(|c| c.special_tag.is_none()));
    }

    #[test]
    fn active_mask_must_cover_schema() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        dataset.initialize().unwrap();
        assert!(matches!(
            dataset.set_active_columns(vec![true]),
            Err(DatasetError::ActiveMaskLength { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn special_column_is_validated_and_moves() {
        let mut dataset = TabularDataset::new("test", three_column_source());
        dataset.initialize().unwrap();
        assert!(dataset.set_special_column(SpecialColumn::PricePerUnit, 3).is_err());
        assert_eq!(dataset.special_column(SpecialColumn::PricePerUnit), None);

        dataset.set_special_column(SpecialColumn::PricePerUnit, 0).unwrap();
        dataset.set_special_column(SpecialColumn::PricePerUnit, 2).unwrap();
        assert_eq!(dataset.special_column(SpecialColumn::PricePerUnit), Some(2));

        let columns = dataset.columns();
        assert_eq!(columns[0].special_tag, None);
        assert_eq!(columns[2].special_tag, Some(SpecialColumn::PricePerUnit));
    }
}
