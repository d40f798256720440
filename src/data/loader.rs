use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::debug;

use crate::config::PipelineConfig;
use crate::error::{DatasetError, DatasetResult};

use super::model::{CellValue, ColumnType, Row, SharedStrings};
use super::source::{SourceDefinition, TabularSource};

// ---------------------------------------------------------------------------
// CSV source
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one transaction per record.
///
/// Column types are inferred from the non-empty cells: all numeric →
/// NUMBER, all parseable with one of the configured date formats → DATE,
/// anything else → STRING. String cells are pooled in a shared-string table
/// and stored as references.
pub struct CsvSource {
    reader: Option<csv::Reader<Box<dyn Read>>>,
    date_formats: Vec<String>,
    records: Vec<csv::StringRecord>,
    definition: Option<SourceDefinition>,
}

impl CsvSource {
    pub fn from_path(path: &Path, config: &PipelineConfig) -> DatasetResult<Self> {
        let file = File::open(path)?;
        debug!("Opened CSV source {}", path.display());
        Self::from_reader(file, config)
    }

    pub fn from_reader(
        reader: impl Read + 'static,
        config: &PipelineConfig,
    ) -> DatasetResult<Self> {
        if !config.delimiter.is_ascii() {
            return Err(DatasetError::Source(format!(
                "delimiter '{}' is not ASCII",
                config.delimiter
            )));
        }
        let reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter as u8)
            .trim(csv::Trim::All)
            .from_reader(Box::new(reader) as Box<dyn Read>);

        Ok(CsvSource {
            reader: Some(reader),
            date_formats: config.date_formats.clone(),
            records: Vec::new(),
            definition: None,
        })
    }

    /// Convert up to `limit` buffered records, analysing the file first when
    /// that has not happened yet.
    fn convert_records(&mut self, limit: usize) -> DatasetResult<Vec<Row>> {
        if self.definition.is_none() {
            self.analyze()?;
        }
        let SourceDefinition {
            column_types,
            shared_strings,
            ..
        } = self.definition.as_mut().ok_or(DatasetError::NotInitialized)?;

        let mut rows = Vec::with_capacity(self.records.len().min(limit));
        for record in self.records.iter().take(limit) {
            let row: Row = column_types
                .iter()
                .enumerate()
                .map(|(column, column_type)| {
                    let text = record.get(column).unwrap_or("");
                    convert_cell(text, *column_type, &self.date_formats, shared_strings)
                })
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

impl TabularSource for CsvSource {
    fn analyze(&mut self) -> DatasetResult<SourceDefinition> {
        if let Some(definition) = &self.definition {
            return Ok(definition.clone());
        }
        let mut reader = self.reader.take().ok_or(DatasetError::SourceReleased)?;

        let header_names: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut records = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() != header_names.len() {
                return Err(DatasetError::Source(format!(
                    "CSV row {row_no}: {} fields, header has {}",
                    record.len(),
                    header_names.len()
                )));
            }
            records.push(record);
        }

        let column_types: Vec<ColumnType> = (0..header_names.len())
            .map(|column| {
                guess_column_type(
                    records.iter().map(|r| r.get(column).unwrap_or("")),
                    &self.date_formats,
                )
            })
            .collect();

        let mut shared_strings = SharedStrings::new();
        for (column, _) in column_types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ColumnType::String)
        {
            for record in &records {
                let text = record.get(column).unwrap_or("");
                if !text.is_empty() {
                    shared_strings.intern(text);
                }
            }
        }

        debug!(
            "CSV analysed: {} columns {:?}, {} rows",
            header_names.len(),
            column_types,
            records.len()
        );

        let definition = SourceDefinition {
            header_names,
            column_types,
            shared_strings,
            row_count: records.len(),
            ..SourceDefinition::default()
        };
        self.records = records;
        self.definition = Some(definition.clone());
        Ok(definition)
    }

    fn sample(&mut self, limit: usize) -> DatasetResult<Vec<Row>> {
        self.convert_records(limit)
    }

    fn all_rows(&mut self) -> DatasetResult<Vec<Row>> {
        self.convert_records(usize::MAX)
    }

    fn close(&mut self) {
        self.records = Vec::new();
        self.reader = None;
    }
}

// -- Type inference helpers --

fn guess_column_type<'a>(
    values: impl Iterator<Item = &'a str> + Clone,
    date_formats: &[String],
) -> ColumnType {
    let mut non_empty = values.filter(|v| !v.is_empty()).peekable();
    if non_empty.peek().is_none() {
        return ColumnType::String;
    }
    // "NaN" and "inf" parse as floats but are text in a transaction table.
    if non_empty
        .clone()
        .all(|v| v.parse::<f64>().is_ok_and(f64::is_finite))
    {
        return ColumnType::Number;
    }
    if non_empty.all(|v| parse_date(v, date_formats).is_some()) {
        return ColumnType::Date;
    }
    ColumnType::String
}

fn parse_date(s: &str, date_formats: &[String]) -> Option<NaiveDate> {
    date_formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Empty NUMBER cells become NaN, empty DATE cells a null date and empty
/// STRING cells an empty literal.
fn convert_cell(
    text: &str,
    column_type: ColumnType,
    date_formats: &[String],
    strings: &mut SharedStrings,
) -> CellValue {
    match column_type {
        ColumnType::Number => CellValue::Number(text.parse().unwrap_or(f64::NAN)),
        ColumnType::Date => CellValue::Date(parse_date(text, date_formats)),
        ColumnType::String if text.is_empty() => CellValue::StringLiteral(String::new()),
        ColumnType::String => CellValue::StringRef(strings.intern(text)),
    }
}
