use std::fmt;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};

use super::dataset::TabularDataset;
use super::model::{CellValue, ColumnType, SpecialColumn};

// ---------------------------------------------------------------------------
// TransactionRecord – the shape the plot provider consumes
// ---------------------------------------------------------------------------

/// Value of the grouping column for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupingKey {
    Text(String),
    Number(f64),
    Date(Option<NaiveDate>),
}

impl Default for GroupingKey {
    fn default() -> Self {
        GroupingKey::Text(String::new())
    }
}

impl From<&str> for GroupingKey {
    fn from(s: &str) -> Self {
        GroupingKey::Text(s.to_string())
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKey::Text(s) => write!(f, "{s}"),
            GroupingKey::Number(v) => write!(f, "{v}"),
            GroupingKey::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            GroupingKey::Date(None) => Ok(()),
        }
    }
}

/// One transaction reduced to what the plots need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub grouping_key: GroupingKey,
    pub price_per_unit: f64,
}

impl TransactionRecord {
    pub fn new(date: NaiveDate, grouping_key: impl Into<GroupingKey>, price_per_unit: f64) -> Self {
        TransactionRecord {
            date,
            grouping_key: grouping_key.into(),
            price_per_unit,
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Build one record per loaded row from the columns tagged
/// [`SpecialColumn::TransactionDate`] and [`SpecialColumn::PricePerUnit`],
/// keyed by `grouping_column` when given.
///
/// Rows with an empty date or a non-finite price are skipped.
pub fn project_transactions(
    dataset: &TabularDataset,
    grouping_column: Option<usize>,
) -> DatasetResult<Vec<TransactionRecord>> {
    let date_column = tagged_column(dataset, SpecialColumn::TransactionDate, ColumnType::Date)?;
    let price_column = tagged_column(dataset, SpecialColumn::PricePerUnit, ColumnType::Number)?;
    let grouping = grouping_column
        .map(|column| dataset.column_format(column).map(|t| (column, t)))
        .transpose()?;

    let mut records = Vec::with_capacity(dataset.row_count());
    let mut skipped = 0usize;

    for row in dataset.rows() {
        let date = row[date_column].as_date();
        let price = row[price_column].as_f64().filter(|p| p.is_finite());
        let (Some(date), Some(price_per_unit)) = (date, price) else {
            skipped += 1;
            continue;
        };

        let grouping_key = match grouping {
            None => GroupingKey::default(),
            Some((column, column_type)) => grouping_key(dataset, &row[column], column_type),
        };

        records.push(TransactionRecord {
            date,
            grouping_key,
            price_per_unit,
        });
    }

    if skipped > 0 {
        warn!(
            "Dataset '{}': {skipped} of {} rows skipped (empty date or price)",
            dataset.name(),
            dataset.rows().len()
        );
    }
    debug!("Projected {} transaction records", records.len());
    Ok(records)
}

fn tagged_column(
    dataset: &TabularDataset,
    tag: SpecialColumn,
    expected: ColumnType,
) -> DatasetResult<usize> {
    let column = dataset
        .special_column(tag)
        .ok_or(DatasetError::MissingSpecialColumn(tag))?;
    let actual = dataset.column_format(column)?;
    if actual != expected {
        return Err(DatasetError::ColumnTypeMismatch {
            column,
            expected,
            actual,
        });
    }
    Ok(column)
}

fn grouping_key(
    dataset: &TabularDataset,
    cell: &CellValue,
    column_type: ColumnType,
) -> GroupingKey {
    match column_type {
        ColumnType::String => {
            GroupingKey::Text(dataset.cell_text(cell).unwrap_or_default().to_string())
        }
        ColumnType::Number => GroupingKey::Number(cell.as_f64().unwrap_or(f64::NAN)),
        ColumnType::Date => GroupingKey::Date(cell.as_date()),
    }
}
