use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};

use super::dataset::TabularDataset;
use super::model::{ColumnType, SpecialColumn};

/// Persisted description of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_tag: Option<SpecialColumn>,
}

/// Reusable schema description that lets a later load skip analysis.
/// Consumers must drop it when [`validate_against`](Self::validate_against)
/// reports a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCache {
    pub columns: Vec<SchemaColumn>,
    pub row_count: usize,
}

impl SchemaCache {
    /// Describe the dataset's current (possibly compacted) schema.
    pub fn from_dataset(dataset: &TabularDataset) -> Self {
        SchemaCache {
            columns: dataset
                .columns()
                .into_iter()
                .map(|c| SchemaColumn {
                    name: c.name,
                    column_type: c.column_type,
                    special_tag: c.special_tag,
                })
                .collect(),
            row_count: dataset.row_count(),
        }
    }

    pub fn to_json(&self) -> DatasetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> DatasetResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check that the cache still describes `dataset`'s columns.
    pub fn validate_against(&self, dataset: &TabularDataset) -> DatasetResult<()> {
        let columns = dataset.columns();
        if columns.len() != self.columns.len() {
            return Err(DatasetError::SchemaMismatch(format!(
                "cached {} columns, dataset has {}",
                self.columns.len(),
                columns.len()
            )));
        }
        for (cached, actual) in self.columns.iter().zip(&columns) {
            if cached.name != actual.name || cached.column_type != actual.column_type {
                return Err(DatasetError::SchemaMismatch(format!(
                    "column {}: cached '{}' ({}), dataset has '{}' ({})",
                    actual.index, cached.name, cached.column_type, actual.name, actual.column_type
                )));
            }
        }
        Ok(())
    }
}
