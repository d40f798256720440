use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::dataset::{TabularDataset, DEFAULT_SAMPLE_SIZE};
use crate::error::DatasetResult;

/// Date layouts tried, in order, when inferring DATE columns from text.
pub const DEFAULT_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Tunables for loading and plotting. Every field has a default, so a JSON
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rows kept for preview after analysis.
    pub sample_size: usize,
    /// Day zero for regression x values.
    pub epoch: NaiveDate,
    /// Column used for grouping until the consumer picks another.
    pub grouping_column: Option<usize>,
    /// CSV field delimiter (ASCII).
    pub delimiter: char,
    /// `chrono` format strings recognised as dates by the CSV loader.
    pub date_formats: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            sample_size: DEFAULT_SAMPLE_SIZE,
            // 1970-01-01
            epoch: NaiveDate::default(),
            grouping_column: None,
            delimiter: ',',
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> DatasetResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> DatasetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        debug!("Loaded pipeline config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Header of the grouping column: `requested` when given, otherwise the
    /// configured `grouping_column` looked up in `dataset`. Call before
    /// compaction; the configured index refers to the source's columns.
    pub fn grouping_column_name(
        &self,
        dataset: &TabularDataset,
        requested: Option<&str>,
    ) -> DatasetResult<Option<String>> {
        match (requested, self.grouping_column) {
            (Some(name), _) => Ok(Some(name.to_string())),
            (None, Some(column)) => Ok(Some(dataset.header_name(column)?.to_string())),
            (None, None) => Ok(None),
        }
    }
}
