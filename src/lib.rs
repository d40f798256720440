//! price-trends: statistics for imported transaction tables.
//!
//! A [`TabularDataset`] is filled from a [`TabularSource`], projected into
//! [`TransactionRecord`]s and handed to a [`PlotDataProvider`], which
//! publishes quantiles, per-group quantiles and a trend line as
//! [`PlotEvent`]s.

pub mod config;
pub mod data;
pub mod error;
pub mod provider;
pub mod stats;

pub use config::PipelineConfig;
pub use data::dataset::TabularDataset;
pub use data::loader::CsvSource;
pub use data::model::{CellValue, Column, ColumnType, SpecialColumn};
pub use data::projection::{project_transactions, GroupingKey, TransactionRecord};
pub use data::schema::SchemaCache;
pub use data::source::{MemorySource, TabularSource};
pub use error::{DatasetError, DatasetResult, StatsError, StatsResult};
pub use provider::{PlotBundle, PlotDataProvider, PlotEvent};
pub use stats::{Quantiles, RegressionLine};
