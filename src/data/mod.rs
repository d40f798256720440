/// Data layer: typed tables, sources, schema cache and projection.
///
/// Architecture:
/// ```text
///   .csv / in-memory rows
///        │
///        ▼
///   ┌──────────────┐
///   │ TabularSource │  analyze → sample → all_rows → close
///   └──────────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ TabularDataset  │  schema, rows, special columns, shared strings
///   └────────────────┘
///        │                         │
///        ▼                         ▼
///   ┌────────────┐          ┌─────────────┐
///   │ projection  │          │ SchemaCache  │
///   └────────────┘          └─────────────┘
///        │
///        ▼
///   Vec<TransactionRecord>  → PlotDataProvider
/// ```

pub mod dataset;
pub mod loader;
pub mod model;
pub mod projection;
pub mod schema;
pub mod source;
